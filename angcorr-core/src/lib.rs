//! angcorr-core: Core types for angle-binned gamma coincidence analysis.
//!
//! This crate provides the foundational data model: binned spectra with
//! per-bin variance tracking, the angle reference table with its
//! angular-index resolver, per-index background scale factors, and the
//! coincidence hit types produced by event preprocessing.

pub mod angle;
pub mod error;
pub mod event;
pub mod scale;
pub mod spectrum;

pub use angle::AngleTable;
pub use error::{Error, Result};
pub use event::{angle_between, CoincidenceHit, Position};
pub use scale::ScaleFactorTable;
pub use spectrum::{Spectrum1D, Spectrum2D};
