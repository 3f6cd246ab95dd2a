//! angcorr-io: Persistence collaborators for the subtraction pipeline.
//!
//! This crate provides the named-spectrum histogram store exchanged
//! between pipeline stages (JSON-backed), the delimited scale-factor
//! table, and a plain-text reader for preprocessed coincidence events.

mod error;
mod events;
mod scale_table;
mod store;

pub use error::{Error, Result};
pub use events::read_events_csv;
pub use scale_table::{read_scale_factors, write_scale_factors};
pub use store::HistogramStore;
