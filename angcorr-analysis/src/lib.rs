//! angcorr-analysis: Algorithms for angle-binned coincidence analysis.
//!
//! This crate provides:
//! - **accumulate** - per-event accumulation into angle-vs-energy
//!   matrices, prompt/time-random window classification, and the
//!   delayed-slice time-random average
//! - **optimize** - grid-search chi-square minimization of the room
//!   background scale factor
//! - **pipeline** - the ordered subtraction stages and angular matrix
//!   assembly, with per-index rayon parallelism
//!
#![warn(missing_docs)]

mod accumulate;
mod fit;
mod optimize;
mod pipeline;

pub use accumulate::{average_time_random, AccumulateConfig, Accumulator, CoincidenceHistograms};
pub use fit::{fit_line_weighted, LineFit};
pub use optimize::{OptimizeOutcome, Optimizer, OptimizerConfig};
pub use pipeline::{
    gated_projection, DatasetInput, DatasetRole, GateMode, GateWindow, IndexOutcome,
    PipelineConfig, SkipReason, SubtractionOutput, SubtractionPipeline, SubtractionReport,
};
