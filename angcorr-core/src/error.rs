//! Error types for angcorr-core.

use thiserror::Error;

/// Result type alias for angcorr operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for angcorr operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Angle table has no entries.
    #[error("angle table is empty")]
    EmptyAngleTable,

    /// Angle table entries are not strictly ascending.
    #[error("angle table not strictly ascending at position {position}")]
    UnsortedAngleTable { position: usize },

    /// Angle table entry exceeds the physical maximum of 180 degrees.
    #[error("angle table entry {angle} exceeds 180 degrees")]
    AngleAboveMaximum { angle: f64 },

    /// Spectrum has an invalid axis range or bin count.
    #[error("invalid spectrum axis: {n_bins} bins over [{lo}, {hi})")]
    InvalidAxis { n_bins: usize, lo: f64, hi: f64 },

    /// Two spectra combined bin-by-bin have different shapes.
    #[error("spectrum shape mismatch: {expected} bins expected, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// Bin index outside the spectrum.
    #[error("bin {bin} out of range ({n_bins} bins)")]
    BinOutOfRange { bin: usize, n_bins: usize },

    /// Inverted or empty bin range for a projection.
    #[error("invalid bin range [{lo}, {hi}]")]
    InvalidBinRange { lo: usize, hi: usize },

    /// Sum-energy gate that misses the spectrum axis entirely.
    #[error("gate [{low}, {high}] does not intersect the energy axis")]
    GateOutsideAxis { low: f64, high: f64 },

    /// Reference peak position outside the spectrum axis.
    #[error("reference peak {peak} outside the energy axis")]
    PeakOutsideAxis { peak: f64 },

    /// No angular index produced a usable spectrum.
    #[error("no usable angular indices")]
    NoUsableIndices,
}
