//! I/O error types.

use thiserror::Error;

/// Result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;

/// I/O error types.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Store (de)serialization error.
    #[error("store format error: {0}")]
    Format(#[from] serde_json::Error),

    /// A requested spectrum is not in the store.
    #[error("missing spectrum: {namespace}/{name}")]
    MissingSpectrum {
        /// Namespace the spectrum was looked up in.
        namespace: String,
        /// Spectrum name.
        name: String,
    },

    /// The scale-factor table could not be parsed.
    #[error("malformed scale-factor table at line {line}: {reason}")]
    MalformedScaleTable {
        /// 1-based line number.
        line: usize,
        /// What went wrong.
        reason: String,
    },

    /// The event file could not be parsed.
    #[error("malformed event file at line {line}: {reason}")]
    MalformedEventFile {
        /// 1-based line number.
        line: usize,
        /// What went wrong.
        reason: String,
    },

    /// Core library error.
    #[error("core error: {0}")]
    Core(#[from] angcorr_core::Error),
}
