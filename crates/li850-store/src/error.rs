//! Error types for li850-store.

use std::path::PathBuf;

/// Result type for li850-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while recording or reading CSV files.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A sample was recorded before a target file was chosen.
    #[error("No recording target selected")]
    NoTarget,

    /// Failed to create the data directory.
    #[error("Failed to create data directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// CSV encoding or decoding error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl<W> From<csv::IntoInnerError<W>> for Error {
    fn from(err: csv::IntoInnerError<W>) -> Self {
        Error::Io(err.into_error())
    }
}
