//! Error types for marker file operations

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while writing, reading or deleting the marker
#[derive(Error, Debug)]
pub enum MarkerError {
    /// File I/O error
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Marker content could not be serialized or parsed
    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Marker path has no file name component
    #[error("Invalid marker path: {path}")]
    InvalidPath { path: PathBuf },
}

impl MarkerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MarkerError::Io {
            path: path.into(),
            source,
        }
    }
}
