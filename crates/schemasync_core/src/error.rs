//! Error types for the core crate.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while loading or validating snapshots.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A snapshot file could not be read.
    #[error("failed to read snapshot {path:?}: {source}")]
    SnapshotLoad {
        /// Path of the snapshot file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A snapshot file could not be parsed.
    #[error("failed to parse snapshot {path:?}: {source}")]
    SnapshotParse {
        /// Path of the snapshot file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// A snapshot violates a structural invariant.
    #[error("invalid snapshot: {message}")]
    InvalidSnapshot {
        /// Description of the violation.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    /// Creates an invalid-snapshot error.
    pub fn invalid_snapshot(message: impl Into<String>) -> Self {
        Self::InvalidSnapshot {
            message: message.into(),
        }
    }
}
