//! Error types for the execution engine.

use thiserror::Error;

/// Result type for engine operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while backing up or synchronizing a target.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Snapshot-level error from the core crate.
    #[error("core error: {0}")]
    Core(#[from] schemasync_core::CoreError),

    /// The backup phase failed. Always fatal: no mutation may happen
    /// without a verified backup.
    #[error("backup failed: {message}")]
    BackupFailed {
        /// Description of the failure.
        message: String,
    },

    /// The target store rejected or failed an operation.
    #[error("store error on collection {collection}: {message}")]
    Store {
        /// Collection the operation targeted.
        collection: String,
        /// Description of the failure.
        message: String,
    },

    /// An index with the same name but a different definition already
    /// exists. The overwrite is refused.
    #[error("index {index} on {collection} already exists with a different definition")]
    IndexConflict {
        /// Collection owning the index.
        collection: String,
        /// Conflicting index name.
        index: String,
    },

    /// An operation exceeded its time budget.
    #[error("operation timed out after {elapsed_ms} ms (budget {budget_ms} ms)")]
    Timeout {
        /// Observed elapsed time in milliseconds.
        elapsed_ms: u64,
        /// Configured budget in milliseconds.
        budget_ms: u64,
    },

    /// The run was cancelled.
    #[error("sync cancelled")]
    Cancelled,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SyncError {
    /// Creates a backup-failure error.
    pub fn backup_failed(message: impl Into<String>) -> Self {
        Self::BackupFailed {
            message: message.into(),
        }
    }

    /// Creates a store error for the given collection.
    pub fn store(collection: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Store {
            collection: collection.into(),
            message: message.into(),
        }
    }

    /// Returns true if this error must abort the whole run.
    ///
    /// Everything else is isolated to the operation that raised it.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::BackupFailed { .. } | SyncError::Cancelled | SyncError::Core(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatality_classification() {
        assert!(SyncError::backup_failed("unreadable collection").is_fatal());
        assert!(SyncError::Cancelled.is_fatal());
        assert!(!SyncError::store("users", "write refused").is_fatal());
        assert!(!SyncError::IndexConflict {
            collection: "users".into(),
            index: "idx_email".into(),
        }
        .is_fatal());
        assert!(!SyncError::Timeout {
            elapsed_ms: 31_000,
            budget_ms: 30_000,
        }
        .is_fatal());
    }

    #[test]
    fn error_display() {
        let err = SyncError::IndexConflict {
            collection: "users".into(),
            index: "idx_email".into(),
        };
        assert_eq!(
            err.to_string(),
            "index idx_email on users already exists with a different definition"
        );
    }
}
