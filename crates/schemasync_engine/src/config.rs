//! Configuration for the execution engine.

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for a sync run.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Time budget per operation. An operation exceeding it is recorded as
    /// failed and the run continues.
    pub operation_timeout: Duration,
    /// Time budget for the whole backup phase. Exceeding it is fatal.
    pub backup_timeout: Duration,
    /// Directory backup artifacts are written to.
    pub backup_dir: PathBuf,
    /// Directory execution reports are written to.
    pub report_dir: PathBuf,
    /// Advisory health threshold for `succeeded / total`.
    pub health_threshold: f64,
    /// Maximum child differences shown per collection in rendered summaries.
    pub display_cap: usize,
}

impl SyncConfig {
    /// Creates a configuration with default budgets and directories.
    pub fn new() -> Self {
        Self {
            operation_timeout: Duration::from_secs(30),
            backup_timeout: Duration::from_secs(300),
            backup_dir: PathBuf::from("backups"),
            report_dir: PathBuf::from("reports"),
            health_threshold: 0.9,
            display_cap: 3,
        }
    }

    /// Sets the per-operation time budget.
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Sets the backup-phase time budget.
    pub fn with_backup_timeout(mut self, timeout: Duration) -> Self {
        self.backup_timeout = timeout;
        self
    }

    /// Sets the backup artifact directory.
    pub fn with_backup_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.backup_dir = dir.into();
        self
    }

    /// Sets the report directory.
    pub fn with_report_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.report_dir = dir.into();
        self
    }

    /// Sets the advisory health threshold.
    pub fn with_health_threshold(mut self, threshold: f64) -> Self {
        self.health_threshold = threshold;
        self
    }

    /// Sets the summary display cap.
    pub fn with_display_cap(mut self, cap: usize) -> Self {
        self.display_cap = cap;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}
