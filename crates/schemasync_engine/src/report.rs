//! Diff and execution reports.
//!
//! [`DiffReport`] is the intermediate artifact written after the differ and
//! plan builder; a later, decoupled run can load it and execute the plan
//! without re-reading the snapshots. [`SyncReport`] is the persisted outcome
//! of one execution. All counts are derived from the outcome list, never
//! accumulated in shared state.

use crate::backup::BackupSummary;
use crate::error::SyncResult;
use crate::executor::ExecutionMode;
use chrono::{DateTime, Utc};
use schemasync_core::{
    CollectionDifference, CoreResult, DatabaseSchema, Priority, SyncOperation,
};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// Status of one executed (or simulated) operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    /// Applied, or resolved to an idempotent no-op.
    Succeeded,
    /// Failed; recorded and isolated, the run continued.
    Failed,
    /// Nothing to do (e.g. backfill on an empty collection).
    Skipped,
    /// Intentionally not auto-applied; operators resolve out of band.
    ManualReview,
}

/// Outcome of one operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationOutcome {
    /// The operation as planned.
    pub operation: SyncOperation,
    /// Outcome status.
    pub status: OperationStatus,
    /// Human-readable outcome detail.
    pub detail: String,
    /// Error message, for failed operations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Documents modified by this operation.
    pub documents_modified: u64,
    /// Observed execution time in milliseconds.
    pub elapsed_ms: u64,
}

impl OperationOutcome {
    /// Creates a succeeded outcome.
    pub fn succeeded(operation: SyncOperation, detail: impl Into<String>, modified: u64) -> Self {
        Self {
            operation,
            status: OperationStatus::Succeeded,
            detail: detail.into(),
            error: None,
            documents_modified: modified,
            elapsed_ms: 0,
        }
    }

    /// Creates a failed outcome.
    pub fn failed(operation: SyncOperation, error: impl Into<String>) -> Self {
        Self {
            operation,
            status: OperationStatus::Failed,
            detail: "operation failed".into(),
            error: Some(error.into()),
            documents_modified: 0,
            elapsed_ms: 0,
        }
    }

    /// Creates a skipped outcome.
    pub fn skipped(operation: SyncOperation, detail: impl Into<String>) -> Self {
        Self {
            operation,
            status: OperationStatus::Skipped,
            detail: detail.into(),
            error: None,
            documents_modified: 0,
            elapsed_ms: 0,
        }
    }

    /// Creates a manual-review outcome.
    pub fn manual_review(operation: SyncOperation, detail: impl Into<String>) -> Self {
        Self {
            operation,
            status: OperationStatus::ManualReview,
            detail: detail.into(),
            error: None,
            documents_modified: 0,
            elapsed_ms: 0,
        }
    }
}

/// Persisted report of one sync run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    /// Run identifier, derived from the run's UTC start time.
    pub run_id: String,
    /// Execution mode of the run.
    pub mode: ExecutionMode,
    /// Run start time.
    pub started_at: DateTime<Utc>,
    /// Total elapsed time in milliseconds.
    pub elapsed_ms: u64,
    /// Backup summary, for live runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<BackupSummary>,
    /// Per-operation outcomes, in execution order.
    pub outcomes: Vec<OperationOutcome>,
}

impl SyncReport {
    /// Total number of operations.
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    /// Number of succeeded operations.
    pub fn succeeded(&self) -> usize {
        self.count(OperationStatus::Succeeded)
    }

    /// Number of failed operations.
    pub fn failed(&self) -> usize {
        self.count(OperationStatus::Failed)
    }

    /// Number of skipped operations.
    pub fn skipped(&self) -> usize {
        self.count(OperationStatus::Skipped)
    }

    /// Number of operations requiring manual review.
    pub fn manual_review(&self) -> usize {
        self.count(OperationStatus::ManualReview)
    }

    fn count(&self, status: OperationStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    /// Fraction of operations that did not fail.
    ///
    /// Skipped and manual-review operations count toward success: the
    /// pipeline does not block on them.
    pub fn success_ratio(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 1.0;
        }
        let ok = self.total() - self.failed();
        ok as f64 / self.total() as f64
    }

    /// Advisory health signal: `success_ratio >= threshold`.
    pub fn is_healthy(&self, threshold: f64) -> bool {
        self.success_ratio() >= threshold
    }

    /// Iterates over failed outcomes.
    pub fn failures(&self) -> impl Iterator<Item = &OperationOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status == OperationStatus::Failed)
    }

    /// Total documents modified across all operations.
    pub fn documents_modified(&self) -> u64 {
        self.outcomes.iter().map(|o| o.documents_modified).sum()
    }

    /// Persists the report as `report_<run_id>.json` under the given
    /// directory and returns the path.
    pub fn save(&self, report_dir: &Path) -> SyncResult<PathBuf> {
        fs::create_dir_all(report_dir)?;
        let path = report_dir.join(format!("report_{}.json", self.run_id));
        fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }

    /// Renders the human-readable summary.
    pub fn render_summary(&self, threshold: f64) -> String {
        let mut out = String::new();
        let mode = match self.mode {
            ExecutionMode::DryRun => "dry-run",
            ExecutionMode::Live => "live",
        };
        let _ = writeln!(out, "Sync run {} ({})", self.run_id, mode);
        let _ = writeln!(
            out,
            "Operations: {} total, {} succeeded, {} failed, {} skipped, {} manual review",
            self.total(),
            self.succeeded(),
            self.failed(),
            self.skipped(),
            self.manual_review()
        );
        let _ = writeln!(out, "Documents modified: {}", self.documents_modified());
        if let Some(backup) = &self.backup {
            let _ = writeln!(
                out,
                "Backup: {:?} ({} collections, {} documents)",
                backup.path, backup.collections, backup.documents
            );
        }
        if self.failed() > 0 {
            let _ = writeln!(out, "Failures:");
            for outcome in self.failures() {
                let _ = writeln!(
                    out,
                    "  [{}] {}: {}",
                    outcome.operation.kind(),
                    outcome.operation.collection,
                    outcome.error.as_deref().unwrap_or("unknown error")
                );
            }
        }
        let _ = writeln!(
            out,
            "Health: {:.1}% ({}, threshold {:.0}%)",
            self.success_ratio() * 100.0,
            if self.is_healthy(threshold) {
                "healthy"
            } else {
                "unhealthy"
            },
            threshold * 100.0
        );
        let _ = writeln!(out, "Elapsed: {} ms", self.elapsed_ms);
        out
    }
}

/// The intermediate artifact: differences plus the derived plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffReport {
    /// Generation timestamp.
    pub generated_at: DateTime<Utc>,
    /// Reference database name.
    pub reference_database: String,
    /// Local database name.
    pub local_database: String,
    /// Fingerprint of the reference snapshot.
    pub reference_fingerprint: String,
    /// Fingerprint of the local snapshot.
    pub local_fingerprint: String,
    /// Classified differences.
    pub differences: Vec<CollectionDifference>,
    /// The derived sync plan.
    pub plan: Vec<SyncOperation>,
}

impl DiffReport {
    /// Builds a report from the two snapshots and their comparison output.
    pub fn new(
        reference: &DatabaseSchema,
        local: &DatabaseSchema,
        differences: Vec<CollectionDifference>,
        plan: Vec<SyncOperation>,
    ) -> CoreResult<Self> {
        Ok(Self {
            generated_at: Utc::now(),
            reference_database: reference.database_name.clone(),
            local_database: local.database_name.clone(),
            reference_fingerprint: reference.fingerprint()?,
            local_fingerprint: local.fingerprint()?,
            differences,
            plan,
        })
    }

    /// Persists the report as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> SyncResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Loads a previously saved report.
    pub fn load(path: &Path) -> SyncResult<Self> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Renders the summary grouped by priority, then collection, listing at
    /// most `cap` child differences per collection with a "+N more" elision.
    /// Presentation only; the underlying data is never truncated.
    pub fn render_summary(&self, cap: usize) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Schema differences: {} (reference) vs {} (local)",
            self.reference_database, self.local_database
        );
        if self.differences.is_empty() {
            let _ = writeln!(out, "  schemas are in sync");
        }
        for priority in [Priority::High, Priority::Medium, Priority::Low] {
            let group: Vec<&CollectionDifference> = self
                .differences
                .iter()
                .filter(|d| d.priority == priority)
                .collect();
            if group.is_empty() {
                continue;
            }
            let _ = writeln!(out, "{}:", priority);
            for difference in group {
                let _ = writeln!(
                    out,
                    "  {} ({:?}): {}",
                    difference.collection, difference.kind, difference.description
                );
                let children: Vec<String> = difference
                    .field_differences
                    .iter()
                    .map(|f| format!("field {}: {}", f.field, f.description))
                    .chain(
                        difference
                            .index_differences
                            .iter()
                            .map(|i| format!("index {}: {}", i.index_name, i.description)),
                    )
                    .collect();
                for child in children.iter().take(cap) {
                    let _ = writeln!(out, "    - {}", child);
                }
                if children.len() > cap {
                    let _ = writeln!(out, "    ... +{} more", children.len() - cap);
                }
            }
        }
        let _ = writeln!(out, "Plan: {} operation(s)", self.plan.len());
        for operation in &self.plan {
            let _ = writeln!(
                out,
                "  [{}] {} {}",
                operation.priority,
                operation.kind(),
                operation.command_description
            );
        }
        out
    }
}
