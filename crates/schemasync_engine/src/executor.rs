//! Sequential plan execution.
//!
//! The [`Synchronizer`] applies a sync plan strictly in order against a
//! [`DocumentStore`], in dry-run or live mode. Live runs take a backup first;
//! a backup failure (or cancellation during backup) aborts the run before any
//! mutation. Operation failures are recorded and never stop the run, and no
//! operation is retried.

use crate::backup::BackupManager;
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::report::{OperationOutcome, OperationStatus, SyncReport};
use crate::store::DocumentStore;
use chrono::Utc;
use schemasync_core::{FieldType, OperationDetails, SyncOperation};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Format of run identifiers, derived from the run's UTC start time.
const RUN_ID_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Whether a run mutates the target. Always an explicit input, never
/// inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Simulate every operation without mutating the target. No backup is
    /// taken: there is nothing to protect.
    DryRun,
    /// Apply the plan after a successful backup.
    Live,
}

/// Executes sync plans against a target store.
pub struct Synchronizer<S: DocumentStore> {
    store: S,
    config: SyncConfig,
    cancelled: AtomicBool,
}

impl<S: DocumentStore> Synchronizer<S> {
    /// Creates a synchronizer for the given target.
    pub fn new(store: S, config: SyncConfig) -> Self {
        Self {
            store,
            config,
            cancelled: AtomicBool::new(false),
        }
    }

    /// The target store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Requests cancellation. Honored between operations, never mid-operation;
    /// a cancellation observed during the backup phase aborts the run.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Clears the cancellation flag for a new run.
    pub fn reset_cancel(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Executes the plan in order and returns the run report.
    ///
    /// Fatal errors (backup failure, cancellation before mutation) surface as
    /// `Err`; per-operation failures are recorded in the report.
    pub fn execute(&self, plan: &[SyncOperation], mode: ExecutionMode) -> SyncResult<SyncReport> {
        let started_at = Utc::now();
        let run_id = started_at.format(RUN_ID_FORMAT).to_string();
        let start = Instant::now();
        tracing::info!(
            run_id = %run_id,
            mode = ?mode,
            operations = plan.len(),
            "starting sync run"
        );

        let backup = if mode == ExecutionMode::Live {
            if self.is_cancelled() {
                return Err(SyncError::Cancelled);
            }
            let backup_start = Instant::now();
            let manager = BackupManager::new(&self.config.backup_dir);
            let summary = manager.create_backup(&self.store, &run_id)?;
            if backup_start.elapsed() > self.config.backup_timeout {
                return Err(SyncError::backup_failed(format!(
                    "backup exceeded the {} s budget",
                    self.config.backup_timeout.as_secs()
                )));
            }
            if self.is_cancelled() {
                return Err(SyncError::Cancelled);
            }
            Some(summary)
        } else {
            None
        };

        let mut outcomes = Vec::with_capacity(plan.len());
        for (position, operation) in plan.iter().enumerate() {
            if self.is_cancelled() {
                tracing::warn!(
                    remaining = plan.len() - position,
                    "cancelled between operations"
                );
                for remaining in &plan[position..] {
                    outcomes.push(OperationOutcome::failed(
                        remaining.clone(),
                        SyncError::Cancelled.to_string(),
                    ));
                }
                break;
            }

            let operation_start = Instant::now();
            let result = self.apply_operation(operation, mode == ExecutionMode::Live);
            let elapsed = operation_start.elapsed();

            let mut outcome = match result {
                Ok(_) if elapsed > self.config.operation_timeout => {
                    let err = SyncError::Timeout {
                        elapsed_ms: elapsed.as_millis() as u64,
                        budget_ms: self.config.operation_timeout.as_millis() as u64,
                    };
                    OperationOutcome::failed(operation.clone(), err.to_string())
                }
                Ok((status, detail, modified)) => OperationOutcome {
                    operation: operation.clone(),
                    status,
                    detail,
                    error: None,
                    documents_modified: modified,
                    elapsed_ms: 0,
                },
                Err(e) => OperationOutcome::failed(operation.clone(), e.to_string()),
            };
            outcome.elapsed_ms = elapsed.as_millis() as u64;

            if outcome.status == OperationStatus::Failed {
                tracing::warn!(
                    kind = %operation.kind(),
                    collection = %operation.collection,
                    error = outcome.error.as_deref().unwrap_or(""),
                    "operation failed"
                );
            } else {
                tracing::debug!(
                    kind = %operation.kind(),
                    collection = %operation.collection,
                    status = ?outcome.status,
                    "operation complete"
                );
            }
            outcomes.push(outcome);
        }

        let report = SyncReport {
            run_id,
            mode,
            started_at,
            elapsed_ms: start.elapsed().as_millis() as u64,
            backup,
            outcomes,
        };
        tracing::info!(
            total = report.total(),
            succeeded = report.succeeded(),
            failed = report.failed(),
            skipped = report.skipped(),
            manual_review = report.manual_review(),
            "sync run complete"
        );
        Ok(report)
    }

    fn apply_operation(
        &self,
        operation: &SyncOperation,
        live: bool,
    ) -> SyncResult<(OperationStatus, String, u64)> {
        let collection = operation.collection.as_str();
        match &operation.details {
            OperationDetails::CreateCollection => {
                if self.store.collection_exists(collection)? {
                    return Ok((OperationStatus::Succeeded, "collection already exists".into(), 0));
                }
                if live {
                    self.store.create_collection(collection)?;
                    Ok((OperationStatus::Succeeded, "collection created".into(), 0))
                } else {
                    Ok((OperationStatus::Succeeded, "would create collection".into(), 0))
                }
            }
            OperationDetails::AddField {
                field_type,
                default_value,
                ..
            } => {
                let field = operation.field.as_deref().ok_or_else(|| {
                    SyncError::store(collection, "add_field operation carries no field name")
                })?;
                let count = self.store.count_documents(collection)?;
                if count == 0 {
                    return Ok((
                        OperationStatus::Skipped,
                        "collection empty, nothing to backfill".into(),
                        0,
                    ));
                }
                let value = default_value
                    .clone()
                    .unwrap_or_else(|| fallback_default(*field_type));
                if live {
                    let modified = self.store.set_field_where_missing(collection, field, &value)?;
                    Ok((
                        OperationStatus::Succeeded,
                        format!("backfilled {} document(s)", modified),
                        modified,
                    ))
                } else {
                    Ok((
                        OperationStatus::Succeeded,
                        format!("would backfill up to {} document(s)", count),
                        0,
                    ))
                }
            }
            OperationDetails::CreateIndex { index } => {
                let existing = self.store.list_indexes(collection)?;
                match existing.iter().find(|candidate| candidate.name == index.name) {
                    Some(current) if same_definition(current, index) => Ok((
                        OperationStatus::Succeeded,
                        "index already exists".into(),
                        0,
                    )),
                    Some(_) => Err(SyncError::IndexConflict {
                        collection: collection.to_string(),
                        index: index.name.clone(),
                    }),
                    None => {
                        if live {
                            self.store.create_index(collection, index)?;
                            Ok((OperationStatus::Succeeded, "index created".into(), 0))
                        } else {
                            Ok((OperationStatus::Succeeded, "would create index".into(), 0))
                        }
                    }
                }
            }
            OperationDetails::ModifyField { reference, local } => Ok((
                OperationStatus::ManualReview,
                format!(
                    "type change {} -> {} requires manual migration",
                    local.type_label(),
                    reference.type_label()
                ),
                0,
            )),
            OperationDetails::UpdateRequirement {
                reference_required, ..
            } => Ok((
                OperationStatus::ManualReview,
                format!(
                    "requirement change (required -> {}) must be resolved out of band",
                    reference_required
                ),
                0,
            )),
            OperationDetails::DropIndex { index } => Ok((
                OperationStatus::ManualReview,
                format!("index {} is never dropped automatically", index.name),
                0,
            )),
        }
    }
}

/// Index equality for conflict detection: keys, unique, and sparse.
fn same_definition(a: &schemasync_core::IndexInfo, b: &schemasync_core::IndexInfo) -> bool {
    a.keys == b.keys && a.unique == b.unique && a.sparse == b.sparse
}

/// Type-appropriate default used when a missing field declares none.
fn fallback_default(field_type: FieldType) -> Value {
    match field_type {
        FieldType::String => Value::String(String::new()),
        FieldType::Number => Value::from(0),
        FieldType::Boolean => Value::Bool(false),
        FieldType::Object => Value::Object(serde_json::Map::new()),
        FieldType::Array => Value::Array(Vec::new()),
        FieldType::Date => Value::String(Utc::now().to_rfc3339()),
        FieldType::Mixed => Value::Null,
    }
}
