//! # schemasync engine
//!
//! Execution engine for schema reconciliation.
//!
//! This crate provides:
//! - The [`DocumentStore`] abstraction over a live target database
//! - Backup-before-mutate via [`BackupManager`]
//! - The [`Synchronizer`], a sequential plan executor with dry-run and
//!   per-operation failure isolation
//! - Diff and execution reports persisted as JSON
//!
//! ## Architecture
//!
//! A live run is **backup → execute → report**: the target's documents and
//! indexes are dumped to a timestamped artifact first (a backup failure
//! aborts the run before any mutation), then each operation in the plan is
//! applied strictly in order. Operation failures are recorded and never stop
//! the run.
//!
//! ## Key Invariants
//!
//! - No mutation without a verified backup
//! - Operations execute in exactly the order the plan builder produced
//! - A failed operation is isolated; the run continues
//! - Dry-run never mutates the target

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backup;
mod config;
mod error;
mod executor;
mod report;
mod store;

pub use backup::{BackupArtifact, BackupManager, BackupSummary, CollectionBackup};
pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use executor::{ExecutionMode, Synchronizer};
pub use report::{DiffReport, OperationOutcome, OperationStatus, SyncReport};
pub use store::{DocumentStore, FileStore, MemoryStore};
