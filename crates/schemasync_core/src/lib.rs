//! # schemasync core
//!
//! Pure data model and algorithms for schema reconciliation.
//!
//! This crate provides:
//! - The snapshot model (database, collection, field, and index shapes)
//! - The differ, which compares two snapshots into classified differences
//! - The plan builder, which turns differences into an ordered operation list
//!
//! ## Architecture
//!
//! Two [`DatabaseSchema`] snapshots — a *reference* (authoritative) and a
//! *local* one — are compared with [`compare`], producing one
//! [`CollectionDifference`] per diverging collection with nested field and
//! index differences. [`build_plan`] then derives a priority-ordered list of
//! [`SyncOperation`]s for the execution engine.
//!
//! ## Key Invariants
//!
//! - The differ and plan builder are pure: no I/O, no hidden state
//! - Key unions iterate in sorted order, so output is deterministic
//! - `compare(a, a)` is empty; swapping inputs mirrors missing/added
//! - Plan order never violates `High < Medium < Low`

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod diff;
mod error;
mod plan;
mod snapshot;

pub use diff::{
    compare, CollectionDiffKind, CollectionDifference, FieldDiffKind, FieldDifference,
    IndexDiffKind, IndexDifference, Priority,
};
pub use error::{CoreError, CoreResult};
pub use plan::{build_plan, OperationDetails, OperationKind, SyncOperation};
pub use snapshot::{
    CollectionSchema, DatabaseSchema, FieldInfo, FieldType, IndexDirection, IndexInfo, IndexKey,
};

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
