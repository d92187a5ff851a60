//! Target database abstraction.
//!
//! [`DocumentStore`] is the boundary between the engine and a live document
//! database. The backup manager and synchronizer only ever talk to this
//! trait, so tests run against [`MemoryStore`] and the CLI against
//! [`FileStore`].

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::SyncResult;
use schemasync_core::IndexInfo;
use serde_json::Value;

/// Blocking interface to a live target database.
///
/// The engine assumes it is the sole writer for the duration of a run; no
/// external locking is implemented.
pub trait DocumentStore: Send + Sync {
    /// Lists all collection names, sorted.
    fn collection_names(&self) -> SyncResult<Vec<String>>;

    /// Checks whether a collection exists.
    fn collection_exists(&self, collection: &str) -> SyncResult<bool>;

    /// Creates an empty collection.
    fn create_collection(&self, collection: &str) -> SyncResult<()>;

    /// Counts documents in a collection.
    fn count_documents(&self, collection: &str) -> SyncResult<u64>;

    /// Reads all documents of a collection.
    fn read_documents(&self, collection: &str) -> SyncResult<Vec<Value>>;

    /// Lists index descriptors of a collection.
    fn list_indexes(&self, collection: &str) -> SyncResult<Vec<IndexInfo>>;

    /// Creates an index from its full definition.
    fn create_index(&self, collection: &str, index: &IndexInfo) -> SyncResult<()>;

    /// Sets `field` to `value` on every document currently lacking it and
    /// returns the number of documents modified. Idempotent: re-running is a
    /// no-op on already-patched documents.
    fn set_field_where_missing(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> SyncResult<u64>;
}
