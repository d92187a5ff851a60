//! In-memory document store for tests.

use crate::error::{SyncError, SyncResult};
use crate::store::DocumentStore;
use parking_lot::RwLock;
use schemasync_core::IndexInfo;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Default, Clone)]
struct StoredCollection {
    documents: Vec<Value>,
    indexes: Vec<IndexInfo>,
}

/// An in-memory [`DocumentStore`] with failure injection.
///
/// `fail_collection` marks a collection as unreadable/unwritable so tests
/// can exercise backup-abort and continue-on-error semantics.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<BTreeMap<String, StoredCollection>>,
    failing: RwLock<BTreeSet<String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a collection populated with the given documents.
    pub fn insert_collection(&self, collection: impl Into<String>, documents: Vec<Value>) {
        self.collections.write().insert(
            collection.into(),
            StoredCollection {
                documents,
                indexes: Vec::new(),
            },
        );
    }

    /// Adds an index to an existing collection, creating it if needed.
    pub fn insert_index(&self, collection: impl Into<String>, index: IndexInfo) {
        self.collections
            .write()
            .entry(collection.into())
            .or_default()
            .indexes
            .push(index);
    }

    /// Makes every operation on the given collection fail.
    pub fn fail_collection(&self, collection: impl Into<String>) {
        self.failing.write().insert(collection.into());
    }

    /// Returns a copy of a collection's documents.
    pub fn documents(&self, collection: &str) -> Vec<Value> {
        self.collections
            .read()
            .get(collection)
            .map(|c| c.documents.clone())
            .unwrap_or_default()
    }

    /// Returns a copy of a collection's indexes.
    pub fn indexes(&self, collection: &str) -> Vec<IndexInfo> {
        self.collections
            .read()
            .get(collection)
            .map(|c| c.indexes.clone())
            .unwrap_or_default()
    }

    fn check_failing(&self, collection: &str) -> SyncResult<()> {
        if self.failing.read().contains(collection) {
            Err(SyncError::store(collection, "injected failure"))
        } else {
            Ok(())
        }
    }
}

impl DocumentStore for MemoryStore {
    fn collection_names(&self) -> SyncResult<Vec<String>> {
        Ok(self.collections.read().keys().cloned().collect())
    }

    fn collection_exists(&self, collection: &str) -> SyncResult<bool> {
        self.check_failing(collection)?;
        Ok(self.collections.read().contains_key(collection))
    }

    fn create_collection(&self, collection: &str) -> SyncResult<()> {
        self.check_failing(collection)?;
        self.collections
            .write()
            .entry(collection.to_string())
            .or_default();
        Ok(())
    }

    fn count_documents(&self, collection: &str) -> SyncResult<u64> {
        self.check_failing(collection)?;
        let collections = self.collections.read();
        let stored = collections
            .get(collection)
            .ok_or_else(|| SyncError::store(collection, "collection not found"))?;
        Ok(stored.documents.len() as u64)
    }

    fn read_documents(&self, collection: &str) -> SyncResult<Vec<Value>> {
        self.check_failing(collection)?;
        let collections = self.collections.read();
        let stored = collections
            .get(collection)
            .ok_or_else(|| SyncError::store(collection, "collection not found"))?;
        Ok(stored.documents.clone())
    }

    fn list_indexes(&self, collection: &str) -> SyncResult<Vec<IndexInfo>> {
        self.check_failing(collection)?;
        let collections = self.collections.read();
        let stored = collections
            .get(collection)
            .ok_or_else(|| SyncError::store(collection, "collection not found"))?;
        Ok(stored.indexes.clone())
    }

    fn create_index(&self, collection: &str, index: &IndexInfo) -> SyncResult<()> {
        self.check_failing(collection)?;
        let mut collections = self.collections.write();
        let stored = collections
            .get_mut(collection)
            .ok_or_else(|| SyncError::store(collection, "collection not found"))?;
        stored.indexes.push(index.clone());
        Ok(())
    }

    fn set_field_where_missing(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> SyncResult<u64> {
        self.check_failing(collection)?;
        let mut collections = self.collections.write();
        let stored = collections
            .get_mut(collection)
            .ok_or_else(|| SyncError::store(collection, "collection not found"))?;

        let mut modified = 0u64;
        for document in &mut stored.documents {
            if let Some(object) = document.as_object_mut() {
                if !object.contains_key(field) {
                    object.insert(field.to_string(), value.clone());
                    modified += 1;
                }
            }
        }
        Ok(modified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemasync_core::IndexKey;
    use serde_json::json;

    #[test]
    fn backfill_patches_only_missing_fields() {
        let store = MemoryStore::new();
        store.insert_collection(
            "users",
            vec![json!({"email": "a@x"}), json!({"email": "b@x", "nickname": "b"})],
        );

        let modified = store
            .set_field_where_missing("users", "nickname", &json!(""))
            .unwrap();
        assert_eq!(modified, 1);

        // Re-running is a no-op.
        let modified = store
            .set_field_where_missing("users", "nickname", &json!(""))
            .unwrap();
        assert_eq!(modified, 0);
    }

    #[test]
    fn failure_injection() {
        let store = MemoryStore::new();
        store.insert_collection("users", vec![json!({"email": "a@x"})]);
        store.fail_collection("users");

        assert!(store.read_documents("users").is_err());
        assert!(store.count_documents("users").is_err());
    }

    #[test]
    fn missing_collection_errors() {
        let store = MemoryStore::new();
        assert!(store.count_documents("ghost").is_err());
        assert!(!store.collection_exists("ghost").unwrap());
    }

    #[test]
    fn index_management() {
        let store = MemoryStore::new();
        store.insert_collection("users", vec![]);
        store
            .create_index(
                "users",
                &IndexInfo::new("idx_email", vec![IndexKey::asc("email")]),
            )
            .unwrap();

        let indexes = store.list_indexes("users").unwrap();
        assert_eq!(indexes.len(), 1);
        assert_eq!(indexes[0].name, "idx_email");
    }
}
