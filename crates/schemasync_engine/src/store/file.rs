//! JSON-directory document store.
//!
//! Each collection is one `<name>.json` file under the root directory with
//! the shape `{ "documents": [...], "indexes": [...] }`. This gives the CLI
//! a concrete target and the integration tests a durable one.

use crate::error::{SyncError, SyncResult};
use crate::store::DocumentStore;
use schemasync_core::IndexInfo;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Serialize, Deserialize)]
struct CollectionFile {
    #[serde(default)]
    documents: Vec<Value>,
    #[serde(default)]
    indexes: Vec<IndexInfo>,
}

/// A [`DocumentStore`] backed by a directory of JSON files.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Opens a store rooted at the given directory, creating it if needed.
    pub fn open(root: impl Into<PathBuf>) -> SyncResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn collection_path(&self, collection: &str) -> PathBuf {
        self.root.join(format!("{}.json", collection))
    }

    fn read_collection(&self, collection: &str) -> SyncResult<CollectionFile> {
        let path = self.collection_path(collection);
        let data = fs::read_to_string(&path)
            .map_err(|e| SyncError::store(collection, format!("read {:?}: {}", path, e)))?;
        serde_json::from_str(&data)
            .map_err(|e| SyncError::store(collection, format!("parse {:?}: {}", path, e)))
    }

    fn write_collection(&self, collection: &str, file: &CollectionFile) -> SyncResult<()> {
        let path = self.collection_path(collection);
        let data = serde_json::to_string_pretty(file)?;
        fs::write(&path, data)
            .map_err(|e| SyncError::store(collection, format!("write {:?}: {}", path, e)))
    }
}

impl DocumentStore for FileStore {
    fn collection_names(&self) -> SyncResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn collection_exists(&self, collection: &str) -> SyncResult<bool> {
        Ok(self.collection_path(collection).exists())
    }

    fn create_collection(&self, collection: &str) -> SyncResult<()> {
        self.write_collection(collection, &CollectionFile::default())
    }

    fn count_documents(&self, collection: &str) -> SyncResult<u64> {
        Ok(self.read_collection(collection)?.documents.len() as u64)
    }

    fn read_documents(&self, collection: &str) -> SyncResult<Vec<Value>> {
        Ok(self.read_collection(collection)?.documents)
    }

    fn list_indexes(&self, collection: &str) -> SyncResult<Vec<IndexInfo>> {
        Ok(self.read_collection(collection)?.indexes)
    }

    fn create_index(&self, collection: &str, index: &IndexInfo) -> SyncResult<()> {
        let mut file = self.read_collection(collection)?;
        file.indexes.push(index.clone());
        self.write_collection(collection, &file)
    }

    fn set_field_where_missing(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> SyncResult<u64> {
        let mut file = self.read_collection(collection)?;
        let mut modified = 0u64;
        for document in &mut file.documents {
            if let Some(object) = document.as_object_mut() {
                if !object.contains_key(field) {
                    object.insert(field.to_string(), value.clone());
                    modified += 1;
                }
            }
        }
        if modified > 0 {
            self.write_collection(collection, &file)?;
        }
        Ok(modified)
    }
}
