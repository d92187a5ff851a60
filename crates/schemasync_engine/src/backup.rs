//! Backup-before-mutate.
//!
//! Before a live run touches the target, every collection's documents and
//! index descriptors are dumped to `backup_<run_id>.json` with a sibling
//! `.sha256` digest. Any read failure is fatal: mutation without a verified
//! backup is not acceptable.

use crate::error::{SyncError, SyncResult};
use crate::store::DocumentStore;
use chrono::{DateTime, Utc};
use schemasync_core::IndexInfo;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Dump of one collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionBackup {
    /// All documents at backup time.
    pub documents: Vec<Value>,
    /// All index descriptors at backup time.
    pub indexes: Vec<IndexInfo>,
    /// Document count.
    pub count: u64,
}

/// The persisted backup artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupArtifact {
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Per-collection dumps, keyed by collection name.
    pub collections: BTreeMap<String, CollectionBackup>,
}

/// Summary of a completed backup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSummary {
    /// Path of the artifact.
    pub path: PathBuf,
    /// SHA-256 hex digest of the artifact bytes.
    pub digest: String,
    /// Number of collections dumped.
    pub collections: u64,
    /// Number of documents dumped.
    pub documents: u64,
    /// Artifact size in bytes.
    pub bytes: u64,
}

/// Creates and validates backup artifacts.
#[derive(Debug, Clone)]
pub struct BackupManager {
    backup_dir: PathBuf,
}

impl BackupManager {
    /// Creates a manager writing under the given directory.
    pub fn new(backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            backup_dir: backup_dir.into(),
        }
    }

    /// Dumps the target's current documents and indexes.
    ///
    /// Fails with [`SyncError::BackupFailed`] if any collection cannot be
    /// fully read or the artifact cannot be written.
    pub fn create_backup(
        &self,
        store: &dyn DocumentStore,
        run_id: &str,
    ) -> SyncResult<BackupSummary> {
        let names = store
            .collection_names()
            .map_err(|e| SyncError::backup_failed(format!("failed to list collections: {}", e)))?;

        let mut collections = BTreeMap::new();
        let mut total_documents = 0u64;
        for name in names {
            let documents = store.read_documents(&name).map_err(|e| {
                SyncError::backup_failed(format!("failed to read collection {}: {}", name, e))
            })?;
            let indexes = store.list_indexes(&name).map_err(|e| {
                SyncError::backup_failed(format!("failed to read indexes of {}: {}", name, e))
            })?;
            let count = documents.len() as u64;
            total_documents += count;
            collections.insert(
                name,
                CollectionBackup {
                    documents,
                    indexes,
                    count,
                },
            );
        }

        let artifact = BackupArtifact {
            created_at: Utc::now(),
            collections,
        };

        fs::create_dir_all(&self.backup_dir)
            .map_err(|e| SyncError::backup_failed(format!("failed to create backup dir: {}", e)))?;
        let path = self.backup_dir.join(format!("backup_{}.json", run_id));
        let data = serde_json::to_vec_pretty(&artifact)
            .map_err(|e| SyncError::backup_failed(format!("failed to serialize backup: {}", e)))?;
        let digest = sha256_hex(&data);
        fs::write(&path, &data)
            .map_err(|e| SyncError::backup_failed(format!("failed to write {:?}: {}", path, e)))?;
        fs::write(digest_path(&path), &digest)
            .map_err(|e| SyncError::backup_failed(format!("failed to write digest: {}", e)))?;

        let summary = BackupSummary {
            path,
            digest,
            collections: artifact.collections.len() as u64,
            documents: total_documents,
            bytes: data.len() as u64,
        };
        tracing::info!(
            path = ?summary.path,
            collections = summary.collections,
            documents = summary.documents,
            "backup complete"
        );
        Ok(summary)
    }

    /// Re-reads and re-hashes an artifact against its stored digest.
    pub fn validate_backup(&self, path: &Path) -> SyncResult<bool> {
        let data = fs::read(path)?;
        let stored = fs::read_to_string(digest_path(path))?;
        Ok(sha256_hex(&data) == stored.trim())
    }

    /// Parses a backup artifact.
    pub fn load_backup(&self, path: &Path) -> SyncResult<BackupArtifact> {
        let data = fs::read(path)?;
        Ok(serde_json::from_slice(&data)?)
    }
}

fn digest_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".sha256");
    PathBuf::from(name)
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use schemasync_core::{IndexInfo, IndexKey};
    use serde_json::json;

    fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_collection(
            "users",
            vec![json!({"email": "a@x"}), json!({"email": "b@x"})],
        );
        store.insert_index(
            "users",
            IndexInfo::new("idx_email", vec![IndexKey::asc("email")]),
        );
        store.insert_collection("orders", vec![json!({"total": 5})]);
        store
    }

    #[test]
    fn backup_dumps_documents_and_indexes() {
        let dir = tempfile::tempdir().unwrap();
        let manager = BackupManager::new(dir.path());
        let store = seeded_store();

        let summary = manager.create_backup(&store, "20260805T120000Z").unwrap();
        assert_eq!(summary.collections, 2);
        assert_eq!(summary.documents, 3);
        assert!(summary.path.exists());

        let artifact = manager.load_backup(&summary.path).unwrap();
        assert_eq!(artifact.collections["users"].count, 2);
        assert_eq!(artifact.collections["users"].indexes.len(), 1);
        assert_eq!(artifact.collections["orders"].count, 1);
    }

    #[test]
    fn backup_validates_against_digest() {
        let dir = tempfile::tempdir().unwrap();
        let manager = BackupManager::new(dir.path());
        let store = seeded_store();

        let summary = manager.create_backup(&store, "run1").unwrap();
        assert!(manager.validate_backup(&summary.path).unwrap());

        // Corrupt the artifact.
        let mut data = fs::read(&summary.path).unwrap();
        data[10] ^= 0xFF;
        fs::write(&summary.path, &data).unwrap();
        assert!(!manager.validate_backup(&summary.path).unwrap());
    }

    #[test]
    fn unreadable_collection_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let manager = BackupManager::new(dir.path());
        let store = seeded_store();
        store.fail_collection("orders");

        let err = manager.create_backup(&store, "run1").unwrap_err();
        assert!(matches!(err, SyncError::BackupFailed { .. }));
        assert!(err.is_fatal());
        assert!(err.to_string().contains("orders"));
    }

    #[test]
    fn empty_target_backs_up_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let manager = BackupManager::new(dir.path());
        let store = MemoryStore::new();

        let summary = manager.create_backup(&store, "run1").unwrap();
        assert_eq!(summary.collections, 0);
        assert_eq!(summary.documents, 0);
        assert!(manager.validate_backup(&summary.path).unwrap());
    }
}
