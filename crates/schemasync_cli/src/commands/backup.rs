//! Backup command implementation.

use chrono::Utc;
use schemasync_engine::{BackupManager, FileStore, SyncConfig};
use std::path::Path;

/// Runs the backup command.
pub fn run(target: &Path, backup_dir: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let store = FileStore::open(target)?;
    let dir = backup_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| SyncConfig::new().backup_dir);

    let run_id = Utc::now().format("%Y%m%dT%H%M%SZ").to_string();
    let manager = BackupManager::new(dir);
    let summary = manager.create_backup(&store, &run_id)?;

    println!("backup written to {:?}", summary.path);
    println!("  collections: {}", summary.collections);
    println!("  documents:   {}", summary.documents);
    println!("  size:        {} bytes", summary.bytes);
    println!("  sha256:      {}", summary.digest);

    Ok(())
}
