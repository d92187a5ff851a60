//! Integration tests for the full reconciliation pipeline:
//! snapshots -> differ -> plan builder -> backup -> synchronizer -> report.

use schemasync_engine::{
    BackupManager, DiffReport, DocumentStore, ExecutionMode, FileStore, MemoryStore, SyncConfig,
    Synchronizer,
};
use schemasync_core::{
    build_plan, compare, CollectionSchema, DatabaseSchema, FieldInfo, FieldType, IndexInfo,
    IndexKey,
};
use serde_json::json;

/// Reference snapshot: users (required email, optional nickname, unique
/// email index) and orders (numeric total).
fn reference_snapshot() -> DatabaseSchema {
    DatabaseSchema::new("app")
        .with_collection(
            CollectionSchema::new("users")
                .with_document_count(2)
                .with_field("email", FieldInfo::new(FieldType::String).required())
                .with_field("nickname", FieldInfo::new(FieldType::String))
                .with_index(
                    IndexInfo::new("idx_email", vec![IndexKey::asc("email")]).with_unique(true),
                ),
        )
        .with_collection(
            CollectionSchema::new("orders")
                .with_document_count(1)
                .with_field("total", FieldInfo::new(FieldType::Number).required()),
        )
}

/// Local snapshot: users exists but lacks nickname and the email index;
/// orders is missing entirely.
fn local_snapshot() -> DatabaseSchema {
    DatabaseSchema::new("app_local").with_collection(
        CollectionSchema::new("users")
            .with_document_count(2)
            .with_field("email", FieldInfo::new(FieldType::String).required()),
    )
}

/// A target matching the local snapshot.
fn local_target() -> MemoryStore {
    let store = MemoryStore::new();
    store.insert_collection(
        "users",
        vec![json!({"email": "a@x"}), json!({"email": "b@x"})],
    );
    store
}

#[test]
fn full_pipeline_against_memory_target() {
    let reference = reference_snapshot();
    let local = local_snapshot();
    reference.validate().unwrap();
    local.validate().unwrap();

    let differences = compare(&reference, &local);
    let plan = build_plan(&differences);
    // orders create, nickname backfill, email index.
    assert_eq!(plan.len(), 3);

    let dir = tempfile::tempdir().unwrap();
    let config = SyncConfig::new()
        .with_backup_dir(dir.path().join("backups"))
        .with_report_dir(dir.path().join("reports"));
    let sync = Synchronizer::new(local_target(), config.clone());

    // Dry run first: nothing changes.
    let dry = sync.execute(&plan, ExecutionMode::DryRun).unwrap();
    assert_eq!(dry.failed(), 0);
    assert!(dry.backup.is_none());
    assert!(!sync.store().collection_exists("orders").unwrap());

    // Live run applies everything.
    let report = sync.execute(&plan, ExecutionMode::Live).unwrap();
    assert_eq!(report.failed(), 0);
    assert!(report.is_healthy(config.health_threshold));

    assert!(sync.store().collection_exists("orders").unwrap());
    let users = sync.store().documents("users");
    assert!(users.iter().all(|d| d.get("nickname").is_some()));
    assert_eq!(sync.store().indexes("users").len(), 1);

    // The backup reflects the pre-mutation state.
    let backup = report.backup.as_ref().unwrap();
    let manager = BackupManager::new(dir.path().join("backups"));
    assert!(manager.validate_backup(&backup.path).unwrap());
    let artifact = manager.load_backup(&backup.path).unwrap();
    assert!(!artifact.collections.contains_key("orders"));
    assert!(artifact.collections["users"]
        .documents
        .iter()
        .all(|d| d.get("nickname").is_none()));

    // The persisted report round-trips.
    let path = report.save(&config.report_dir).unwrap();
    assert!(path.exists());
}

#[test]
fn live_execution_is_idempotent() {
    let plan = build_plan(&compare(&reference_snapshot(), &local_snapshot()));

    let dir = tempfile::tempdir().unwrap();
    let config = SyncConfig::new().with_backup_dir(dir.path().join("backups"));
    let sync = Synchronizer::new(local_target(), config);

    let first = sync.execute(&plan, ExecutionMode::Live).unwrap();
    assert!(first.documents_modified() > 0);
    let after_first = sync.store().documents("users");

    // Re-running the unmodified plan applies zero net mutation.
    let second = sync.execute(&plan, ExecutionMode::Live).unwrap();
    assert_eq!(second.failed(), 0);
    assert_eq!(second.documents_modified(), 0);
    assert_eq!(sync.store().documents("users"), after_first);
    assert_eq!(sync.store().indexes("users").len(), 1);
}

#[test]
fn backup_failure_leaves_target_untouched() {
    let plan = build_plan(&compare(&reference_snapshot(), &local_snapshot()));

    let store = local_target();
    store.fail_collection("users");
    let dir = tempfile::tempdir().unwrap();
    let config = SyncConfig::new().with_backup_dir(dir.path().join("backups"));
    let sync = Synchronizer::new(store, config);

    let err = sync.execute(&plan, ExecutionMode::Live).unwrap_err();
    assert!(err.is_fatal());
    assert!(!sync.store().collection_exists("orders").unwrap());
}

#[test]
fn operation_failures_are_isolated() {
    let reference = reference_snapshot();
    let local = local_snapshot();
    let plan = build_plan(&compare(&reference, &local));

    // The target's idx_email clashes with the planned definition.
    let store = local_target();
    store.insert_index(
        "users",
        IndexInfo::new("idx_email", vec![IndexKey::asc("email")]).with_unique(false),
    );
    let dir = tempfile::tempdir().unwrap();
    let config = SyncConfig::new().with_backup_dir(dir.path().join("backups"));
    let sync = Synchronizer::new(store, config);

    let report = sync.execute(&plan, ExecutionMode::Live).unwrap();

    // The index conflict is recorded; every other operation still ran.
    assert_eq!(report.failed(), 1);
    assert!(sync.store().collection_exists("orders").unwrap());
    assert!(sync
        .store()
        .documents("users")
        .iter()
        .all(|d| d.get("nickname").is_some()));
    // 2 of 3 operations succeeded; below the default 90% threshold.
    assert!(!report.is_healthy(0.9));
}

#[test]
fn full_pipeline_against_file_target() {
    let reference = reference_snapshot();
    let local = local_snapshot();
    let plan = build_plan(&compare(&reference, &local));

    let dir = tempfile::tempdir().unwrap();
    let target = FileStore::open(dir.path().join("target")).unwrap();
    target.create_collection("users").unwrap();

    let config = SyncConfig::new().with_backup_dir(dir.path().join("backups"));
    let sync = Synchronizer::new(target, config);
    let report = sync.execute(&plan, ExecutionMode::Live).unwrap();
    assert_eq!(report.failed(), 0);

    // A fresh handle observes the mutations on disk.
    let reopened = FileStore::open(dir.path().join("target")).unwrap();
    assert!(reopened.collection_exists("orders").unwrap());
    assert_eq!(reopened.list_indexes("users").unwrap().len(), 1);
}

#[test]
fn decoupled_run_executes_a_saved_plan() {
    let reference = reference_snapshot();
    let local = local_snapshot();
    let differences = compare(&reference, &local);
    let plan = build_plan(&differences);

    let dir = tempfile::tempdir().unwrap();
    let report_path = dir.path().join("diff.json");
    DiffReport::new(&reference, &local, differences, plan)
        .unwrap()
        .save(&report_path)
        .unwrap();

    // A later run loads the artifact and executes its plan without the
    // snapshots.
    let loaded = DiffReport::load(&report_path).unwrap();
    assert_eq!(loaded.reference_fingerprint, reference.fingerprint().unwrap());

    let config = SyncConfig::new().with_backup_dir(dir.path().join("backups"));
    let sync = Synchronizer::new(local_target(), config);
    let report = sync.execute(&loaded.plan, ExecutionMode::Live).unwrap();
    assert_eq!(report.failed(), 0);
    assert!(sync.store().collection_exists("orders").unwrap());
}

#[test]
fn diff_report_summary_groups_by_priority() {
    let reference = reference_snapshot();
    let local = local_snapshot();
    let differences = compare(&reference, &local);
    let plan = build_plan(&differences);
    let report = DiffReport::new(&reference, &local, differences, plan).unwrap();

    let summary = report.render_summary(3);
    assert!(summary.contains("high:"));
    assert!(summary.contains("orders"));
    assert!(summary.contains("Plan: 3 operation(s)"));
}
