//! Sync command implementation.

use schemasync_core::{build_plan, compare, DatabaseSchema};
use schemasync_engine::{DiffReport, ExecutionMode, FileStore, SyncConfig, Synchronizer};
use std::path::Path;

/// Runs the sync command. Returns whether the run was healthy.
pub fn run(
    reference: Option<&Path>,
    local: Option<&Path>,
    plan_file: Option<&Path>,
    target: &Path,
    live: bool,
    backup_dir: Option<&Path>,
    report_dir: Option<&Path>,
) -> Result<bool, Box<dyn std::error::Error>> {
    let plan = if let Some(path) = plan_file {
        let report = DiffReport::load(path)?;
        println!(
            "loaded plan of {} operation(s) from {:?}",
            report.plan.len(),
            path
        );
        report.plan
    } else {
        let (reference, local) = match (reference, local) {
            (Some(reference), Some(local)) => {
                (DatabaseSchema::load(reference)?, DatabaseSchema::load(local)?)
            }
            _ => return Err("either --plan or both --reference and --local are required".into()),
        };
        reference.validate()?;
        local.validate()?;
        build_plan(&compare(&reference, &local))
    };

    let mut config = SyncConfig::new();
    if let Some(dir) = backup_dir {
        config = config.with_backup_dir(dir);
    }
    if let Some(dir) = report_dir {
        config = config.with_report_dir(dir);
    }

    let store = FileStore::open(target)?;
    let synchronizer = Synchronizer::new(store, config.clone());
    let mode = if live {
        ExecutionMode::Live
    } else {
        ExecutionMode::DryRun
    };

    let report = synchronizer.execute(&plan, mode)?;
    let path = report.save(&config.report_dir)?;

    print!("{}", report.render_summary(config.health_threshold));
    println!("report written to {:?}", path);

    Ok(report.is_healthy(config.health_threshold))
}
