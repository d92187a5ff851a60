//! Diff command implementation.

use schemasync_core::{build_plan, compare, DatabaseSchema};
use schemasync_engine::{DiffReport, SyncConfig};
use std::path::Path;

/// Runs the diff command.
pub fn run(
    reference: &Path,
    local: &Path,
    output: Option<&Path>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let reference = DatabaseSchema::load(reference)?;
    let local = DatabaseSchema::load(local)?;
    reference.validate()?;
    local.validate()?;

    let differences = compare(&reference, &local);
    let plan = build_plan(&differences);
    let report = DiffReport::new(&reference, &local, differences, plan)?;

    if let Some(path) = output {
        report.save(path)?;
        println!("diff report written to {:?}", path);
    }

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print!("{}", report.render_summary(SyncConfig::new().display_cap)),
    }

    Ok(())
}
