//! Plan command implementation.

use schemasync_core::{build_plan, compare, DatabaseSchema};
use std::path::Path;

/// Runs the plan command.
pub fn run(reference: &Path, local: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let reference = DatabaseSchema::load(reference)?;
    let local = DatabaseSchema::load(local)?;
    reference.validate()?;
    local.validate()?;

    let plan = build_plan(&compare(&reference, &local));
    if plan.is_empty() {
        println!("schemas are in sync; nothing to do");
        return Ok(());
    }

    println!("{} operation(s):", plan.len());
    for operation in &plan {
        println!(
            "  [{}] {} {}",
            operation.priority,
            operation.kind(),
            operation.command_description
        );
    }

    Ok(())
}
