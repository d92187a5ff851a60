//! CLI subcommand implementations.

pub mod backup;
pub mod diff;
pub mod plan;
pub mod sync;
