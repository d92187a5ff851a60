//! schemasync CLI
//!
//! Command-line tools for schema reconciliation.
//!
//! # Commands
//!
//! - `diff` - Compare two snapshots and report differences
//! - `plan` - Print the sync plan derived from two snapshots
//! - `sync` - Execute a sync plan against a target (dry-run by default)
//! - `backup` - Back up a target before manual interventions

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Schema reconciliation command-line tools.
#[derive(Parser)]
#[command(name = "schemasync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two snapshots and report differences
    Diff {
        /// Reference snapshot file
        #[arg(short, long)]
        reference: PathBuf,

        /// Local snapshot file
        #[arg(short, long)]
        local: PathBuf,

        /// Write the diff report (differences plus plan) to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print the sync plan derived from two snapshots
    Plan {
        /// Reference snapshot file
        #[arg(short, long)]
        reference: PathBuf,

        /// Local snapshot file
        #[arg(short, long)]
        local: PathBuf,
    },

    /// Execute a sync plan against a target directory
    Sync {
        /// Reference snapshot file
        #[arg(long)]
        reference: Option<PathBuf>,

        /// Local snapshot file
        #[arg(long)]
        local: Option<PathBuf>,

        /// Previously saved diff report to execute instead of diffing
        #[arg(long)]
        plan: Option<PathBuf>,

        /// Target database directory
        #[arg(short, long)]
        target: PathBuf,

        /// Apply mutations (default is dry-run)
        #[arg(long)]
        live: bool,

        /// Backup directory
        #[arg(long)]
        backup_dir: Option<PathBuf>,

        /// Report directory
        #[arg(long)]
        report_dir: Option<PathBuf>,
    },

    /// Back up a target directory
    Backup {
        /// Target database directory
        #[arg(short, long)]
        target: PathBuf,

        /// Backup directory
        #[arg(long)]
        backup_dir: Option<PathBuf>,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Diff {
            reference,
            local,
            output,
            format,
        } => {
            commands::diff::run(&reference, &local, output.as_deref(), &format)?;
        }
        Commands::Plan { reference, local } => {
            commands::plan::run(&reference, &local)?;
        }
        Commands::Sync {
            reference,
            local,
            plan,
            target,
            live,
            backup_dir,
            report_dir,
        } => {
            let healthy = commands::sync::run(
                reference.as_deref(),
                local.as_deref(),
                plan.as_deref(),
                &target,
                live,
                backup_dir.as_deref(),
                report_dir.as_deref(),
            )?;
            if !healthy {
                std::process::exit(1);
            }
        }
        Commands::Backup { target, backup_dir } => {
            commands::backup::run(&target, backup_dir.as_deref())?;
        }
        Commands::Version => {
            println!("schemasync v{}", env!("CARGO_PKG_VERSION"));
            println!("schemasync core v{}", schemasync_core::VERSION);
        }
    }

    Ok(())
}
