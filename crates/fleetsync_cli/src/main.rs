//! Fleetsync CLI
//!
//! Command-line tools for provisioning store management.
//!
//! # Commands
//!
//! - `inspect` - Display store statistics and metadata
//! - `verify` - Verify store integrity
//! - `dump-log` - Dump event log records for debugging
//! - `ranges` - Show held event id ranges, optionally against a peer store
//! - `diff` - Diff two deployment snapshot files

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Fleetsync command-line provisioning tools.
#[derive(Parser)]
#[command(name = "fleetsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the store directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display store statistics and metadata
    Inspect {
        /// Show per-log detail
        #[arg(short, long)]
        logs: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Verify store integrity
    Verify {
        /// Check the versioned repository
        #[arg(short, long)]
        repository: bool,

        /// Check the event logs
        #[arg(short, long)]
        logs: bool,

        /// Check all (default if no flags specified)
        #[arg(short, long)]
        all: bool,
    },

    /// Dump event log records for debugging
    DumpLog {
        /// Dump only this log id
        #[arg(long)]
        log: Option<u64>,

        /// Maximum number of events to dump
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show held event id ranges, optionally against a peer store
    Ranges {
        /// Peer store directory to compare against
        #[arg(long)]
        peer: Option<PathBuf>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Diff two deployment snapshot files
    Diff {
        /// Target snapshot JSON file
        to: PathBuf,

        /// Baseline snapshot JSON file (omit for a full-install view)
        #[arg(long)]
        from: Option<PathBuf>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
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
        Commands::Inspect { logs, format } => {
            let path = cli.path.ok_or("Store path required for inspect")?;
            commands::inspect::run(&path, logs, &format)?;
        }
        Commands::Verify {
            repository,
            logs,
            all,
        } => {
            let path = cli.path.ok_or("Store path required for verify")?;
            let check_all = all || (!repository && !logs);
            commands::verify::run(&path, repository || check_all, logs || check_all)?;
        }
        Commands::DumpLog { log, limit, format } => {
            let path = cli.path.ok_or("Store path required for dump-log")?;
            commands::dump_log::run(&path, log, limit, &format)?;
        }
        Commands::Ranges { peer, format } => {
            let path = cli.path.ok_or("Store path required for ranges")?;
            commands::ranges::run(&path, peer.as_deref(), &format)?;
        }
        Commands::Diff { to, from, format } => {
            commands::diff::run(from.as_deref(), &to, &format)?;
        }
        Commands::Version => {
            println!("Fleetsync CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
