//! Perch CLI
//!
//! Operator tools for the Perch catalog.
//!
//! # Commands
//!
//! - `import` - Import a crawled-post feed into a snapshot
//! - `inspect` - Display snapshot statistics
//! - `bootstrap` - Replay a fresh client bootstrap against a snapshot

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Perch catalog command-line tools.
#[derive(Parser)]
#[command(name = "perch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the snapshot file
    #[arg(global = true, short, long)]
    snapshot: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a JSON-lines feed of crawled posts into the snapshot
    Import {
        /// Path to the feed file, one JSON object per line
        feed: PathBuf,

        /// Skip entries that fail to parse instead of aborting
        #[arg(short, long)]
        lenient: bool,
    },

    /// Display snapshot statistics
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Replay a fresh client bootstrap against the snapshot
    Bootstrap {
        /// Records per pull round
        #[arg(short, long, default_value = "100")]
        limit: usize,

        /// Maximum pull rounds before giving up
        #[arg(short, long, default_value = "1000")]
        rounds: usize,
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
        Commands::Import { feed, lenient } => {
            let snapshot = cli.snapshot.ok_or("Snapshot path required for import")?;
            commands::import::run(&snapshot, &feed, lenient)?;
        }
        Commands::Inspect { format } => {
            let snapshot = cli.snapshot.ok_or("Snapshot path required for inspect")?;
            commands::inspect::run(&snapshot, &format)?;
        }
        Commands::Bootstrap { limit, rounds } => {
            let snapshot = cli.snapshot.ok_or("Snapshot path required for bootstrap")?;
            commands::bootstrap::run(&snapshot, limit, rounds)?;
        }
        Commands::Version => {
            println!("Perch CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
