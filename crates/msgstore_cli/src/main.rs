//! msgstore CLI
//!
//! Offline tools for the overflow directory of a message store.
//!
//! # Commands
//!
//! - `inspect` - List segments with their size and chunk count
//! - `verify` - Check every chunk checksum and entity encoding
//! - `dump` - Print the stored entities as JSON lines
//!
//! The tools only read segment files and never take the directory lock,
//! so they can run next to a live broker.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// msgstore overflow directory tools.
#[derive(Parser)]
#[command(name = "msgstore")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the overflow directory
    #[arg(global = true, short, long)]
    dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List overflow segments
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Verify chunk checksums and entity encoding
    Verify,

    /// Print stored entities as JSON lines, oldest first
    Dump {
        /// Maximum number of entities to print
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Inspect { format } => {
            let dir = cli.dir.ok_or("Overflow directory required for inspect")?;
            commands::inspect::run(&dir, &format)?;
        }
        Commands::Verify => {
            let dir = cli.dir.ok_or("Overflow directory required for verify")?;
            commands::verify::run(&dir)?;
        }
        Commands::Dump { limit } => {
            let dir = cli.dir.ok_or("Overflow directory required for dump")?;
            commands::dump::run(&dir, limit)?;
        }
        Commands::Version => {
            println!("msgstore CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
