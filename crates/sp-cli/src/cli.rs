//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Attendance checkpoint controller.
///
/// Reads identity tokens from a scanner, matches them against the currently
/// scheduled session, and reconciles attendance records in the remote store.
#[derive(Debug, Parser)]
#[command(name = "scanpoint", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the checkpoint controller.
    Run,

    /// Fetch the schedule and show which session is active right now.
    Schedule {
        /// Print the schedule as JSON.
        #[arg(long)]
        json: bool,
    },
}
