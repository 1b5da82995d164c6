//! CLI definitions for Artifact Sync.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Artifact Sync CLI.
#[derive(Parser)]
#[command(name = "artifact-sync")]
#[command(about = "Capture completed chat turns and save them to disk")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path
    #[arg(
        short,
        long,
        env = "ARTIFACT_SYNC_CONFIG",
        default_value = "~/.artifact-sync/config.toml",
        global = true
    )]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Replay a recorded page trace through the observer
    Replay {
        /// Trace file (JSON)
        trace: PathBuf,

        /// Time to wait after the last step before shutting down
        #[arg(long, default_value_t = 5000)]
        settle_ms: u64,

        /// Keep dedup records in memory instead of the state database
        #[arg(long)]
        memory_state: bool,
    },

    /// Load and validate the configuration
    CheckConfig,
}
