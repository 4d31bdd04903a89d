//! CLI command definitions using clap.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Tally - at-most-once submissions against a flaky endpoint
#[derive(Parser, Debug)]
#[command(name = "tally")]
#[command(version)]
#[command(about = "Record facts at most once against an unreliable endpoint")]
#[command(
    long_about = "Tally submits identity + amount facts to a simulated flaky endpoint, retrying transient failures on a fixed delay and deduplicating concurrent and repeated submissions."
)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Seed for the endpoint's failure draws
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Print snapshots and records as JSON lines
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Submit one fact and follow it to a terminal state
    Submit {
        /// Identity the fact is recorded against
        #[arg(short, long)]
        email: String,

        /// Amount, at most two decimal places
        #[arg(short, long)]
        amount: String,

        /// Submit the same fact this many times in sequence
        #[arg(short, long, default_value_t = 1)]
        repeat: u32,
    },

    /// Fire concurrent submissions of the same fact
    Burst {
        /// Identity the fact is recorded against
        #[arg(short, long)]
        email: String,

        /// Amount, at most two decimal places
        #[arg(short, long)]
        amount: String,

        /// Number of concurrent submissions
        #[arg(short = 'n', long, default_value_t = 3)]
        count: u32,
    },
}
