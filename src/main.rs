//! # Tally
//!
//! Entry point for the `tally` CLI. Parses arguments, loads configuration,
//! wires the simulated endpoint to a coordinator, and prints every snapshot
//! followed by the committed records.
//!
//! Logs go to stderr and honour `RUST_LOG`; stdout carries only snapshots and
//! records, so `--json` output can be piped.

#![forbid(unsafe_code)]
#![forbid(clippy::unwrap_used)]
#![forbid(clippy::panic)]
#![deny(clippy::expect_used)]

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use tally::cli::Cli;
use tally::commands::execute_command;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    execute_command(Cli::parse()).await
}

/// Initialize tracing subscriber with environment filter.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
