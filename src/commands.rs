//! CLI command handlers.
//!
//! Handlers return what happened (snapshots, rejections, records) and leave
//! printing to [`execute_command`], so they can be driven directly in tests.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::future::join_all;
use tally_coordinator::{Error as CoordinatorError, SubmissionCoordinator, SubmissionState};
use tally_core::{CoordinatorConfig, SubmissionRecord, SubmissionRequest, TallyConfig};
use tally_endpoint::{
    Decider, IdempotencyStore, InMemoryIdempotencyStore, RandomDecider, SimulatedEndpoint,
};
use tracing::{info, warn};

use crate::cli::{Cli, Commands};

/// Load the configuration file, or the defaults when none is given.
///
/// # Errors
///
/// Returns an error if the file cannot be read or fails validation.
pub fn load_config(path: Option<&Path>) -> Result<TallyConfig> {
    path.map_or_else(
        || Ok(TallyConfig::default()),
        |path| {
            TallyConfig::load(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))
        },
    )
}

/// A coordinator wired to a simulated endpoint and its store.
pub struct App {
    coordinator: SubmissionCoordinator,
    store: Arc<InMemoryIdempotencyStore>,
}

/// Result of one `burst`.
#[derive(Debug)]
pub struct BurstReport {
    /// Snapshot sequences of the submissions that were accepted.
    pub trajectories: Vec<Vec<SubmissionState>>,
    /// Submissions rejected as already in progress.
    pub rejected: Vec<CoordinatorError>,
}

impl App {
    /// Build from configuration, drawing endpoint decisions at random.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint configuration is invalid.
    pub fn new(config: &TallyConfig, seed: Option<u64>) -> Result<Self> {
        let decider = seed
            .map_or_else(
                || RandomDecider::new(config.endpoint.clone()),
                |seed| RandomDecider::seeded(config.endpoint.clone(), seed),
            )
            .context("Invalid endpoint configuration")?;
        Ok(Self::with_decider(config.coordinator.clone(), Arc::new(decider)))
    }

    /// Build around an explicit decision source.
    pub fn with_decider(config: CoordinatorConfig, decider: Arc<dyn Decider>) -> Self {
        let store = Arc::new(InMemoryIdempotencyStore::new());
        let endpoint = Arc::new(SimulatedEndpoint::new(store.clone(), decider));
        Self {
            coordinator: SubmissionCoordinator::with_config(endpoint, config),
            store,
        }
    }

    pub const fn coordinator(&self) -> &SubmissionCoordinator {
        &self.coordinator
    }

    /// Submit `request` `repeat` times in sequence, each run to completion.
    ///
    /// # Errors
    ///
    /// Returns an error if a submission is rejected as already in progress.
    pub async fn submit(
        &self,
        request: &SubmissionRequest,
        repeat: u32,
    ) -> Result<Vec<Vec<SubmissionState>>> {
        let mut runs = Vec::new();
        for round in 1..=repeat.max(1) {
            info!(round, token = %request.dedupe_token(), "Submitting");
            let mut handle = self.coordinator.submit(request.clone())?;
            let mut states = Vec::new();
            while let Some(state) = handle.next().await {
                states.push(state);
            }
            runs.push(states);
        }
        Ok(runs)
    }

    /// Submit `request` `count` times without waiting in between.
    pub async fn burst(&self, request: &SubmissionRequest, count: u32) -> BurstReport {
        let (handles, rejected): (Vec<_>, Vec<_>) = (0..count.max(1))
            .map(|_| self.coordinator.submit(request.clone()))
            .partition(std::result::Result::is_ok);

        let handles = handles.into_iter().flatten();
        let rejected: Vec<_> = rejected
            .into_iter()
            .filter_map(std::result::Result::err)
            .collect();
        if !rejected.is_empty() {
            warn!(rejected = rejected.len(), "Duplicate submissions rejected");
        }

        let trajectories = join_all(handles.map(|mut handle| async move {
            let mut states = Vec::new();
            while let Some(state) = handle.next().await {
                states.push(state);
            }
            states
        }))
        .await;

        BurstReport {
            trajectories,
            rejected,
        }
    }

    /// Every record committed so far, in commit order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn records(&self) -> Result<Vec<SubmissionRecord>> {
        self.store
            .records()
            .await
            .context("Failed to read committed records")
    }
}

/// Execute a CLI command.
///
/// # Errors
///
/// Returns an error on invalid configuration or input, or if output cannot
/// be serialized.
pub async fn execute_command(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let app = App::new(&config, cli.seed)?;

    match cli.command {
        Commands::Submit {
            email,
            amount,
            repeat,
        } => {
            let request = parse_request(&email, &amount)?;
            for states in app.submit(&request, repeat).await? {
                print_states(&states, cli.json)?;
            }
        }

        Commands::Burst {
            email,
            amount,
            count,
        } => {
            let request = parse_request(&email, &amount)?;
            let report = app.burst(&request, count).await;
            for err in &report.rejected {
                print_rejection(err, cli.json);
            }
            for states in &report.trajectories {
                print_states(states, cli.json)?;
            }
        }
    }

    print_records(&app.records().await?, cli.json)
}

fn parse_request(email: &str, amount: &str) -> Result<SubmissionRequest> {
    SubmissionRequest::new(email, amount).context("Invalid submission")
}

fn print_states(states: &[SubmissionState], json: bool) -> Result<()> {
    for state in states {
        if json {
            println!("{}", serde_json::to_string(state)?);
        } else {
            println!("{state}");
        }
    }
    Ok(())
}

fn print_rejection(err: &CoordinatorError, json: bool) {
    if json {
        println!("{}", serde_json::json!({ "rejected": err.to_string() }));
    } else {
        println!("rejected: {err}");
    }
}

fn print_records(records: &[SubmissionRecord], json: bool) -> Result<()> {
    if json {
        for record in records {
            println!("{}", serde_json::to_string(record)?);
        }
        return Ok(());
    }

    println!("{} record(s) committed", records.len());
    for record in records {
        println!(
            "  {} {} {} {}",
            record.id,
            record.identity,
            record.amount,
            record.created_at.to_rfc3339()
        );
    }
    Ok(())
}
