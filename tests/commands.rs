//! CLI command handlers driven against scripted endpoints.

#![allow(clippy::unwrap_used)]

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use tally::commands::{App, load_config};
use tally::tally_coordinator::{Error, SubmissionStatus};
use tally::tally_core::{CoordinatorConfig, SubmissionRequest, TallyConfig};
use tally::tally_endpoint::{Decision, ScriptedDecider};

fn request() -> SubmissionRequest {
    SubmissionRequest::new("a@x.com", "50").unwrap()
}

fn app(decider: ScriptedDecider) -> App {
    App::with_decider(CoordinatorConfig::default(), Arc::new(decider))
}

#[tokio::test(start_paused = true)]
async fn test_submit_repeat_commits_once_per_key() {
    let app = app(ScriptedDecider::new([Decision::TemporaryFailure, Decision::Succeed]));

    let runs = app.submit(&request(), 2).await.unwrap();

    assert_eq!(runs.len(), 2);
    let first = runs[0].last().unwrap();
    assert_eq!(first.status(), SubmissionStatus::Succeeded);
    assert_eq!(first.attempt, 1);
    assert!(runs[1].last().unwrap().is_terminal());
    assert!(!app.coordinator().is_in_flight("a@x.com:50.00"));
}

#[tokio::test(start_paused = true)]
async fn test_burst_reports_one_trajectory() {
    let app = app(ScriptedDecider::always(Decision::DelayedSuccess(
        Duration::from_secs(6),
    )));

    let report = app.burst(&request(), 4).await;

    assert_eq!(report.trajectories.len(), 1);
    assert_eq!(report.rejected.len(), 3);
    assert!(
        report
            .rejected
            .iter()
            .all(|err| matches!(err, Error::AlreadyInProgress { .. }))
    );
    assert_eq!(
        report.trajectories[0].last().unwrap().status(),
        SubmissionStatus::Succeeded
    );
    assert_eq!(app.records().await.unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_submit_leaves_no_records() {
    let app = app(ScriptedDecider::always(Decision::TemporaryFailure));

    let runs = app.submit(&request(), 1).await.unwrap();

    assert_eq!(runs[0].last().unwrap().status(), SubmissionStatus::Failed);
    assert!(app.records().await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_seeded_app_reaches_terminal_state() {
    let app = App::new(&TallyConfig::default(), Some(42)).unwrap();

    let runs = app.submit(&request(), 1).await.unwrap();

    assert!(runs[0].last().unwrap().is_terminal());
}

#[test]
fn test_app_rejects_unvalidated_endpoint_config() {
    let mut config = TallyConfig::default();
    config.endpoint.min_delay_ms = 10;
    config.endpoint.max_delay_ms = 5;

    assert!(App::new(&config, Some(1)).is_err());
}

#[test]
fn test_load_config_defaults_and_file() {
    assert_eq!(load_config(None).unwrap(), TallyConfig::default());

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[coordinator]\nmax_retries = 1").unwrap();
    let config = load_config(Some(file.path())).unwrap();
    assert_eq!(config.coordinator.max_retries, 1);

    let missing = load_config(Some(std::path::Path::new("/nonexistent/tally.toml")));
    assert!(missing.is_err());
}
