//! Concurrent calls against the simulated endpoint.
//!
//! Validates that:
//! - Concurrent first-time calls for one key leave exactly one record
//! - A replay during a delayed success draws its own decision
//! - A replay after the delayed success is answered from the store

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tally_core::{SubmissionRequest, derive};
use tally_endpoint::{
    Decision, Endpoint, IdempotencyStore, InMemoryIdempotencyStore, Outcome, ScriptedDecider,
    SimulatedEndpoint,
};

fn request() -> SubmissionRequest {
    SubmissionRequest::new("a@x.com", "50").unwrap()
}

fn record_of(outcome: Outcome) -> tally_core::SubmissionRecord {
    match outcome {
        Outcome::Success(record) => record,
        other => unreachable!("expected success, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_first_calls_single_record() {
    let store = Arc::new(InMemoryIdempotencyStore::new());
    let decider = Arc::new(ScriptedDecider::new([
        Decision::DelayedSuccess(Duration::from_secs(5)),
        Decision::DelayedSuccess(Duration::from_secs(6)),
        Decision::Succeed,
    ]));
    let endpoint = Arc::new(SimulatedEndpoint::new(store.clone(), decider.clone()));
    let req = request();
    let key = derive(req.identity(), 42_000);

    let calls = (0..3).map(|_| {
        let endpoint = endpoint.clone();
        let (req, key) = (req.clone(), key.clone());
        tokio::spawn(async move { endpoint.call(&req, &key).await })
    });

    let records: Vec<_> = join_all(calls)
        .await
        .into_iter()
        .map(|joined| record_of(joined.unwrap().unwrap()))
        .collect();

    assert_eq!(store.len().await.unwrap(), 1);
    assert!(records.iter().all(|r| r.id == records[0].id));
    assert_eq!(decider.draws(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_replay_during_delay_is_not_deduplicated() {
    let store = Arc::new(InMemoryIdempotencyStore::new());
    let decider = Arc::new(ScriptedDecider::new([
        Decision::DelayedSuccess(Duration::from_secs(8)),
        Decision::TemporaryFailure,
    ]));
    let endpoint = Arc::new(SimulatedEndpoint::new(store.clone(), decider.clone()));
    let req = request();
    let key = derive(req.identity(), 42_000);

    let first = {
        let endpoint = endpoint.clone();
        let (req, key) = (req.clone(), key.clone());
        tokio::spawn(async move { endpoint.call(&req, &key).await })
    };

    tokio::time::sleep(Duration::from_secs(1)).await;
    let during = endpoint.call(&req, &key).await.unwrap();
    assert!(during.is_retryable());
    assert_eq!(decider.draws(), 2);

    let first = record_of(first.await.unwrap().unwrap());

    let after = record_of(endpoint.call(&req, &key).await.unwrap());
    assert_eq!(after, first);
    assert_eq!(decider.draws(), 2);
    assert_eq!(endpoint.cache_hits(), 1);
}

#[tokio::test]
async fn test_distinct_keys_are_independent() {
    let store = Arc::new(InMemoryIdempotencyStore::new());
    let decider = Arc::new(ScriptedDecider::always(Decision::Succeed));
    let endpoint = SimulatedEndpoint::new(store.clone(), decider.clone());
    let req = request();

    let early = record_of(endpoint.call(&req, &derive(req.identity(), 1_000)).await.unwrap());
    let late = record_of(endpoint.call(&req, &derive(req.identity(), 2_000)).await.unwrap());

    assert_ne!(early.id, late.id);
    assert_eq!(store.len().await.unwrap(), 2);
    assert_eq!(decider.draws(), 2);
}
