//! Endpoint contract and the simulated flaky endpoint.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tally_core::{IdempotencyKey, SubmissionRecord, SubmissionRequest};
use tracing::{debug, warn};

use crate::decider::{Decider, Decision};
use crate::error::EndpointFault;
use crate::store::IdempotencyStore;

/// Message carried by a 503-style temporary failure.
pub const TEMPORARY_FAILURE_MESSAGE: &str = "service temporarily unavailable (503)";

/// Response of one endpoint call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The fact is recorded (now or by an earlier call with the same key).
    Success(SubmissionRecord),
    /// Retryable rejection.
    TemporaryFailure { message: String },
    /// Fatal rejection; retrying cannot help.
    Rejected { message: String },
}

impl Outcome {
    /// Create a temporary failure.
    pub fn temporary_failure(message: impl Into<String>) -> Self {
        Self::TemporaryFailure {
            message: message.into(),
        }
    }

    /// Create a fatal rejection.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    /// Check if the coordinator may retry after this outcome.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::TemporaryFailure { .. })
    }
}

/// Remote service a submission is recorded against.
///
/// A call carries the idempotency key; an implementation must return the
/// cached outcome for a key it has already recorded.
#[async_trait]
pub trait Endpoint: Send + Sync {
    /// Submit `request` under `key`.
    ///
    /// # Errors
    ///
    /// Returns `EndpointFault` for transient faults raised instead of a
    /// response. Faults are always retryable.
    async fn call(
        &self,
        request: &SubmissionRequest,
        key: &IdempotencyKey,
    ) -> Result<Outcome, EndpointFault>;
}

/// Flaky endpoint backed by an idempotency store.
///
/// On a cache hit the stored record is returned without drawing a decision.
/// On a miss one decision is drawn; successes (immediate or delayed) are
/// committed before the response is returned, failures are never cached.
pub struct SimulatedEndpoint {
    store: Arc<dyn IdempotencyStore>,
    decider: Arc<dyn Decider>,
    calls: AtomicU64,
    cache_hits: AtomicU64,
}

impl SimulatedEndpoint {
    /// Create an endpoint over `store`, drawing decisions from `decider`.
    pub fn new(store: Arc<dyn IdempotencyStore>, decider: Arc<dyn Decider>) -> Self {
        Self {
            store,
            decider,
            calls: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
        }
    }

    /// The store this endpoint commits into.
    pub fn store(&self) -> &Arc<dyn IdempotencyStore> {
        &self.store
    }

    /// Total calls received.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Calls answered from the store.
    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::SeqCst)
    }

    async fn record_success(
        &self,
        request: &SubmissionRequest,
        key: &IdempotencyKey,
    ) -> Result<Outcome, EndpointFault> {
        let record = SubmissionRecord::success(request, Utc::now());
        let committed = self.store.commit(key.clone(), record).await?;
        if !committed.is_fresh() {
            debug!(key = %key, "Concurrent call committed first");
        }
        Ok(Outcome::Success(committed.into_record()))
    }
}

#[async_trait]
impl Endpoint for SimulatedEndpoint {
    async fn call(
        &self,
        request: &SubmissionRequest,
        key: &IdempotencyKey,
    ) -> Result<Outcome, EndpointFault> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(record) = self.store.lookup(key).await? {
            self.cache_hits.fetch_add(1, Ordering::SeqCst);
            debug!(key = %key, record_id = %record.id, "Idempotency cache hit");
            return Ok(Outcome::Success(record));
        }

        let decision = self.decider.decide();
        debug!(key = %key, decision = ?decision, "Endpoint decision");

        match decision {
            Decision::Succeed => self.record_success(request, key).await,
            Decision::DelayedSuccess(delay) => {
                tokio::time::sleep(delay).await;
                self.record_success(request, key).await
            }
            Decision::TemporaryFailure => {
                warn!(key = %key, "Endpoint returned temporary failure");
                Ok(Outcome::temporary_failure(TEMPORARY_FAILURE_MESSAGE))
            }
            Decision::Fault(message) => {
                warn!(key = %key, message = %message, "Endpoint raised fault");
                Err(EndpointFault::new(message))
            }
        }
    }
}

/// An endpoint that delegates to an async closure.
pub struct FnEndpoint<F, Fut>
where
    F: Fn(SubmissionRequest, IdempotencyKey) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Outcome, EndpointFault>> + Send,
{
    func: F,
}

impl<F, Fut> FnEndpoint<F, Fut>
where
    F: Fn(SubmissionRequest, IdempotencyKey) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Outcome, EndpointFault>> + Send,
{
    /// Create a new closure-backed endpoint.
    pub const fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F, Fut> Endpoint for FnEndpoint<F, Fut>
where
    F: Fn(SubmissionRequest, IdempotencyKey) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Outcome, EndpointFault>> + Send,
{
    async fn call(
        &self,
        request: &SubmissionRequest,
        key: &IdempotencyKey,
    ) -> Result<Outcome, EndpointFault> {
        (self.func)(request.clone(), key.clone()).await
    }
}
