//! Submission coordinator and the per-submission handle.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, ready};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::Stream;
use tally_core::{
    CoordinatorConfig, IdempotencyKey, SubmissionRecord, SubmissionRequest, derive_at,
};
use tally_endpoint::{Endpoint, Outcome};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::inflight::{InFlightGuard, InFlightTokens};
use crate::state::SubmissionState;

/// Source of the current time, used once per submission to derive its key.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Drives logical submissions against an endpoint.
///
/// Each [`submit`](Self::submit) runs as its own tokio task. Submissions of
/// the same identity + amount pair are rejected while one is in flight;
/// anything else runs concurrently. The coordinator stays usable after any
/// outcome.
pub struct SubmissionCoordinator {
    endpoint: Arc<dyn Endpoint>,
    config: CoordinatorConfig,
    in_flight: InFlightTokens,
    clock: Clock,
}

impl SubmissionCoordinator {
    /// Create a coordinator with the default retry policy.
    pub fn new(endpoint: Arc<dyn Endpoint>) -> Self {
        Self::with_config(endpoint, CoordinatorConfig::default())
    }

    /// Create a coordinator with an explicit retry policy.
    pub fn with_config(endpoint: Arc<dyn Endpoint>, config: CoordinatorConfig) -> Self {
        Self {
            endpoint,
            config,
            in_flight: InFlightTokens::new(),
            clock: Arc::new(Utc::now),
        }
    }

    /// Replace the clock used for key derivation.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub const fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Dedupe tokens currently in flight, sorted.
    pub fn in_flight(&self) -> Vec<String> {
        self.in_flight.snapshot()
    }

    pub fn is_in_flight(&self, token: &str) -> bool {
        self.in_flight.contains(token)
    }

    /// Start a logical submission.
    ///
    /// The first `Pending` snapshot is queued before this returns; the retry
    /// loop runs on a spawned task. Must be called from within a tokio
    /// runtime.
    ///
    /// # Errors
    ///
    /// Returns `Error::AlreadyInProgress` if the same identity + amount pair
    /// is still in flight. No snapshot is produced in that case.
    pub fn submit(&self, request: SubmissionRequest) -> Result<SubmissionHandle> {
        let token = request.dedupe_token();
        let Some(guard) = self.in_flight.try_acquire(&token) else {
            info!(token = %token, "Submission already in progress, rejecting");
            return Err(Error::already_in_progress(token));
        };

        let key = derive_at(request.identity(), (self.clock)());
        info!(identity = %request.identity(), key = %key, "Starting submission");

        let (updates, receiver) = mpsc::unbounded_channel();
        let dispatch = Dispatch {
            endpoint: Arc::clone(&self.endpoint),
            request: request.clone(),
            key: key.clone(),
            max_retries: self.config.max_retries,
            retry_delay: self.config.retry_delay(),
            updates,
        };
        dispatch.emit(SubmissionState::in_flight(request.clone(), 0, None));

        let task = tokio::spawn(dispatch.run(guard));

        Ok(SubmissionHandle {
            key,
            token,
            request,
            receiver,
            task: Some(task),
            attempt: 0,
            finished: false,
        })
    }
}

/// One running submission: the fixed key, the retry budget, and the channel
/// snapshots go out on.
struct Dispatch {
    endpoint: Arc<dyn Endpoint>,
    request: SubmissionRequest,
    key: IdempotencyKey,
    max_retries: u32,
    retry_delay: Duration,
    updates: UnboundedSender<SubmissionState>,
}

impl Dispatch {
    async fn run(self, guard: InFlightGuard) -> SubmissionState {
        let mut attempt = 0;

        let terminal = loop {
            match self.call_endpoint().await {
                Ok(record) => {
                    info!(
                        key = %self.key,
                        attempt,
                        record_id = %record.id,
                        "Submission succeeded"
                    );
                    break SubmissionState::succeeded(self.request.clone(), attempt, record);
                }
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    warn!(
                        key = %self.key,
                        attempt,
                        error = %err,
                        delay = ?self.retry_delay,
                        "Attempt failed, retrying"
                    );
                    self.emit(SubmissionState::in_flight(
                        self.request.clone(),
                        attempt + 1,
                        Some(err.to_string()),
                    ));
                    tokio::time::sleep(self.retry_delay).await;
                    attempt += 1;
                }
                Err(err) if err.is_retryable() => {
                    let exhausted = Error::retries_exhausted(attempt, err.to_string());
                    error!(key = %self.key, error = %exhausted, "Submission failed");
                    break SubmissionState::failed(
                        self.request.clone(),
                        attempt,
                        exhausted.to_string(),
                    );
                }
                Err(err) => {
                    error!(key = %self.key, attempt, error = %err, "Submission rejected");
                    break SubmissionState::failed(self.request.clone(), attempt, err.to_string());
                }
            }
        };

        guard.release();
        self.emit(terminal.clone());
        terminal
    }

    /// One endpoint call, folded into the coordinator's error taxonomy.
    async fn call_endpoint(&self) -> Result<SubmissionRecord> {
        match self.endpoint.call(&self.request, &self.key).await {
            Ok(Outcome::Success(record)) => Ok(record),
            Ok(Outcome::TemporaryFailure { message }) => Err(Error::transient(message)),
            Ok(Outcome::Rejected { message }) => Err(Error::rejected(message)),
            Err(fault) => Err(Error::transient(fault.message)),
        }
    }

    fn emit(&self, state: SubmissionState) {
        if self.updates.send(state).is_err() {
            debug!(key = %self.key, "Handle dropped, snapshot discarded");
        }
    }
}

/// Observer for one submission.
///
/// Yields every snapshot in order, ending with exactly one terminal
/// (`Succeeded` or `Failed`) snapshot. Dropping the handle does not cancel
/// the submission.
pub struct SubmissionHandle {
    key: IdempotencyKey,
    token: String,
    request: SubmissionRequest,
    receiver: UnboundedReceiver<SubmissionState>,
    task: Option<JoinHandle<SubmissionState>>,
    attempt: u32,
    finished: bool,
}

impl SubmissionHandle {
    /// The idempotency key every attempt is sent with.
    pub const fn key(&self) -> &IdempotencyKey {
        &self.key
    }

    /// The dedupe token held while this submission is in flight.
    pub fn token(&self) -> &str {
        &self.token
    }

    pub const fn request(&self) -> &SubmissionRequest {
        &self.request
    }

    /// Next snapshot, or `None` once the terminal snapshot has been yielded.
    pub async fn next(&mut self) -> Option<SubmissionState> {
        std::future::poll_fn(|cx| Pin::new(&mut *self).poll_next(cx)).await
    }

    /// Drain the submission and return its terminal snapshot.
    pub async fn wait(mut self) -> SubmissionState {
        let mut last = SubmissionState::in_flight(self.request.clone(), 0, None);
        while let Some(state) = self.next().await {
            last = state;
        }
        last
    }

    /// Terminal snapshot for a task that ended without sending one.
    fn interrupted(
        &self,
        joined: std::result::Result<SubmissionState, JoinError>,
    ) -> SubmissionState {
        match joined {
            Ok(state) if state.is_terminal() => state,
            Ok(_) => self.failed_with("task ended before a terminal state"),
            Err(err) if err.is_panic() => self.failed_with("task panicked"),
            Err(_) => self.failed_with("task was cancelled"),
        }
    }

    fn failed_with(&self, reason: &str) -> SubmissionState {
        let err = Error::interrupted(reason);
        error!(key = %self.key, error = %err, "Submission interrupted");
        SubmissionState::failed(self.request.clone(), self.attempt, err.to_string())
    }
}

impl Stream for SubmissionHandle {
    type Item = SubmissionState;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        match ready!(this.receiver.poll_recv(cx)) {
            Some(state) => {
                this.attempt = state.attempt;
                if state.is_terminal() {
                    this.finished = true;
                }
                Poll::Ready(Some(state))
            }
            None => {
                let Some(task) = this.task.as_mut() else {
                    this.finished = true;
                    return Poll::Ready(None);
                };
                let joined = ready!(Pin::new(task).poll(cx));
                this.task = None;
                this.finished = true;
                Poll::Ready(Some(this.interrupted(joined)))
            }
        }
    }
}
