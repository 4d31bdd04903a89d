//! Caller-visible submission snapshots.
//!
//! Every transition produces a fresh immutable [`SubmissionState`]; nothing is
//! mutated in place after it has been handed to the caller.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tally_core::{SubmissionRecord, SubmissionRequest};

/// Internal phase of a submission.
///
/// `Pending` and `Retrying` are the same in-flight state; they differ only in
/// the attempt counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionPhase {
    InFlight,
    Succeeded,
    Failed,
}

/// Status exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Retrying,
    Succeeded,
    Failed,
}

impl SubmissionStatus {
    /// Project an internal phase onto the status callers see.
    pub const fn project(phase: SubmissionPhase, attempt: u32) -> Self {
        match phase {
            SubmissionPhase::InFlight if attempt == 0 => Self::Pending,
            SubmissionPhase::InFlight => Self::Retrying,
            SubmissionPhase::Succeeded => Self::Succeeded,
            SubmissionPhase::Failed => Self::Failed,
        }
    }

    /// Check if no further automatic transition can occur.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Retrying => "retrying",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// One snapshot of a logical submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionState {
    pub request: SubmissionRequest,
    pub phase: SubmissionPhase,
    /// Caller-visible projection of `phase` and `attempt`.
    pub status: SubmissionStatus,
    /// Retries consumed so far (0 on the first attempt).
    pub attempt: u32,
    /// Last failure detail, if any.
    pub detail: Option<String>,
    /// The recorded fact, on success.
    pub record: Option<SubmissionRecord>,
    pub at: DateTime<Utc>,
}

impl SubmissionState {
    /// In flight on `attempt`, optionally carrying the failure that caused it.
    pub fn in_flight(request: SubmissionRequest, attempt: u32, detail: Option<String>) -> Self {
        Self {
            request,
            phase: SubmissionPhase::InFlight,
            status: SubmissionStatus::project(SubmissionPhase::InFlight, attempt),
            attempt,
            detail,
            record: None,
            at: Utc::now(),
        }
    }

    /// Recorded after `attempt` retries.
    pub fn succeeded(request: SubmissionRequest, attempt: u32, record: SubmissionRecord) -> Self {
        Self {
            request,
            phase: SubmissionPhase::Succeeded,
            status: SubmissionStatus::project(SubmissionPhase::Succeeded, attempt),
            attempt,
            detail: None,
            record: Some(record),
            at: Utc::now(),
        }
    }

    /// Gave up after `attempt` retries.
    pub fn failed(request: SubmissionRequest, attempt: u32, detail: impl Into<String>) -> Self {
        Self {
            request,
            phase: SubmissionPhase::Failed,
            status: SubmissionStatus::project(SubmissionPhase::Failed, attempt),
            attempt,
            detail: Some(detail.into()),
            record: None,
            at: Utc::now(),
        }
    }

    /// Caller-visible status.
    pub const fn status(&self) -> SubmissionStatus {
        self.status
    }

    pub const fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }
}

impl fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} (attempt {})",
            self.status(),
            self.request.identity(),
            self.request.amount(),
            self.attempt
        )?;
        if let Some(record) = &self.record {
            write!(f, " record={}", record.id)?;
        }
        if let Some(detail) = &self.detail {
            write!(f, ": {detail}")?;
        }
        Ok(())
    }
}
