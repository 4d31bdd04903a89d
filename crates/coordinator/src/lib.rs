//! Submission coordinator.
//!
//! Accepts a logical "record this fact" request and drives it to exactly one
//! terminal state against an unreliable [`tally_endpoint::Endpoint`]:
//!
//! - a second submission of the same identity + amount pair is rejected with
//!   [`Error::AlreadyInProgress`] while the first is in flight
//! - transient failures are retried on a fixed delay up to the budget
//! - every attempt reuses one idempotency key, so the endpoint records the
//!   fact at most once
//!
//! Progress is observed through a [`SubmissionHandle`], a stream of immutable
//! [`SubmissionState`] snapshots.
//!
//! # Example
//!
//! ```ignore
//! let coordinator = SubmissionCoordinator::new(endpoint);
//! let mut handle = coordinator.submit(SubmissionRequest::new("a@x.com", "50")?)?;
//! while let Some(state) = handle.next().await {
//!     println!("{state}");
//! }
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod coordinator;
pub mod error;
pub mod inflight;
pub mod state;

pub use coordinator::{Clock, SubmissionCoordinator, SubmissionHandle};
pub use error::{Error, Result};
pub use inflight::{InFlightGuard, InFlightTokens};
pub use state::{SubmissionPhase, SubmissionState, SubmissionStatus};
