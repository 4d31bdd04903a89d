//! Idempotency store and simulated flaky endpoint.
//!
//! The endpoint is the first-class idempotency boundary: a call whose key is
//! already in the [`IdempotencyStore`] short-circuits to the cached record.
//! Otherwise the [`SimulatedEndpoint`] draws one [`Decision`] (immediate
//! success, 503, delayed success, or a raised fault). Only successes are
//! committed, so retries of a failed call stay meaningful.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tally_endpoint::{InMemoryIdempotencyStore, RandomDecider, SimulatedEndpoint};
//!
//! let store = Arc::new(InMemoryIdempotencyStore::new());
//! let decider = Arc::new(RandomDecider::new(config.endpoint.clone())?);
//! let endpoint = SimulatedEndpoint::new(store, decider);
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod decider;
pub mod endpoint;
pub mod error;
pub mod store;

pub use decider::{Decider, Decision, RandomDecider, ScriptedDecider};
pub use endpoint::{Endpoint, FnEndpoint, Outcome, SimulatedEndpoint, TEMPORARY_FAILURE_MESSAGE};
pub use error::{EndpointFault, StoreError};
pub use store::{CommitOutcome, IdempotencyStore, InMemoryIdempotencyStore};
