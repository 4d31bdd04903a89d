//! Core types, idempotency keys, errors, and configuration for Tally.
//!
//! Tally records a fact (an identity + amount pair) against an unreliable
//! endpoint at most once, retrying transient failures. This crate holds the
//! pieces every other crate shares:
//!
//! - **Data model** ([`types`]): validated requests and committed records.
//! - **Key derivation** ([`idempotent`]): second-bucketed idempotency keys.
//! - **Errors** ([`error`]): validation and configuration failures.
//! - **Configuration** ([`config`]): TOML-backed retry budget and endpoint
//!   failure distribution.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod config;
pub mod error;
pub mod idempotent;
pub mod types;

pub use config::{CoordinatorConfig, EndpointConfig, MAX_RETRIES, RETRY_DELAY, TallyConfig};
pub use error::{Error, Result, ValidationError};
pub use idempotent::{IdempotencyKey, derive, derive_at};
pub use types::{Amount, Identity, RecordId, SubmissionRecord, SubmissionRequest, TerminalStatus};
