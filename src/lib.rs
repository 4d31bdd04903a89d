#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! # Tally
//!
//! Records identity + amount facts at most once against an unreliable
//! endpoint, retrying transient failures on a fixed delay.
//!
//! This library re-exports the workspace crates for convenience.

pub use tally_coordinator;
pub use tally_core;
pub use tally_endpoint;

pub mod cli;
pub mod commands;
