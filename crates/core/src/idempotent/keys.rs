//! Second-bucketed idempotency keys.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::Identity;

/// Width of the window a key buckets submit times into.
pub const KEY_WINDOW_MILLIS: i64 = 1_000;

/// Stable key shared by a logical request and all of its retries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub struct IdempotencyKey {
    identity: Identity,
    window_start_millis: i64,
}

impl IdempotencyKey {
    /// The identity this key was derived from.
    pub const fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Start of the one-second window, in Unix milliseconds.
    pub const fn window_start_millis(&self) -> i64 {
        self.window_start_millis
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.identity, self.window_start_millis)
    }
}

impl From<IdempotencyKey> for String {
    fn from(value: IdempotencyKey) -> Self {
        value.to_string()
    }
}

/// Derive the idempotency key for `identity` submitted at `timestamp_millis`.
///
/// Pure and deterministic. Pre-epoch timestamps floor towards negative
/// infinity, so every window is exactly [`KEY_WINDOW_MILLIS`] wide.
#[must_use]
pub fn derive(identity: &Identity, timestamp_millis: i64) -> IdempotencyKey {
    IdempotencyKey {
        identity: identity.clone(),
        window_start_millis: timestamp_millis
            .div_euclid(KEY_WINDOW_MILLIS)
            .saturating_mul(KEY_WINDOW_MILLIS),
    }
}

/// Derive the idempotency key for `identity` submitted at `at`.
#[must_use]
pub fn derive_at(identity: &Identity, at: DateTime<Utc>) -> IdempotencyKey {
    derive(identity, at.timestamp_millis())
}
