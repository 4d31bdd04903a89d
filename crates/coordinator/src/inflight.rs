//! Set of in-flight dedupe tokens.
//!
//! The only shared mutable state the coordinator touches. A token is held by
//! an [`InFlightGuard`] and cleared when the guard is released or dropped, so
//! an aborted or panicking submission can never lock out its pair.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use itertools::Itertools;

/// Concurrency-safe set of active tokens.
#[derive(Clone, Default)]
pub struct InFlightTokens {
    tokens: Arc<Mutex<HashSet<String>>>,
}

impl InFlightTokens {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `token` in flight, or return `None` if it already is.
    pub fn try_acquire(&self, token: &str) -> Option<InFlightGuard> {
        let inserted = self.lock().insert(token.to_string());
        inserted.then(|| InFlightGuard {
            tokens: Arc::clone(&self.tokens),
            token: Some(token.to_string()),
        })
    }

    /// Check if `token` is in flight.
    pub fn contains(&self, token: &str) -> bool {
        self.lock().contains(token)
    }

    /// Active tokens, sorted.
    pub fn snapshot(&self) -> Vec<String> {
        self.lock().iter().cloned().sorted().collect_vec()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.tokens.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Ownership of one in-flight token.
#[must_use = "dropping the guard releases the token immediately"]
pub struct InFlightGuard {
    tokens: Arc<Mutex<HashSet<String>>>,
    token: Option<String>,
}

impl InFlightGuard {
    /// The held token.
    pub fn token(&self) -> &str {
        self.token.as_deref().unwrap_or_default()
    }

    /// Clear the token now.
    pub fn release(mut self) {
        self.clear();
    }

    fn clear(&mut self) {
        if let Some(token) = self.token.take() {
            self.tokens
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&token);
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.clear();
    }
}
