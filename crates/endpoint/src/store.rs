//! Idempotency store: remembers the terminal outcome of every key it has seen.

use std::collections::HashMap;

use async_trait::async_trait;
use tally_core::{IdempotencyKey, SubmissionRecord};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{Result, StoreError};

/// Result of committing a record under a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The record was stored; the key had no prior record.
    Committed(SubmissionRecord),
    /// The key already held a record, which was kept untouched.
    AlreadyCommitted(SubmissionRecord),
}

impl CommitOutcome {
    /// The record now stored under the key, whichever writer won.
    pub fn into_record(self) -> SubmissionRecord {
        match self {
            Self::Committed(record) | Self::AlreadyCommitted(record) => record,
        }
    }

    pub const fn is_fresh(&self) -> bool {
        matches!(self, Self::Committed(_))
    }
}

/// Keyed record cache backing the endpoint's idempotency guarantee.
///
/// Implementations must make `commit` an atomic insert-if-absent: two
/// concurrent first-time commits for one key leave exactly one record, and an
/// existing record is never overwritten.
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    /// Look up the record committed under `key`.
    async fn lookup(&self, key: &IdempotencyKey) -> Result<Option<SubmissionRecord>>;

    /// Commit `record` under `key` unless a record already exists.
    ///
    /// Only successful records are accepted.
    async fn commit(&self, key: IdempotencyKey, record: SubmissionRecord)
    -> Result<CommitOutcome>;

    /// All committed records, oldest first.
    async fn records(&self) -> Result<Vec<SubmissionRecord>>;

    /// Number of committed records.
    async fn len(&self) -> Result<usize>;

    /// Whether no record has been committed.
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}

#[derive(Default)]
struct Entries {
    by_key: HashMap<IdempotencyKey, SubmissionRecord>,
    order: Vec<IdempotencyKey>,
}

/// Process-lifetime store. Nothing survives a restart.
#[derive(Default)]
pub struct InMemoryIdempotencyStore {
    entries: RwLock<Entries>,
}

impl InMemoryIdempotencyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdempotencyStore for InMemoryIdempotencyStore {
    async fn lookup(&self, key: &IdempotencyKey) -> Result<Option<SubmissionRecord>> {
        Ok(self.entries.read().await.by_key.get(key).cloned())
    }

    async fn commit(
        &self,
        key: IdempotencyKey,
        record: SubmissionRecord,
    ) -> Result<CommitOutcome> {
        if !record.is_success() {
            return Err(StoreError::not_cacheable(key.to_string(), record.status.to_string()));
        }

        let mut entries = self.entries.write().await;
        if let Some(existing) = entries.by_key.get(&key) {
            debug!(
                key = %key,
                record_id = %existing.id,
                "Key already committed, keeping first record"
            );
            return Ok(CommitOutcome::AlreadyCommitted(existing.clone()));
        }

        debug!(key = %key, record_id = %record.id, "Committing record");
        entries.order.push(key.clone());
        entries.by_key.insert(key, record.clone());
        Ok(CommitOutcome::Committed(record))
    }

    async fn records(&self) -> Result<Vec<SubmissionRecord>> {
        let entries = self.entries.read().await;
        Ok(entries
            .order
            .iter()
            .filter_map(|key| entries.by_key.get(key).cloned())
            .collect())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.entries.read().await.by_key.len())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use chrono::Utc;
    use tally_core::{SubmissionRequest, derive};

    fn request(identity: &str) -> SubmissionRequest {
        SubmissionRequest::new(identity, "50").unwrap()
    }

    #[tokio::test]
    async fn test_lookup_miss() {
        let store = InMemoryIdempotencyStore::new();
        let key = derive(request("a@x.com").identity(), 1_000);
        assert_eq!(store.lookup(&key).await.unwrap(), None);
        assert!(store.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_commit_then_lookup() {
        let store = InMemoryIdempotencyStore::new();
        let req = request("a@x.com");
        let key = derive(req.identity(), 1_000);
        let record = SubmissionRecord::success(&req, Utc::now());

        let outcome = store.commit(key.clone(), record.clone()).await.unwrap();
        assert!(outcome.is_fresh());
        assert_eq!(store.lookup(&key).await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn test_commit_never_overwrites() {
        let store = InMemoryIdempotencyStore::new();
        let req = request("a@x.com");
        let key = derive(req.identity(), 1_000);
        let first = SubmissionRecord::success(&req, Utc::now());
        let second = SubmissionRecord::success(&req, Utc::now());

        store.commit(key.clone(), first.clone()).await.unwrap();
        let outcome = store.commit(key.clone(), second).await.unwrap();

        assert_eq!(outcome, CommitOutcome::AlreadyCommitted(first.clone()));
        assert_eq!(store.lookup(&key).await.unwrap(), Some(first));
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_error_records_rejected() {
        let store = InMemoryIdempotencyStore::new();
        let req = request("a@x.com");
        let key = derive(req.identity(), 1_000);
        let record = SubmissionRecord::error(&req, Utc::now(), "503");

        let result = store.commit(key.clone(), record).await;
        assert!(matches!(result, Err(StoreError::NotCacheable { .. })));
        assert_eq!(store.lookup(&key).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_records_in_commit_order() {
        let store = InMemoryIdempotencyStore::new();
        for (i, identity) in ["c@x.com", "a@x.com", "b@x.com"].iter().enumerate() {
            let req = request(identity);
            let key = derive(req.identity(), i64::try_from(i).unwrap() * 1_000);
            store
                .commit(key, SubmissionRecord::success(&req, Utc::now()))
                .await
                .unwrap();
        }

        let identities: Vec<String> = store
            .records()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.identity.to_string())
            .collect();
        assert_eq!(identities, vec!["c@x.com", "a@x.com", "b@x.com"]);
    }
}
