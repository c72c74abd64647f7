//! Read-after-write guard for eventually consistent indexes.
//!
//! A fixed sleep after upsert says nothing about whether the write is
//! visible. Instead: sleep `settle_delay`, query, and while the query comes
//! back empty keep polling with doubling intervals until `max_wait` (measured
//! from the first sleep) runs out. `max_wait <= settle_delay` degenerates to
//! exactly one query after the settle delay.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::vector_store::{MetadataFilter, QueryMatch, StoreError, VectorStore};

const MAX_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsistencyPolicy {
    pub settle_delay: Duration,
    pub max_wait: Duration,
    pub poll_interval: Duration,
}

impl Default for ConsistencyPolicy {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(1),
            max_wait: Duration::from_secs(5),
            poll_interval: Duration::from_millis(250),
        }
    }
}

impl ConsistencyPolicy {
    /// One query after a fixed delay, no polling.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            settle_delay: delay,
            max_wait: delay,
            poll_interval: delay,
        }
    }

    /// Queries until a match shows up or the budget is spent.
    /// Returns the last (possibly empty) result; store errors end the wait.
    pub async fn query_until_visible(
        &self,
        store: &dyn VectorStore,
        vector: &[f32],
        top_k: usize,
        filter: &MetadataFilter,
    ) -> Result<(Vec<QueryMatch>, u32), StoreError> {
        let started = Instant::now();
        tokio::time::sleep(self.settle_delay).await;

        let mut interval = self.poll_interval.max(Duration::from_millis(1));
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let matches = store.query(vector, top_k, filter).await?;
            if !matches.is_empty() {
                return Ok((matches, attempts));
            }

            let remaining = self.max_wait.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                return Ok((matches, attempts));
            }
            let pause = interval.min(remaining);
            debug!(attempts, pause_ms = pause.as_millis() as u64, "no match yet, polling again");
            tokio::time::sleep(pause).await;
            interval = (interval * 2).min(MAX_POLL_INTERVAL);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::{InMemoryVectorStore, RecordKind, VectorRecord};

    async fn seeded(lag: Duration) -> InMemoryVectorStore {
        let store = InMemoryVectorStore::with_indexing_lag(lag);
        store
            .upsert(&VectorRecord::ephemeral(RecordKind::JobDescription, "t", vec![1.0]))
            .await
            .unwrap();
        store
    }

    #[tokio::test(start_paused = true)]
    async fn test_visible_after_settle_needs_one_query() {
        let store = seeded(Duration::from_millis(200)).await;
        let policy = ConsistencyPolicy::default();
        let filter = MetadataFilter::scoped(RecordKind::JobDescription, "t");

        let (matches, attempts) = policy
            .query_until_visible(&store, &[1.0], 1, &filter)
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_lagging_write_appears() {
        let store = seeded(Duration::from_millis(2500)).await;
        let policy = ConsistencyPolicy::default();
        let filter = MetadataFilter::scoped(RecordKind::JobDescription, "t");

        let (matches, attempts) = policy
            .query_until_visible(&store, &[1.0], 1, &filter)
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert!(attempts > 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_budget() {
        let store = seeded(Duration::from_secs(60)).await;
        let policy = ConsistencyPolicy::default();
        let filter = MetadataFilter::scoped(RecordKind::JobDescription, "t");

        let started = Instant::now();
        let (matches, _) = policy
            .query_until_visible(&store, &[1.0], 1, &filter)
            .await
            .unwrap();
        assert!(matches.is_empty());
        let waited = started.elapsed();
        assert!(waited >= policy.max_wait);
        assert!(waited < policy.max_wait + Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_policy_queries_once() {
        let store = seeded(Duration::from_secs(2)).await;
        let policy = ConsistencyPolicy::fixed(Duration::from_secs(1));
        let filter = MetadataFilter::scoped(RecordKind::JobDescription, "t");

        let (matches, attempts) = policy
            .query_until_visible(&store, &[1.0], 1, &filter)
            .await
            .unwrap();
        assert!(matches.is_empty());
        assert_eq!(attempts, 1);
    }
}
