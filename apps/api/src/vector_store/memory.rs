use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::time::Instant;

use super::{MetadataFilter, QueryMatch, StoreError, VectorRecord, VectorStore};
use crate::embedding::cosine_similarity;

struct StoredRecord {
    record: VectorRecord,
    visible_at: Instant,
}

/// Process-local vector index with cosine scoring.
///
/// `with_indexing_lag` makes fresh writes invisible to queries for a while,
/// the same read-after-write gap a hosted index shows.
#[derive(Default)]
pub struct InMemoryVectorStore {
    records: RwLock<HashMap<String, StoredRecord>>,
    indexing_lag: Duration,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_indexing_lag(lag: Duration) -> Self {
        Self {
            records: RwLock::default(),
            indexing_lag: lag,
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, record: &VectorRecord) -> Result<(), StoreError> {
        let stored = StoredRecord {
            record: record.clone(),
            visible_at: Instant::now() + self.indexing_lag,
        };
        self.records.write().insert(record.id.clone(), stored);
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<QueryMatch>, StoreError> {
        let now = Instant::now();
        let mut matches: Vec<QueryMatch> = self
            .records
            .read()
            .values()
            .filter(|s| s.visible_at <= now && filter.matches(&s.record.metadata))
            .map(|s| QueryMatch {
                id: s.record.id.clone(),
                score: cosine_similarity(vector, &s.record.values),
                metadata: Some(s.record.metadata.clone()),
            })
            .collect();

        matches.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn delete(&self, ids: &[String]) -> Result<(), StoreError> {
        let mut records = self.records.write();
        for id in ids {
            records.remove(id);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
