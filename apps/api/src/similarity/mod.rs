//! Similarity Engine: normalizer → embedding provider → (vector store) → score.
//!
//! Two strategies:
//! - `Direct`: cosine of the two embeddings, computed in-process.
//! - `Indexed`: both vectors are written to the shared index under a fresh
//!   correlation token, the résumé vector is queried against the
//!   job-description tag, and both records are deleted whatever happened.
//!
//! `AppState` holds one engine, built at startup. It is cheap to clone
//! (everything behind `Arc`), which is how the indexed sequence moves onto its
//! own task.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn, Instrument};
use uuid::Uuid;

use crate::embedding::{cosine_similarity, validate_dimension, Embedding, EmbeddingProvider};
use crate::errors::AppError;
use crate::text::{normalize, StopWords};
use crate::vector_store::{MetadataFilter, RecordKind, VectorRecord, VectorStore};

pub mod consistency;

pub use consistency::ConsistencyPolicy;

pub const NO_MATCH_WARNING: &str =
    "No matching job-description vector was found in the index; similarity defaulted to 0.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityStrategy {
    Direct,
    Indexed,
}

/// Outcome of one comparison. Never stored.
#[derive(Debug, Clone, Serialize)]
pub struct SimilarityResult {
    /// Percentage in [0, 100], two decimals.
    #[serde(rename = "similarity")]
    pub score: f64,
    pub resume_text: String,
    pub job_description: String,
    /// Set when the index returned no match and the score fell back to 0.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Clone)]
pub struct SimilarityEngine {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Option<Arc<dyn VectorStore>>,
    stop_words: Arc<StopWords>,
    dimension: usize,
    consistency: ConsistencyPolicy,
    default_strategy: SimilarityStrategy,
}

impl SimilarityEngine {
    /// Direct-only engine. `dimension` is the size every embedding must have.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, stop_words: StopWords, dimension: usize) -> Self {
        Self {
            embedder,
            store: None,
            stop_words: Arc::new(stop_words),
            dimension,
            consistency: ConsistencyPolicy::default(),
            default_strategy: SimilarityStrategy::Direct,
        }
    }

    /// Enables the indexed strategy and makes it the default.
    pub fn with_store(mut self, store: Arc<dyn VectorStore>, consistency: ConsistencyPolicy) -> Self {
        self.store = Some(store);
        self.consistency = consistency;
        self.default_strategy = SimilarityStrategy::Indexed;
        self
    }

    pub fn with_default_strategy(mut self, strategy: SimilarityStrategy) -> Self {
        self.default_strategy = strategy;
        self
    }

    pub fn default_strategy(&self) -> SimilarityStrategy {
        self.default_strategy
    }

    pub fn embedder_name(&self) -> &str {
        self.embedder.name()
    }

    pub fn store_name(&self) -> Option<&str> {
        self.store.as_deref().map(|s| s.name())
    }

    pub async fn compare(
        &self,
        resume_text: &str,
        job_description: &str,
    ) -> Result<SimilarityResult, AppError> {
        self.compare_with(self.default_strategy, resume_text, job_description)
            .await
    }

    pub async fn compare_with(
        &self,
        strategy: SimilarityStrategy,
        resume_text: &str,
        job_description: &str,
    ) -> Result<SimilarityResult, AppError> {
        let resume_norm = self.prepare(resume_text, "resume")?;
        let jd_norm = self.prepare(job_description, "job_description")?;

        let (score, warning) = match strategy {
            SimilarityStrategy::Direct => (self.direct(&resume_norm, &jd_norm).await?, None),
            SimilarityStrategy::Indexed => {
                let store = self.store.clone().ok_or_else(|| {
                    AppError::NotConfigured("no vector store is configured".to_string())
                })?;
                // Once the first upsert is issued the sequence must reach cleanup,
                // so it runs on its own task and survives a dropped request.
                let engine = self.clone();
                let task = tokio::spawn(
                    async move { engine.indexed(store, resume_norm, jd_norm).await }
                        .in_current_span(),
                );
                match task.await {
                    Ok(result) => result?,
                    Err(e) => {
                        return Err(AppError::Internal(anyhow::anyhow!(
                            "indexed similarity task failed: {e}"
                        )))
                    }
                }
            }
        };

        Ok(SimilarityResult {
            score,
            resume_text: resume_text.to_string(),
            job_description: job_description.to_string(),
            warning,
        })
    }

    fn prepare(&self, text: &str, field: &str) -> Result<String, AppError> {
        let normalized = normalize(text, &self.stop_words);
        if normalized.is_empty() {
            return Err(AppError::Validation(format!(
                "{field} has no usable text after normalization"
            )));
        }
        Ok(normalized)
    }

    async fn embed_checked(&self, text: &str) -> Result<Embedding, AppError> {
        let embedding = self.embedder.embed(text, true).await?;
        validate_dimension(&embedding, self.dimension)?;
        Ok(embedding)
    }

    async fn direct(&self, resume: &str, jd: &str) -> Result<f64, AppError> {
        let (resume_vec, jd_vec) =
            tokio::try_join!(self.embed_checked(resume), self.embed_checked(jd))?;
        let score = to_percentage(cosine_similarity(&resume_vec, &jd_vec));
        info!(score, provider = self.embedder.name(), "direct similarity computed");
        Ok(score)
    }

    #[tracing::instrument(name = "indexed_similarity", skip_all, fields(store = store.name()))]
    async fn indexed(
        &self,
        store: Arc<dyn VectorStore>,
        resume: String,
        jd: String,
    ) -> Result<(f64, Option<String>), AppError> {
        let (resume_vec, jd_vec) =
            tokio::try_join!(self.embed_checked(&resume), self.embed_checked(&jd))?;

        let token = Uuid::new_v4().to_string();
        let jd_record = VectorRecord::ephemeral(RecordKind::JobDescription, &token, jd_vec);
        let resume_record = VectorRecord::ephemeral(RecordKind::Resume, &token, resume_vec);
        let ids = vec![jd_record.id.clone(), resume_record.id.clone()];

        let outcome = self
            .round_trip(store.as_ref(), &token, &jd_record, &resume_record)
            .await;

        // Runs on every path, including upsert and query failures.
        if let Err(e) = store.delete(&ids).await {
            warn!(correlation_id = %token, error = %e, "failed to delete ephemeral vectors");
        }

        match outcome? {
            Some(score) => {
                info!(correlation_id = %token, score, "indexed similarity computed");
                Ok((score, None))
            }
            None => {
                warn!(correlation_id = %token, "vector query returned no match");
                Ok((0.0, Some(NO_MATCH_WARNING.to_string())))
            }
        }
    }

    async fn round_trip(
        &self,
        store: &dyn VectorStore,
        token: &str,
        jd_record: &VectorRecord,
        resume_record: &VectorRecord,
    ) -> Result<Option<f64>, AppError> {
        tokio::try_join!(store.upsert(jd_record), store.upsert(resume_record))?;

        let filter = MetadataFilter::scoped(RecordKind::JobDescription, token);
        let (matches, attempts) = self
            .consistency
            .query_until_visible(store, &resume_record.values, 1, &filter)
            .await?;

        let score = matches
            .iter()
            .find(|m| m.id == jd_record.id)
            .map(|m| to_percentage(m.score));
        if score.is_some() && attempts > 1 {
            info!(correlation_id = %token, attempts, "match became visible after polling");
        }
        Ok(score)
    }
}

/// Cosine in [-1, 1] → percentage in [0, 100] rounded to two decimals.
pub fn to_percentage(cosine: f32) -> f64 {
    let pct = (f64::from(cosine) * 100.0).clamp(0.0, 100.0);
    (pct * 100.0).round() / 100.0
}
