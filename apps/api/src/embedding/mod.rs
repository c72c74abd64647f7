//! Embedding Provider: maps normalized text to a fixed-dimension dense vector.
//!
//! Two backends sit behind the `EmbeddingProvider` trait:
//! - `HashingEmbedder`: local, deterministic, no network.
//! - `HostedEmbedder`: Pinecone Inference over HTTPS.
//!
//! `AppState` holds an `Arc<dyn EmbeddingProvider>`, chosen at startup via
//! `EMBEDDING_PROVIDER`. Callers must run every vector through
//! `validate_dimension` before using it.

use async_trait::async_trait;
use thiserror::Error;

pub mod hosted;
pub mod local;

pub use hosted::HostedEmbedder;
pub use local::HashingEmbedder;

pub type Embedding = Vec<f32>;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("provider returned no embedding")]
    EmptyResponse,

    #[error("expected {expected} dimensions, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding task failed: {0}")]
    Task(String),
}

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds `text`. With `normalize`, the result has unit L2 norm
    /// (all-zero vectors stay zero).
    async fn embed(&self, text: &str, normalize: bool) -> Result<Embedding, EmbeddingError>;

    /// Number of components every embedding from this provider has.
    fn dimension(&self) -> usize;

    /// Backend label for logs and responses.
    fn name(&self) -> &str;
}

/// Fails fast when a provider returns a vector of the wrong size.
pub fn validate_dimension(embedding: &[f32], expected: usize) -> Result<(), EmbeddingError> {
    if embedding.len() != expected {
        return Err(EmbeddingError::DimensionMismatch {
            expected,
            actual: embedding.len(),
        });
    }
    Ok(())
}

pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Scales `v` to unit length in place. Zero vectors are left untouched.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = l2_norm(v);
    if norm > f32::EPSILON {
        let inv = 1.0 / norm;
        for x in v.iter_mut() {
            *x *= inv;
        }
    }
}

/// Cosine similarity in [-1, 1]. Returns 0.0 for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);
    if norm_a <= f32::EPSILON || norm_b <= f32::EPSILON {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}
