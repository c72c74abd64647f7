use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::similarity::SimilarityEngine;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Embedding provider and (optionally) the vector index behind it.
    pub engine: SimilarityEngine,
    /// `None` when no ANTHROPIC_API_KEY is set; feedback then answers 501.
    pub llm: Option<LlmClient>,
}
