use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::similarity::{ConsistencyPolicy, SimilarityStrategy};

const DEFAULT_HOSTED_MODEL: &str = "multilingual-e5-large";
const DEFAULT_LOCAL_DIMENSION: usize = 384;
const DEFAULT_HOSTED_DIMENSION: usize = 1024;
const DEFAULT_GENERATION_MODEL: &str = "claude-sonnet-4-5";
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://127.0.0.1:3000";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Which embedding backend the service builds at start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingBackend {
    Local,
    Hosted,
}

/// Which vector index the indexed strategy writes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Pinecone,
    Memory,
}

impl StoreBackend {
    /// Used when `VECTOR_STORE` is unset. A direct-strategy deployment only
    /// reaches the store through `/analyze/indexed`, so it gets the
    /// in-memory index and needs no Pinecone key unless embeddings are hosted.
    pub fn default_for(strategy: SimilarityStrategy) -> Self {
        match strategy {
            SimilarityStrategy::Indexed => StoreBackend::Pinecone,
            SimilarityStrategy::Direct => StoreBackend::Memory,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PineconeConfig {
    pub api_key: String,
    pub index_name: String,
    /// Data-plane host. Resolved through the control plane when not set.
    pub index_host: Option<String>,
    pub namespace: Option<String>,
}

/// Application configuration loaded from environment variables.
/// Fails at startup if a variable required by the selected backends is missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub strategy: SimilarityStrategy,
    pub embedding_backend: EmbeddingBackend,
    pub embedding_model: String,
    pub embedding_dimension: usize,
    pub store_backend: StoreBackend,
    pub pinecone: Option<PineconeConfig>,
    /// Comma-separated override for the normalizer's stop-word set.
    pub stop_words: Option<Vec<String>>,
    pub consistency: ConsistencyPolicy,
    pub anthropic_api_key: Option<String>,
    pub generation_model: String,
    pub cors_allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let strategy = match optional_env("SIMILARITY_STRATEGY").as_deref() {
            None | Some("indexed") => SimilarityStrategy::Indexed,
            Some("direct") => SimilarityStrategy::Direct,
            Some(other) => bail!("SIMILARITY_STRATEGY must be 'direct' or 'indexed', got '{other}'"),
        };

        let embedding_backend = match optional_env("EMBEDDING_PROVIDER").as_deref() {
            None | Some("hosted") => EmbeddingBackend::Hosted,
            Some("local") => EmbeddingBackend::Local,
            Some(other) => bail!("EMBEDDING_PROVIDER must be 'local' or 'hosted', got '{other}'"),
        };

        let store_backend = match optional_env("VECTOR_STORE").as_deref() {
            None => StoreBackend::default_for(strategy),
            Some("pinecone") => StoreBackend::Pinecone,
            Some("memory") => StoreBackend::Memory,
            Some(other) => bail!("VECTOR_STORE must be 'pinecone' or 'memory', got '{other}'"),
        };

        let default_dimension = match embedding_backend {
            EmbeddingBackend::Local => DEFAULT_LOCAL_DIMENSION,
            EmbeddingBackend::Hosted => DEFAULT_HOSTED_DIMENSION,
        };
        let embedding_dimension = parse_env("EMBEDDING_DIMENSION", default_dimension)?;
        if embedding_dimension == 0 {
            bail!("EMBEDDING_DIMENSION must be greater than zero");
        }

        // The hosted embedder and the Pinecone index share one API key.
        let needs_pinecone = embedding_backend == EmbeddingBackend::Hosted
            || store_backend == StoreBackend::Pinecone;
        let pinecone = if needs_pinecone {
            Some(PineconeConfig {
                api_key: require_env("PINECONE_API_KEY")?,
                index_name: optional_env("PINECONE_INDEX_NAME")
                    .unwrap_or_else(|| "resume-matcher".to_string()),
                index_host: optional_env("PINECONE_INDEX_HOST"),
                namespace: optional_env("PINECONE_NAMESPACE"),
            })
        } else {
            None
        };

        let consistency = ConsistencyPolicy {
            settle_delay: Duration::from_millis(parse_env("STORE_SETTLE_DELAY_MS", 1000)?),
            max_wait: Duration::from_millis(parse_env("STORE_CONSISTENCY_TIMEOUT_MS", 5000)?),
            poll_interval: Duration::from_millis(parse_env("STORE_POLL_INTERVAL_MS", 250)?),
        };

        Ok(Config {
            port: parse_env("PORT", 8000)?,
            rust_log: optional_env("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            strategy,
            embedding_backend,
            embedding_model: optional_env("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_HOSTED_MODEL.to_string()),
            embedding_dimension,
            store_backend,
            pinecone,
            stop_words: optional_env("STOP_WORDS").map(|raw| split_list(&raw)),
            consistency,
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            generation_model: optional_env("GENERATION_MODEL")
                .unwrap_or_else(|| DEFAULT_GENERATION_MODEL.to_string()),
            cors_allowed_origins: split_list(
                &optional_env("CORS_ALLOWED_ORIGINS")
                    .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string()),
            ),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
        })
    }
}

#[cfg(test)]
impl Config {
    /// Local embedder, in-memory store, no LLM.
    pub fn test_default() -> Self {
        Self {
            port: 0,
            rust_log: "debug".to_string(),
            strategy: SimilarityStrategy::Direct,
            embedding_backend: EmbeddingBackend::Local,
            embedding_model: DEFAULT_HOSTED_MODEL.to_string(),
            embedding_dimension: DEFAULT_LOCAL_DIMENSION,
            store_backend: StoreBackend::Memory,
            pinecone: None,
            stop_words: None,
            consistency: ConsistencyPolicy::fixed(Duration::ZERO),
            anthropic_api_key: None,
            generation_model: DEFAULT_GENERATION_MODEL.to_string(),
            cors_allowed_origins: split_list(DEFAULT_CORS_ORIGINS),
            max_upload_bytes: 1024 * 1024,
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

/// Splits a comma-separated list, dropping blanks.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
