mod analysis;
mod config;
mod embedding;
mod errors;
mod extraction;
mod feedback;
mod llm_client;
mod report;
mod routes;
mod similarity;
mod state;
mod text;
mod vector_store;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::{header, HeaderValue};
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, EmbeddingBackend, StoreBackend};
use crate::embedding::{EmbeddingProvider, HashingEmbedder, HostedEmbedder};
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::similarity::SimilarityEngine;
use crate::state::AppState;
use crate::text::StopWords;
use crate::vector_store::{InMemoryVectorStore, PineconeStore, VectorStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resumatch API v{}", env!("CARGO_PKG_VERSION"));

    // Embedding provider
    let embedder = build_embedder(&config)?;
    info!(
        "Embedding provider: {} ({} dims)",
        embedder.name(),
        embedder.dimension()
    );

    let stop_words = match &config.stop_words {
        Some(words) => StopWords::new(words),
        None => StopWords::english().clone(),
    };
    info!("Normalizer loaded {} stop words", stop_words.len());

    let mut engine = SimilarityEngine::new(embedder, stop_words, config.embedding_dimension);

    // Vector store (indexed strategy)
    let store = build_store(&config).await?;
    info!("Vector store: {}", store.name());
    engine = engine
        .with_store(store, config.consistency)
        .with_default_strategy(config.strategy);
    info!("Default similarity strategy: {:?}", config.strategy);

    // LLM client (feedback)
    let llm = match &config.anthropic_api_key {
        Some(key) => {
            let client = LlmClient::new(key.clone(), config.generation_model.clone())?;
            info!("LLM client initialized (model: {})", client.model());
            Some(client)
        }
        None => {
            warn!("ANTHROPIC_API_KEY not set; /feedback will answer 501");
            None
        }
    };

    let cors = build_cors(&config.cors_allowed_origins)?;

    let state = AppState {
        config: config.clone(),
        engine,
        llm,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_embedder(config: &Config) -> Result<Arc<dyn EmbeddingProvider>> {
    let embedder: Arc<dyn EmbeddingProvider> = match config.embedding_backend {
        EmbeddingBackend::Local => Arc::new(HashingEmbedder::new(config.embedding_dimension)),
        EmbeddingBackend::Hosted => {
            let pinecone = config
                .pinecone
                .as_ref()
                .context("hosted embeddings need Pinecone settings")?;
            Arc::new(HostedEmbedder::new(
                pinecone.api_key.clone(),
                config.embedding_model.clone(),
                config.embedding_dimension,
            )?)
        }
    };
    Ok(embedder)
}

async fn build_store(config: &Config) -> Result<Arc<dyn VectorStore>> {
    let store: Arc<dyn VectorStore> = match config.store_backend {
        StoreBackend::Memory => Arc::new(InMemoryVectorStore::new()),
        StoreBackend::Pinecone => {
            let pinecone = config
                .pinecone
                .as_ref()
                .context("VECTOR_STORE=pinecone needs Pinecone settings")?;
            let store = PineconeStore::connect(pinecone, config.embedding_dimension)
                .await
                .context("could not connect to the Pinecone index")?;
            Arc::new(store)
        }
    };
    Ok(store)
}

/// Credentialed CORS cannot use wildcards, so methods and headers mirror
/// the preflight request and origins come from an explicit list.
fn build_cors(origins: &[String]) -> Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|o| {
            HeaderValue::from_str(o).with_context(|| format!("invalid CORS origin '{o}'"))
        })
        .collect::<Result<Vec<_>>>()?;
    info!("CORS allow-list: {} origin(s)", origins.len());

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .expose_headers([header::CONTENT_DISPOSITION]))
}
