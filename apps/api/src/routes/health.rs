use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns a simple status object with service version and active backends.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "resumatch-api",
        "strategy": state.engine.default_strategy(),
        "embedding": state.engine.embedder_name(),
        "vector_store": state.engine.store_name(),
        "feedback_enabled": state.llm.is_some(),
    }))
}
