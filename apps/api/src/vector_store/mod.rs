//! Ephemeral Vector Store Client: writes per-request vectors into a shared
//! index, queries them back with a metadata filter, and deletes them.
//!
//! The index is shared by every in-flight request and offers no isolation of
//! its own. Requests stay apart only because every record and every query
//! filter carry the request's correlation token.
//!
//! Backends:
//! - `PineconeStore`: hosted index over REST, eventually consistent.
//! - `InMemoryVectorStore`: process-local, optional simulated indexing lag.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::embedding::Embedding;

pub mod memory;
pub mod pinecone;

pub use memory::InMemoryVectorStore;
pub use pinecone::PineconeStore;

pub const META_TYPE: &str = "type";
pub const META_CORRELATION: &str = "correlation_id";
pub const META_TIMESTAMP: &str = "timestamp";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("invalid store configuration: {0}")]
    Config(String),
}

/// What a stored vector represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Resume,
    JobDescription,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Resume => "resume",
            RecordKind::JobDescription => "job_description",
        }
    }

    fn id_prefix(&self) -> &'static str {
        match self {
            RecordKind::Resume => "resume",
            RecordKind::JobDescription => "jd",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Embedding,
    pub metadata: Map<String, Value>,
}

impl VectorRecord {
    /// Builds a record scoped to one request: `id = "{kind}-{token}"`,
    /// metadata `{type, correlation_id, timestamp}`.
    pub fn ephemeral(kind: RecordKind, correlation_id: &str, values: Embedding) -> Self {
        let mut metadata = Map::new();
        metadata.insert(META_TYPE.into(), Value::from(kind.as_str()));
        metadata.insert(META_CORRELATION.into(), Value::from(correlation_id));
        metadata.insert(
            META_TIMESTAMP.into(),
            Value::from(chrono::Utc::now().timestamp_millis()),
        );
        Self {
            id: ephemeral_id(kind, correlation_id),
            values,
            metadata,
        }
    }
}

pub fn ephemeral_id(kind: RecordKind, correlation_id: &str) -> String {
    format!("{}-{}", kind.id_prefix(), correlation_id)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryMatch {
    pub id: String,
    pub score: f32,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

/// Conjunction of metadata equalities.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataFilter {
    conditions: BTreeMap<String, Value>,
}

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.insert(field.into(), value.into());
        self
    }

    /// Filter for one request's vectors of a given kind.
    pub fn scoped(kind: RecordKind, correlation_id: &str) -> Self {
        Self::new()
            .eq(META_TYPE, kind.as_str())
            .eq(META_CORRELATION, correlation_id)
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn matches(&self, metadata: &Map<String, Value>) -> bool {
        self.conditions
            .iter()
            .all(|(field, value)| metadata.get(field) == Some(value))
    }

    /// Pinecone filter syntax: `{"field": {"$eq": value}, ...}`.
    pub fn to_pinecone(&self) -> Value {
        let map: Map<String, Value> = self
            .conditions
            .iter()
            .map(|(field, value)| (field.clone(), serde_json::json!({ "$eq": value })))
            .collect();
        Value::Object(map)
    }
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Idempotent on `record.id`.
    async fn upsert(&self, record: &VectorRecord) -> Result<(), StoreError>;

    /// Nearest neighbours by cosine, best first, restricted to `filter`.
    /// Empty when nothing matching has been indexed yet.
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<QueryMatch>, StoreError>;

    /// Best-effort removal. Unknown ids are not an error.
    async fn delete(&self, ids: &[String]) -> Result<(), StoreError>;

    fn name(&self) -> &str;
}
