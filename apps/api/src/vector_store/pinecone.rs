//! Pinecone serverless index over REST.
//!
//! Data plane: `/vectors/upsert`, `/query`, `/vectors/delete` on the index host.
//! Control plane (`GET /indexes/{name}`) is used once at startup to resolve the
//! host and check the index dimension.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::{MetadataFilter, QueryMatch, StoreError, VectorRecord, VectorStore};
use crate::config::PineconeConfig;
use crate::embedding::hosted::PINECONE_API_VERSION;

const CONTROL_PLANE_URL: &str = "https://api.pinecone.io";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct IndexDescription {
    host: String,
    dimension: Option<usize>,
    #[serde(default)]
    metric: Option<String>,
}

/// Metrics whose scores rise with similarity and top out at 1 for
/// normalized vectors.
const SUPPORTED_METRICS: &[&str] = &["cosine", "dotproduct"];

impl IndexDescription {
    fn validate(&self, index_name: &str, expected_dimension: usize) -> Result<(), StoreError> {
        if let Some(dimension) = self.dimension {
            if dimension != expected_dimension {
                return Err(StoreError::Config(format!(
                    "index '{index_name}' has dimension {dimension}, embeddings have {expected_dimension}"
                )));
            }
        }
        match self.metric.as_deref() {
            Some(metric) if SUPPORTED_METRICS.contains(&metric) => Ok(()),
            Some(metric) => Err(StoreError::Config(format!(
                "index '{index_name}' uses metric '{metric}'; similarity needs cosine or dotproduct"
            ))),
            None => {
                warn!(index = index_name, "index metric not reported; assuming cosine");
                Ok(())
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: [&'a VectorRecord; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<Value>,
    include_metadata: bool,
    include_values: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Serialize)]
struct DeleteRequest<'a> {
    ids: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Clone)]
pub struct PineconeStore {
    client: Client,
    api_key: String,
    host: String,
    namespace: Option<String>,
}

impl PineconeStore {
    /// Builds a client for an index host directly (no control-plane lookup).
    pub fn new(api_key: String, host: &str, namespace: Option<String>) -> Result<Self, StoreError> {
        if api_key.trim().is_empty() {
            return Err(StoreError::Config("missing Pinecone API key".into()));
        }
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key,
            host: normalize_host(host),
            namespace,
        })
    }

    /// Resolves the index host if it was not configured, then checks the
    /// index dimension and metric against what the engine expects.
    ///
    /// With a configured host the describe call is still made for the
    /// checks; if the control plane is unreachable they are skipped with a
    /// warning (e.g. Pinecone Local has no control plane).
    pub async fn connect(config: &PineconeConfig, expected_dimension: usize) -> Result<Self, StoreError> {
        if let Some(host) = &config.index_host {
            info!(host = %host, "Using configured Pinecone index host");
            match Self::describe(config).await {
                Ok(description) => description.validate(&config.index_name, expected_dimension)?,
                Err(e) => warn!(
                    index = %config.index_name,
                    error = %e,
                    "could not describe index; dimension and metric checks skipped"
                ),
            }
            return Self::new(config.api_key.clone(), host, config.namespace.clone());
        }

        let description = Self::describe(config).await?;
        description.validate(&config.index_name, expected_dimension)?;
        info!(
            index = %config.index_name,
            host = %description.host,
            metric = description.metric.as_deref().unwrap_or("unknown"),
            "Resolved Pinecone index"
        );

        Self::new(config.api_key.clone(), &description.host, config.namespace.clone())
    }

    async fn describe(config: &PineconeConfig) -> Result<IndexDescription, StoreError> {
        let bootstrap = Self::new(config.api_key.clone(), CONTROL_PLANE_URL, None)?;
        let url = format!("{CONTROL_PLANE_URL}/indexes/{}", config.index_name);
        let response = bootstrap.authorized(bootstrap.client.get(url)).send().await?;
        Ok(check_status(response).await?.json().await?)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", PINECONE_API_VERSION)
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<Response, StoreError> {
        let response = self
            .authorized(self.client.post(format!("{}{path}", self.host)))
            .json(body)
            .send()
            .await?;
        check_status(response).await
    }
}

#[async_trait]
impl VectorStore for PineconeStore {
    async fn upsert(&self, record: &VectorRecord) -> Result<(), StoreError> {
        let body = UpsertRequest {
            vectors: [record],
            namespace: self.namespace.as_deref(),
        };
        self.post("/vectors/upsert", &body).await?;
        debug!(id = %record.id, "upserted vector");
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: &MetadataFilter,
    ) -> Result<Vec<QueryMatch>, StoreError> {
        let body = QueryRequest {
            vector,
            top_k,
            filter: (!filter.is_empty()).then(|| filter.to_pinecone()),
            include_metadata: true,
            include_values: false,
            namespace: self.namespace.as_deref(),
        };
        let response: QueryResponse = self.post("/query", &body).await?.json().await?;
        Ok(response.matches)
    }

    async fn delete(&self, ids: &[String]) -> Result<(), StoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        let body = DeleteRequest {
            ids,
            namespace: self.namespace.as_deref(),
        };
        self.post("/vectors/delete", &body).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "pinecone"
    }
}

fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

async fn check_status(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Map<String, Value>>(&body)
        .ok()
        .and_then(|m| {
            m.get("message")
                .or_else(|| m.get("error").and_then(|e| e.get("message")))
                .and_then(Value::as_str)
                .map(String::from)
        })
        .unwrap_or(body);
    Err(StoreError::Api {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_store::RecordKind;
    use serde_json::json;

    #[test]
    fn test_normalize_host_adds_scheme() {
        assert_eq!(
            normalize_host("idx-abc.svc.pinecone.io/"),
            "https://idx-abc.svc.pinecone.io"
        );
        assert_eq!(normalize_host("http://localhost:5080"), "http://localhost:5080");
    }

    #[test]
    fn test_upsert_body_shape() {
        let record = VectorRecord::ephemeral(RecordKind::Resume, "t", vec![0.5, 0.5]);
        let body = UpsertRequest {
            vectors: [&record],
            namespace: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["vectors"][0]["id"], "resume-t");
        assert_eq!(json["vectors"][0]["metadata"]["type"], "resume");
        assert!(json.get("namespace").is_none());
    }

    #[test]
    fn test_query_body_uses_camel_case() {
        let filter = MetadataFilter::scoped(RecordKind::JobDescription, "t");
        let body = QueryRequest {
            vector: &[1.0],
            top_k: 1,
            filter: Some(filter.to_pinecone()),
            include_metadata: true,
            include_values: false,
            namespace: Some("ns"),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["topK"], 1);
        assert_eq!(json["includeMetadata"], true);
        assert_eq!(json["filter"]["type"], json!({"$eq": "job_description"}));
        assert_eq!(json["namespace"], "ns");
    }

    #[test]
    fn test_query_response_parsing() {
        let raw = r#"{"matches":[{"id":"jd-t","score":0.83,"values":[],
            "metadata":{"type":"job_description","correlation_id":"t"}}],"namespace":""}"#;
        let parsed: QueryResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.matches.len(), 1);
        assert_eq!(parsed.matches[0].id, "jd-t");
        assert!((parsed.matches[0].score - 0.83).abs() < 1e-6);
    }

    #[test]
    fn test_empty_query_response_parsing() {
        let parsed: QueryResponse = serde_json::from_str(r#"{"namespace":""}"#).unwrap();
        assert!(parsed.matches.is_empty());
    }

    fn description(raw: &str) -> IndexDescription {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn test_index_description_parsing() {
        let d = description(
            r#"{"name":"resume-matcher","dimension":1024,"metric":"cosine",
                "host":"resume-matcher-abc.svc.pinecone.io","status":{"ready":true}}"#,
        );
        assert_eq!(d.host, "resume-matcher-abc.svc.pinecone.io");
        assert_eq!(d.dimension, Some(1024));
        assert!(d.validate("resume-matcher", 1024).is_ok());
    }

    #[test]
    fn test_validate_rejects_distance_metric() {
        let d = description(r#"{"host":"h","dimension":1024,"metric":"euclidean"}"#);
        let err = d.validate("idx", 1024).unwrap_err();
        assert!(matches!(err, StoreError::Config(ref m) if m.contains("euclidean")));
    }

    #[test]
    fn test_validate_accepts_dotproduct() {
        let d = description(r#"{"host":"h","dimension":8,"metric":"dotproduct"}"#);
        assert!(d.validate("idx", 8).is_ok());
    }

    #[test]
    fn test_validate_rejects_dimension_mismatch() {
        let d = description(r#"{"host":"h","dimension":384,"metric":"cosine"}"#);
        assert!(matches!(d.validate("idx", 1024), Err(StoreError::Config(_))));
    }

    #[test]
    fn test_new_rejects_blank_key() {
        assert!(matches!(
            PineconeStore::new("  ".into(), "host", None),
            Err(StoreError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_http_error() {
        let store = PineconeStore::new("key".into(), "http://127.0.0.1:9", None).unwrap();
        let err = store.delete(&["x".to_string()]).await.unwrap_err();
        assert!(matches!(err, StoreError::Http(_)));
    }
}
