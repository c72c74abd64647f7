//! Hosted embedding backend: Pinecone Inference (`POST /embed`).
//!
//! One request per text, no retries. Dimensionality is validated here and
//! again by the similarity engine against the configured constant.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{l2_normalize, validate_dimension, Embedding, EmbeddingError, EmbeddingProvider};

const PINECONE_EMBED_URL: &str = "https://api.pinecone.io/embed";
pub const PINECONE_API_VERSION: &str = "2025-01";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    parameters: EmbedParameters<'a>,
    inputs: Vec<EmbedInput<'a>>,
}

#[derive(Debug, Serialize)]
struct EmbedParameters<'a> {
    input_type: &'a str,
    truncate: &'a str,
}

#[derive(Debug, Serialize)]
struct EmbedInput<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    data: Vec<EmbedData>,
}

#[derive(Debug, Deserialize)]
struct EmbedData {
    #[serde(default)]
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct PineconeErrorBody {
    error: PineconeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct PineconeErrorDetail {
    message: String,
}

#[derive(Clone)]
pub struct HostedEmbedder {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
    dimension: usize,
}

impl HostedEmbedder {
    pub fn new(api_key: String, model: String, dimension: usize) -> Result<Self, EmbeddingError> {
        Self::with_endpoint(api_key, model, dimension, PINECONE_EMBED_URL.to_string())
    }

    pub fn with_endpoint(
        api_key: String,
        model: String,
        dimension: usize,
        endpoint: String,
    ) -> Result<Self, EmbeddingError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model,
            dimension,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for HostedEmbedder {
    async fn embed(&self, text: &str, normalize: bool) -> Result<Embedding, EmbeddingError> {
        let body = EmbedRequest {
            model: &self.model,
            parameters: EmbedParameters {
                input_type: "passage",
                truncate: "END",
            },
            inputs: vec![EmbedInput { text }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", PINECONE_API_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<PineconeErrorBody>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(EmbeddingError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let payload: EmbedResponse = response.json().await?;
        let mut values = payload
            .data
            .into_iter()
            .next()
            .map(|d| d.values)
            .filter(|v| !v.is_empty())
            .ok_or(EmbeddingError::EmptyResponse)?;

        validate_dimension(&values, self.dimension)?;
        debug!(model = %self.model, dims = values.len(), "hosted embedding received");

        if normalize {
            l2_normalize(&mut values);
        }
        Ok(values)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        &self.model
    }
}
