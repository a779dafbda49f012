//! Embedding client abstraction and adapters.
//!
//! Storage and query embeddings must share one model identifier, otherwise
//! similarity scores are meaningless; the pipeline holds a single client and
//! routes both paths through it.

pub mod cache;

pub use cache::CachedEmbedder;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// Provider was unable to produce embeddings for the supplied input.
    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Model identifier this client embeds with; part of the cache key.
    fn model_id(&self) -> &str;

    /// Produce an embedding vector for each supplied chunk of text.
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError>;
}

/// Deterministic embedding client useful for offline runs and tests.
///
/// Hashes byte content into a fixed-dimension unit vector; identical input
/// always produces the identical vector.
pub struct HashingEmbeddingClient {
    model: String,
    dimension: usize,
}

impl HashingEmbeddingClient {
    /// Construct a deterministic client for the given model id and dimension.
    pub fn new(model: impl Into<String>, dimension: usize) -> Self {
        Self {
            model: model.into(),
            dimension,
        }
    }

    fn encode(text: &str, dimension: usize) -> Vec<f32> {
        let mut embedding = vec![0.0_f32; dimension];

        if text.is_empty() {
            return embedding;
        }

        for (idx, byte) in text.bytes().enumerate() {
            let position = idx % dimension;
            embedding[position] += f32::from(byte) / 255.0;
        }

        let norm = embedding
            .iter()
            .map(|value| value * value)
            .sum::<f32>()
            .sqrt();

        if norm > 0.0 {
            for value in &mut embedding {
                *value /= norm;
            }
        }

        embedding
    }
}

#[async_trait]
impl EmbeddingClient for HashingEmbeddingClient {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if self.dimension == 0 {
            return Err(EmbeddingClientError::GenerationFailed(
                "embedding dimension must be greater than zero".to_string(),
            ));
        }

        Ok(texts
            .into_iter()
            .map(|text| Self::encode(&text, self.dimension))
            .collect())
    }
}

/// Embedding client backed by an OpenAI-compatible `/embeddings` endpoint.
pub struct OpenAiEmbeddingClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAiEmbeddingClient {
    /// Build a client targeting `base_url` with the given model and key.
    pub fn new(
        base_url: &str,
        api_key: String,
        model: impl Into<String>,
    ) -> Result<Self, EmbeddingClientError> {
        let client = reqwest::Client::builder()
            .user_agent("arke/0.1")
            .build()
            .map_err(|err| EmbeddingClientError::GenerationFailed(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            api_key,
            model: model.into(),
        })
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbeddingClient {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = EmbeddingRequest {
            model: &self.model,
            input: &texts,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| EmbeddingClientError::GenerationFailed(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingClientError::GenerationFailed(format!(
                "embedding endpoint returned {status}: {body}"
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|err| EmbeddingClientError::GenerationFailed(err.to_string()))?;

        Ok(parsed.data.into_iter().map(|datum| datum.embedding).collect())
    }
}
