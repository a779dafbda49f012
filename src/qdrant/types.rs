//! Shared types used by the Qdrant client and helpers.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors returned while interacting with Qdrant.
#[derive(Debug, Error)]
pub enum QdrantError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid Qdrant URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Qdrant responded with an unexpected status code.
    #[error("Unexpected Qdrant response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from Qdrant.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
}

/// Prepared point ready for indexing: chunk content, metadata, and vector.
#[derive(Debug, Clone)]
pub struct PointInsert {
    /// Chunk text content stored in the payload.
    pub content: String,
    /// Document title the chunk belongs to.
    pub title: String,
    /// Dense per-title chunk index.
    pub chunk: usize,
    /// Extra string-valued metadata carried from extraction.
    pub extra: BTreeMap<String, String>,
    /// Embedding vector produced for the chunk.
    pub vector: Vec<f32>,
}

/// Scored payload returned by Qdrant queries.
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    /// Identifier assigned to the vector.
    pub id: String,
    /// Similarity score computed by Qdrant.
    pub score: f32,
    /// Optional payload associated with the vector.
    pub payload: Option<Map<String, Value>>,
}

impl ScoredPoint {
    /// Chunk content stored in the payload, if any.
    pub fn content(&self) -> Option<&str> {
        self.payload
            .as_ref()
            .and_then(|payload| payload.get("content"))
            .and_then(Value::as_str)
    }
}

#[derive(Deserialize)]
pub(crate) struct QueryResponse {
    pub(crate) result: QueryResponseResult,
}

#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum QueryResponseResult {
    Points(Vec<QueryPoint>),
    Object {
        #[serde(default)]
        points: Vec<QueryPoint>,
    },
}

#[derive(Deserialize)]
pub(crate) struct QueryPoint {
    pub(crate) id: Value,
    pub(crate) score: f32,
    #[serde(default)]
    pub(crate) payload: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
pub(crate) struct ScrollResponse {
    pub(crate) result: ScrollResult,
}

#[derive(Deserialize)]
pub(crate) struct ScrollResult {
    #[serde(default)]
    pub(crate) points: Vec<ScrollPoint>,
    #[serde(default)]
    pub(crate) next_page_offset: Option<Value>,
}

#[derive(Deserialize)]
pub(crate) struct ScrollPoint {
    #[serde(default)]
    pub(crate) payload: Option<Map<String, Value>>,
}
