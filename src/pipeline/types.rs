//! Error and result types for the retrieval pipeline.

use crate::embedding::EmbeddingClientError;
use crate::generation::GenerationError;
use crate::ingest::IngestError;
use crate::qdrant::QdrantError;
use thiserror::Error;

/// Errors raised while storing a folder of documents.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Extraction or splitting failed.
    #[error(transparent)]
    Ingest(#[from] IngestError),
    /// The folder produced no indexable chunks.
    #[error("No documents with extractable content found in '{0}'")]
    EmptyInput(String),
    /// The embedding backend failed.
    #[error(transparent)]
    Embedding(#[from] EmbeddingClientError),
    /// A produced vector did not match the collection dimension.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension the collection was created with.
        expected: usize,
        /// Dimension the embedding backend returned.
        actual: usize,
    },
    /// Writing to the vector index failed.
    #[error(transparent)]
    Indexing(#[from] QdrantError),
}

/// Errors raised while answering a query.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Embedding the query failed.
    #[error(transparent)]
    Embedding(#[from] EmbeddingClientError),
    /// The query vector did not match the collection dimension.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension the collection was created with.
        expected: usize,
        /// Dimension the embedding backend returned.
        actual: usize,
    },
    /// Similarity search failed.
    #[error(transparent)]
    Qdrant(#[from] QdrantError),
    /// Answer generation failed.
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Answer to a user query.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    /// Answer text shown to the user.
    pub content: String,
    /// Whether the answer was generated from retrieved chunks.
    ///
    /// `false` means retrieval found nothing and the fixed not-found message
    /// was returned without invoking generation.
    pub grounded: bool,
}
