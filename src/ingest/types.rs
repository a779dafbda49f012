//! Core data types and error definitions for the ingestion pipeline.

use crate::extract::ExtractError;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors emitted by the document ingestion pipeline.
///
/// Every stage is fail-fast: a failure anywhere aborts the whole directory so
/// the indexed document set stays consistent.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Loading or extracting the directory contents failed.
    #[error(transparent)]
    Extract(#[from] ExtractError),
    /// Splitting documents into chunks failed.
    #[error(transparent)]
    Split(#[from] SplitError),
}

/// Errors produced while turning documents into bounded chunks.
#[derive(Debug, Error)]
pub enum SplitError {
    /// Configured splitter kind is not one of `recursive` or `token`.
    #[error("unsupported splitter kind: '{0}'")]
    Configuration(String),
    /// Ingestion configured an impossible chunk budget.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Overlap must leave room for fresh content in every chunk.
    #[error("chunk overlap must be smaller than chunk size")]
    InvalidChunkOverlap,
    /// Tokenizer resources were unavailable for the configured model.
    #[error("failed to initialize tokenizer for model '{model}': {source}")]
    Tokenizer {
        /// Embedding model we attempted to load.
        model: String,
        /// Underlying error raised by the tokenizer library.
        #[source]
        source: anyhow::Error,
    },
}

/// Metadata attached to each chunk.
///
/// After [`crate::ingest::assign_chunk_ids`] runs, `title` and `chunk` are
/// always populated and, for a fixed title, chunk indices form a dense
/// sequence starting at zero in production order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkMetadata {
    /// Human-readable document title; falls back to the source folder name.
    pub title: Option<String>,
    /// Position of this chunk within its title's sequence.
    pub chunk: Option<usize>,
    /// Extra string-valued metadata carried from extraction.
    pub extra: BTreeMap<String, String>,
}

/// A bounded slice of a document's text plus metadata, the unit of storage and retrieval.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentChunk {
    /// Chunk text content.
    pub content: String,
    /// Associated metadata.
    pub metadata: ChunkMetadata,
}

impl DocumentChunk {
    /// Build a chunk carrying the given content and extra metadata.
    pub fn new(content: String, extra: BTreeMap<String, String>) -> Self {
        Self {
            content,
            metadata: ChunkMetadata {
                title: None,
                chunk: None,
                extra,
            },
        }
    }
}

/// Parameters controlling the splitting stage.
#[derive(Debug, Clone)]
pub struct SplitOptions {
    /// Splitter kind as configured (`recursive` or `token`).
    pub splitter_kind: String,
    /// Chunk size in splitter units (characters or tokens).
    pub chunk_size: usize,
    /// Overlap repeated at each boundary, in splitter units.
    pub chunk_overlap: usize,
    /// Model identifier used to resolve the tokenizer for token splitting.
    pub embedding_model: String,
}
