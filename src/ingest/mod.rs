//! Document ingestion pipeline: extraction, splitting, and chunk-id assignment.

pub mod splitter;
pub mod types;

pub use splitter::{SplitterKind, split_text};
pub use types::{ChunkMetadata, DocumentChunk, IngestError, SplitError, SplitOptions};

use crate::extract::{ExtractionBackend, RawDocument, load_from_directory};
use std::collections::HashMap;
use std::path::Path;

/// Split normalized documents into chunks, carrying metadata onto each chunk.
///
/// Title metadata, when present on a document, is promoted onto its chunks;
/// everything else lands in the chunk's extra metadata. An unsupported
/// splitter kind fails before any document is split.
pub fn split_documents(
    docs: Vec<RawDocument>,
    options: &SplitOptions,
) -> Result<Vec<DocumentChunk>, SplitError> {
    let kind: SplitterKind = options.splitter_kind.parse()?;

    let mut chunks = Vec::new();
    for doc in docs {
        let mut extra = doc.metadata;
        let title = extra.remove("title");
        let pieces = split_text(
            &doc.content,
            kind,
            options.chunk_size,
            options.chunk_overlap,
            &options.embedding_model,
        )?;
        for piece in pieces {
            let mut chunk = DocumentChunk::new(piece, extra.clone());
            chunk.metadata.title = title.clone();
            chunks.push(chunk);
        }
    }
    Ok(chunks)
}

/// Assign dense per-title chunk indices, falling back to `fallback_title`.
///
/// For every title present in the output, chunk indices are exactly
/// `0..count` in production order, even when chunks from different titles are
/// interleaved in the input sequence.
pub fn assign_chunk_ids(chunks: Vec<DocumentChunk>, fallback_title: &str) -> Vec<DocumentChunk> {
    let mut counters: HashMap<String, usize> = HashMap::new();

    chunks
        .into_iter()
        .map(|mut chunk| {
            let title = chunk
                .metadata
                .title
                .take()
                .unwrap_or_else(|| fallback_title.to_string());
            let counter = counters.entry(title.clone()).or_insert(0);
            chunk.metadata.chunk = Some(*counter);
            *counter += 1;
            chunk.metadata.title = Some(title);
            chunk
        })
        .collect()
}

/// Full ingestion pipeline: load a directory, split, and assign chunk ids.
///
/// Any failure in any stage propagates unmodified; there is no retry, since a
/// silent retry against malformed documents risks duplicate indexing.
pub async fn process_directory(
    backend: &dyn ExtractionBackend,
    path: &Path,
    ocr_language: &str,
    options: &SplitOptions,
) -> Result<Vec<DocumentChunk>, IngestError> {
    let docs = load_from_directory(backend, path, ocr_language).await?;
    let chunks = split_documents(docs, options)?;
    let fallback_title = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(assign_chunk_ids(chunks, &fallback_title))
}
