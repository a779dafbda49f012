//! Text splitters used during ingestion.
//!
//! Two kinds are supported:
//!
//! - `recursive` — cascading natural boundaries (paragraph, sentence, word)
//!   greedily packed up to the chunk size in characters, with a character
//!   overlap repeated at each boundary.
//! - `token` — fixed-size token windows over the embedding model's
//!   tokenization, with the same overlap semantics expressed in tokens.
//!
//! Any other kind is a configuration error and produces no partial output.

use anyhow::Error as TokenizerError;
use semchunk_rs::Chunker;
use std::str::FromStr;
use tiktoken_rs::{CoreBPE, cl100k_base, get_bpe_from_model};

use super::types::SplitError;

/// Supported splitter kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitterKind {
    /// Character-budget splitting on cascading natural boundaries.
    Recursive,
    /// Fixed-size token windows over the model tokenization.
    Token,
}

impl FromStr for SplitterKind {
    type Err = SplitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "recursive" => Ok(Self::Recursive),
            "token" => Ok(Self::Token),
            other => Err(SplitError::Configuration(other.to_string())),
        }
    }
}

/// Split `text` into chunks according to the requested splitter kind.
///
/// Returns an empty vector when the input is all whitespace.
pub fn split_text(
    text: &str,
    kind: SplitterKind,
    chunk_size: usize,
    chunk_overlap: usize,
    model: &str,
) -> Result<Vec<String>, SplitError> {
    if chunk_size == 0 {
        return Err(SplitError::InvalidChunkSize);
    }
    if chunk_overlap >= chunk_size {
        return Err(SplitError::InvalidChunkOverlap);
    }
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    match kind {
        SplitterKind::Recursive => Ok(recursive_split(text, chunk_size, chunk_overlap)),
        SplitterKind::Token => token_split(text, chunk_size, chunk_overlap, model),
    }
}

/// Greedily pack natural-boundary segments into character-budgeted chunks.
fn recursive_split(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chunker = Chunker::new(chunk_size, Box::new(|segment: &str| segment.chars().count()));
    let base = chunker.chunk(text);
    apply_char_overlap(base, chunk_size, overlap)
}

/// Repeat the tail of the previous chunk at the start of the next one.
///
/// The overlapped chunk is trimmed from the front so the character budget is
/// never exceeded.
fn apply_char_overlap(chunks: Vec<String>, chunk_size: usize, overlap: usize) -> Vec<String> {
    if overlap == 0 || chunks.len() < 2 {
        return chunks;
    }

    let mut overlapped = Vec::with_capacity(chunks.len());
    let mut iter = chunks.into_iter();
    let mut previous = iter.next().expect("guarded by len check");
    overlapped.push(previous.clone());

    for current in iter {
        let tail = char_tail(&previous, overlap);
        let mut combined = String::with_capacity(tail.len() + current.len() + 1);
        if !tail.is_empty() {
            combined.push_str(tail);
            if !tail.ends_with(char::is_whitespace) && !current.starts_with(char::is_whitespace) {
                combined.push(' ');
            }
        }
        combined.push_str(&current);
        overlapped.push(trim_to_char_budget(combined, chunk_size));
        previous = current;
    }

    overlapped
}

/// Last `count` characters of `text`, respecting char boundaries.
fn char_tail(text: &str, count: usize) -> &str {
    let chars = text.chars().count();
    if chars <= count {
        return text;
    }
    let skip = chars - count;
    match text.char_indices().nth(skip) {
        Some((offset, _)) => text[offset..].trim_start(),
        None => "",
    }
}

/// Drop leading characters until `text` fits the character budget.
fn trim_to_char_budget(text: String, budget: usize) -> String {
    let chars = text.chars().count();
    if chars <= budget {
        return text;
    }
    let skip = chars - budget;
    match text.char_indices().nth(skip) {
        Some((offset, _)) => text[offset..].trim_start().to_string(),
        None => String::new(),
    }
}

/// Slice the model tokenization into fixed-size windows with overlap.
fn token_split(
    text: &str,
    chunk_size: usize,
    overlap: usize,
    model: &str,
) -> Result<Vec<String>, SplitError> {
    let encoding = resolve_encoding(model).map_err(|source| SplitError::Tokenizer {
        model: model.to_string(),
        source,
    })?;

    let tokens = encoding.encode_ordinary(text);
    if tokens.is_empty() {
        return Ok(Vec::new());
    }

    let stride = chunk_size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < tokens.len() {
        let end = (start + chunk_size).min(tokens.len());
        let window = tokens[start..end].to_vec();
        let rendered = encoding
            .decode(window)
            .map_err(|err| SplitError::Tokenizer {
                model: model.to_string(),
                source: anyhow::anyhow!("{err}"),
            })?;
        chunks.push(rendered);
        if end == tokens.len() {
            break;
        }
        start += stride;
    }

    Ok(chunks)
}

/// Resolve a tokenizer encoding for the configured model.
///
/// Falls back to `cl100k_base` for models the tokenizer library does not know,
/// which keeps ingestion flowing for locally aliased models.
fn resolve_encoding(model: &str) -> Result<CoreBPE, TokenizerError> {
    match get_bpe_from_model(model) {
        Ok(encoding) => Ok(encoding),
        Err(model_err) => {
            tracing::debug!(
                model,
                error = %model_err,
                "Tokenizer model lookup failed; falling back to cl100k_base"
            );
            cl100k_base()
        }
    }
}
