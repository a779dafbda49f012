//! Extraction backend contract and the local file extractor.
//!
//! Ingestion treats extraction as a single batch: one unreadable file aborts the
//! whole directory so a partially indexed document set can never be committed.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Errors raised while turning files into documents.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Input path is missing or does not point at a directory.
    #[error("input path '{0}' does not exist or is not a directory")]
    NotADirectory(String),
    /// A file in the batch could not be extracted; the batch is aborted.
    #[error("failed to extract '{path}': {source}")]
    Extraction {
        /// Path of the file that failed.
        path: String,
        /// Underlying extraction failure.
        #[source]
        source: anyhow::Error,
    },
}

/// Raw output produced by an extraction backend for a single file.
#[derive(Debug, Clone)]
pub struct RawExtraction {
    /// Extracted plain text.
    pub content: String,
    /// Backend-specific metadata; values may be any JSON type.
    pub metadata: Option<Map<String, Value>>,
}

/// Normalized document with string-valued metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    /// Extracted plain text.
    pub content: String,
    /// Normalized metadata mapping.
    pub metadata: BTreeMap<String, String>,
}

/// Interface implemented by extraction backends.
///
/// Must support at least PDF input. Failure of any file surfaces as a single
/// aggregate error for the batch.
#[async_trait]
pub trait ExtractionBackend: Send + Sync {
    /// Extract text and metadata from each of the supplied files, in order.
    async fn extract_files(
        &self,
        paths: &[PathBuf],
        ocr_language: &str,
    ) -> Result<Vec<RawExtraction>, ExtractError>;
}

/// Local extraction backend handling PDF and plain-text files.
pub struct FileExtractor;

impl FileExtractor {
    /// Construct a new local extractor instance.
    pub const fn new() -> Self {
        Self
    }

    fn extract_one(path: &Path) -> Result<RawExtraction, ExtractError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let content = match extension.as_str() {
            "pdf" => pdf_extract::extract_text(path).map_err(|err| ExtractError::Extraction {
                path: path.display().to_string(),
                source: anyhow::Error::new(err),
            })?,
            _ => std::fs::read_to_string(path).map_err(|err| ExtractError::Extraction {
                path: path.display().to_string(),
                source: anyhow::Error::new(err),
            })?,
        };

        let mut metadata = Map::new();
        metadata.insert(
            "source".into(),
            Value::String(path.display().to_string()),
        );
        if !extension.is_empty() {
            metadata.insert("extension".into(), Value::String(extension));
        }

        Ok(RawExtraction {
            content,
            metadata: Some(metadata),
        })
    }
}

impl Default for FileExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExtractionBackend for FileExtractor {
    async fn extract_files(
        &self,
        paths: &[PathBuf],
        ocr_language: &str,
    ) -> Result<Vec<RawExtraction>, ExtractError> {
        tracing::debug!(files = paths.len(), ocr_language, "Extracting batch");
        paths.iter().map(|path| Self::extract_one(path)).collect()
    }
}

/// Normalize raw extraction results into documents with string-valued metadata.
///
/// Absent metadata yields an empty mapping; non-string values are stringified.
pub fn convert_to_documents(results: Vec<RawExtraction>) -> Vec<RawDocument> {
    results
        .into_iter()
        .map(|result| {
            let metadata = result
                .metadata
                .unwrap_or_default()
                .into_iter()
                .map(|(key, value)| {
                    let rendered = match value {
                        Value::String(text) => text,
                        other => other.to_string(),
                    };
                    (key, rendered)
                })
                .collect();
            RawDocument {
                content: result.content,
                metadata,
            }
        })
        .collect()
}

/// List the regular files directly inside `path`, sorted for deterministic ordering.
///
/// Hidden files are skipped. Fails with [`ExtractError::NotADirectory`] when the
/// path is missing or not a directory.
pub fn list_directory_files(path: &Path) -> Result<Vec<PathBuf>, ExtractError> {
    if !path.is_dir() {
        return Err(ExtractError::NotADirectory(path.display().to_string()));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| !entry.file_name().to_string_lossy().starts_with('.'))
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    Ok(files)
}

/// Load every file in a directory through the extraction backend.
pub async fn load_from_directory(
    backend: &dyn ExtractionBackend,
    path: &Path,
    ocr_language: &str,
) -> Result<Vec<RawDocument>, ExtractError> {
    let files = list_directory_files(path)?;
    let results = backend.extract_files(&files, ocr_language).await?;
    Ok(convert_to_documents(results))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn convert_handles_missing_metadata() {
        let docs = convert_to_documents(vec![RawExtraction {
            content: "body".into(),
            metadata: None,
        }]);
        assert_eq!(docs.len(), 1);
        assert!(docs[0].metadata.is_empty());
        assert_eq!(docs[0].content, "body");
    }

    #[test]
    fn convert_stringifies_non_string_values() {
        let mut metadata = Map::new();
        metadata.insert("pages".into(), json!(12));
        metadata.insert("title".into(), Value::String("Report".into()));
        let docs = convert_to_documents(vec![RawExtraction {
            content: "body".into(),
            metadata: Some(metadata),
        }]);
        assert_eq!(docs[0].metadata["pages"], "12");
        assert_eq!(docs[0].metadata["title"], "Report");
    }

    #[test]
    fn missing_directory_is_rejected() {
        let error = list_directory_files(Path::new("does/not/exist")).unwrap_err();
        assert!(matches!(error, ExtractError::NotADirectory(_)));
    }

    #[tokio::test]
    async fn extractor_reads_plain_text_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("note.txt"), "hello world").expect("write");
        std::fs::write(dir.path().join(".hidden"), "skip me").expect("write");

        let docs = load_from_directory(&FileExtractor::new(), dir.path(), "eng")
            .await
            .expect("load");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].content, "hello world");
        assert!(docs[0].metadata["source"].ends_with("note.txt"));
        assert_eq!(docs[0].metadata["extension"], "txt");
    }

    #[tokio::test]
    async fn unreadable_file_aborts_batch() {
        let extractor = FileExtractor::new();
        let missing = vec![PathBuf::from("nope/missing.txt")];
        let error = extractor.extract_files(&missing, "eng").await.unwrap_err();
        assert!(matches!(error, ExtractError::Extraction { .. }));
    }
}
