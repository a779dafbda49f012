//! Retrieval pipeline orchestrating ingestion, indexing, search, and answers.

use crate::config::get_config;
use crate::embedding::{CachedEmbedder, EmbeddingClient, HashingEmbeddingClient,
    OpenAiEmbeddingClient};
use crate::extract::{ExtractionBackend, FileExtractor};
use crate::generation::{GenerationClient, NOT_FOUND_MESSAGE, OpenAiGenerationClient};
use crate::ingest::{SplitOptions, process_directory};
use crate::metrics::ServiceMetrics;
use crate::pipeline::types::{Answer, QueryError, StoreError};
use crate::qdrant::{PointInsert, QdrantService};
use std::path::Path;
use std::sync::Arc;

/// Number of chunks retrieved per query.
const SEARCH_LIMIT: usize = 10;

/// Message returned after a successful store operation.
pub const STORE_SUCCESS_MESSAGE: &str =
    "Documents have been successfully stored in the knowledge base.";

/// Core document question-answering service.
///
/// Holds one embedding client shared by the storage and query paths, so both
/// always embed with the same model.
pub struct RagService {
    extractor: Box<dyn ExtractionBackend>,
    embedder: Box<dyn EmbeddingClient>,
    generator: Box<dyn GenerationClient>,
    qdrant: QdrantService,
    metrics: Arc<ServiceMetrics>,
    collection_name: String,
    dimension: usize,
    split_options: SplitOptions,
    ocr_language: String,
}

impl RagService {
    /// Assemble a service from explicit parts.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        extractor: Box<dyn ExtractionBackend>,
        embedder: Box<dyn EmbeddingClient>,
        generator: Box<dyn GenerationClient>,
        qdrant: QdrantService,
        metrics: Arc<ServiceMetrics>,
        collection_name: impl Into<String>,
        dimension: usize,
        split_options: SplitOptions,
        ocr_language: impl Into<String>,
    ) -> Self {
        Self {
            extractor,
            embedder,
            generator,
            qdrant,
            metrics,
            collection_name: collection_name.into(),
            dimension,
            split_options,
            ocr_language: ocr_language.into(),
        }
    }

    /// Assemble a service from the global configuration.
    ///
    /// Uses the OpenAI-compatible embedding and generation backends when an
    /// API key is configured, and the deterministic offline backend otherwise.
    pub fn from_config(metrics: Arc<ServiceMetrics>) -> anyhow::Result<Self> {
        let config = get_config();

        let base_embedder: Box<dyn EmbeddingClient> = match (&config.openai_api_key, &config.openai_base_url) {
            (Some(key), base) => Box::new(OpenAiEmbeddingClient::new(
                base.as_deref().unwrap_or("https://api.openai.com/v1"),
                key.clone(),
                config.embedding_model.clone(),
            )?),
            (None, _) => Box::new(HashingEmbeddingClient::new(
                config.embedding_model.clone(),
                config.embedding_dimension,
            )),
        };
        let embedder = Box::new(CachedEmbedder::new(
            base_embedder,
            config.embedding_cache_dir.clone(),
        ));

        let generator: Box<dyn GenerationClient> = Box::new(OpenAiGenerationClient::new(
            config
                .openai_base_url
                .as_deref()
                .unwrap_or("https://api.openai.com/v1"),
            config.openai_api_key.clone().unwrap_or_default(),
            config.generation_model.clone(),
        )?);

        let qdrant = QdrantService::new(&config.qdrant_url, config.qdrant_api_key.clone())?;

        let split_options = SplitOptions {
            splitter_kind: config.splitter_kind.clone(),
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            embedding_model: config.embedding_model.clone(),
        };

        Ok(Self::new(
            Box::new(FileExtractor::new()),
            embedder,
            generator,
            qdrant,
            metrics,
            config.qdrant_collection_name.clone(),
            config.embedding_dimension,
            split_options,
            config.ocr_language.clone(),
        ))
    }

    /// Ensure the backing collection exists with the configured dimension.
    pub async fn ensure_collection(&self) -> Result<(), crate::qdrant::QdrantError> {
        self.qdrant
            .create_collection_if_not_exists(&self.collection_name, self.dimension as u64)
            .await
    }

    /// Ingest a folder of documents into the knowledge base.
    ///
    /// Runs extraction, splitting, chunk-id assignment, embedding, and
    /// indexing; any stage failure aborts the whole operation.
    pub async fn store(&self, folder: &Path) -> Result<String, StoreError> {
        let chunks =
            process_directory(self.extractor.as_ref(), folder, &self.ocr_language, &self.split_options)
                .await?;
        if chunks.is_empty() {
            return Err(StoreError::EmptyInput(folder.display().to_string()));
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.content.clone()).collect();
        let vectors = self.embedder.generate_embeddings(texts).await?;
        for vector in &vectors {
            if vector.len() != self.dimension {
                return Err(StoreError::DimensionMismatch {
                    expected: self.dimension,
                    actual: vector.len(),
                });
            }
        }

        let points: Vec<PointInsert> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| PointInsert {
                content: chunk.content,
                title: chunk.metadata.title.unwrap_or_default(),
                chunk: chunk.metadata.chunk.unwrap_or(0),
                extra: chunk.metadata.extra,
                vector,
            })
            .collect();

        let indexed = self.qdrant.upsert_points(&self.collection_name, points).await?;
        self.metrics.record_store(indexed as u64);
        tracing::info!(folder = %folder.display(), chunks = indexed, "Folder ingested");
        Ok(STORE_SUCCESS_MESSAGE.to_string())
    }

    /// Answer a question from the knowledge base.
    ///
    /// When retrieval returns no chunks, the fixed not-found message is
    /// returned and generation is never invoked.
    pub async fn query(&self, question: &str) -> Result<Answer, QueryError> {
        let mut vectors = self
            .embedder
            .generate_embeddings(vec![question.to_string()])
            .await?;
        let vector = vectors.pop().unwrap_or_default();
        if vector.len() != self.dimension {
            return Err(QueryError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        let hits = self
            .qdrant
            .search_points(&self.collection_name, vector, SEARCH_LIMIT)
            .await?;

        if hits.is_empty() {
            self.metrics.record_query(false);
            tracing::debug!("No chunks retrieved for query");
            return Ok(Answer {
                content: NOT_FOUND_MESSAGE.to_string(),
                grounded: false,
            });
        }

        // Rank order from the search result is preserved in the context.
        let context = hits
            .iter()
            .filter_map(|hit| hit.content())
            .collect::<Vec<_>>()
            .join("\n\n");

        let content = self.generator.generate(question, &context).await?;
        self.metrics.record_query(true);
        Ok(Answer {
            content,
            grounded: true,
        })
    }

    /// Delete every chunk belonging to the named document.
    ///
    /// A title with no matching chunks still succeeds.
    pub async fn delete(&self, title: &str) -> Result<String, crate::qdrant::QdrantError> {
        self.qdrant.delete_by_title(&self.collection_name, title).await?;
        Ok(format!("Deleted all chunks from book '{title}'"))
    }

    /// All distinct document titles currently indexed, sorted.
    pub async fn list_titles(&self) -> Result<Vec<String>, crate::qdrant::QdrantError> {
        self.qdrant.list_titles(&self.collection_name).await
    }

    /// Remove every chunk from the knowledge base.
    pub async fn flush(&self) -> Result<(), crate::qdrant::QdrantError> {
        self.qdrant.delete_all(&self.collection_name).await
    }

    /// Replace the named document with the contents of `folder`.
    ///
    /// Deletion failure is logged and re-insertion proceeds anyway, so a
    /// partially failed update leaves the old chunks alongside the new ones
    /// rather than losing the document entirely.
    pub async fn update(&self, folder: &Path, title: &str) -> Result<String, StoreError> {
        if let Err(err) = self.qdrant.delete_by_title(&self.collection_name, title).await {
            tracing::warn!(title, error = %err, "Delete before update failed; inserting anyway");
        }
        self.store(folder).await
    }

    /// Snapshot of the service counters.
    pub fn metrics_snapshot(&self) -> crate::metrics::MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbeddingClientError;
    use crate::extract::FileExtractor;
    use crate::generation::GenerationError;
    use async_trait::async_trait;
    use httpmock::{Method::POST, MockServer};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingGenerator {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl GenerationClient for CountingGenerator {
        async fn generate(&self, _query: &str, context: &str) -> Result<String, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("answer from: {context}"))
        }
    }

    struct WrongDimensionEmbedder;

    #[async_trait]
    impl crate::embedding::EmbeddingClient for WrongDimensionEmbedder {
        fn model_id(&self) -> &str {
            "wrong-dim"
        }

        async fn generate_embeddings(
            &self,
            texts: Vec<String>,
        ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
            Ok(texts.into_iter().map(|_| vec![0.5, 0.5, 0.5]).collect())
        }
    }

    fn split_options() -> SplitOptions {
        SplitOptions {
            splitter_kind: "recursive".to_string(),
            chunk_size: 200,
            chunk_overlap: 0,
            embedding_model: "test-model".to_string(),
        }
    }

    fn service_for(
        server: &MockServer,
        dimension: usize,
        generator_calls: Arc<AtomicUsize>,
    ) -> RagService {
        RagService::new(
            Box::new(FileExtractor::new()),
            Box::new(HashingEmbeddingClient::new("test-model", dimension)),
            Box::new(CountingGenerator {
                calls: generator_calls,
            }),
            QdrantService::new(&server.base_url(), None).expect("qdrant"),
            Arc::new(ServiceMetrics::new()),
            "docs",
            dimension,
            split_options(),
            "eng",
        )
    }

    #[tokio::test]
    async fn empty_search_returns_not_found_without_generation() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/collections/docs/points/query");
                then.status(200).json_body(json!({ "result": [] }));
            })
            .await;

        let calls = Arc::new(AtomicUsize::new(0));
        let service = service_for(&server, 8, calls.clone());
        let answer = service.query("anything?").await.expect("query");

        assert_eq!(answer.content, NOT_FOUND_MESSAGE);
        assert!(!answer.grounded);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(service.metrics_snapshot().ungrounded_answers, 1);
    }

    #[tokio::test]
    async fn hits_are_joined_in_rank_order_for_generation() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/collections/docs/points/query");
                then.status(200).json_body(json!({
                    "result": [
                        { "id": "a", "score": 0.9, "payload": { "content": "first" } },
                        { "id": "b", "score": 0.5, "payload": { "content": "second" } }
                    ]
                }));
            })
            .await;

        let calls = Arc::new(AtomicUsize::new(0));
        let service = service_for(&server, 8, calls.clone());
        let answer = service.query("question").await.expect("query");

        assert!(answer.grounded);
        assert_eq!(answer.content, "answer from: first\n\nsecond");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn store_rejects_empty_folder() {
        let server = MockServer::start_async().await;
        let dir = tempfile::tempdir().expect("tempdir");
        let calls = Arc::new(AtomicUsize::new(0));
        let service = service_for(&server, 8, calls);

        let error = service.store(dir.path()).await.unwrap_err();
        assert!(matches!(error, StoreError::EmptyInput(_)));
    }

    #[tokio::test]
    async fn store_indexes_chunks_and_reports_success() {
        let server = MockServer::start_async().await;
        let upsert = server
            .mock_async(|when, then| {
                when.method(httpmock::Method::PUT)
                    .path("/collections/docs/points")
                    .body_contains("\"title\":\"folder\"");
                then.status(200).json_body(json!({ "result": { "status": "completed" } }));
            })
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let folder = dir.path().join("folder");
        std::fs::create_dir(&folder).expect("mkdir");
        std::fs::write(folder.join("a.txt"), "some document text").expect("write");

        let calls = Arc::new(AtomicUsize::new(0));
        let service = service_for(&server, 8, calls);
        let message = service.store(&folder).await.expect("store");

        upsert.assert();
        assert_eq!(message, STORE_SUCCESS_MESSAGE);
        let snapshot = service.metrics_snapshot();
        assert_eq!(snapshot.folders_ingested, 1);
        assert!(snapshot.chunks_indexed >= 1);
    }

    #[tokio::test]
    async fn dimension_mismatch_is_rejected_before_indexing() {
        let server = MockServer::start_async().await;
        let dir = tempfile::tempdir().expect("tempdir");
        let folder = dir.path().join("folder");
        std::fs::create_dir(&folder).expect("mkdir");
        std::fs::write(folder.join("a.txt"), "text").expect("write");

        let service = RagService::new(
            Box::new(FileExtractor::new()),
            Box::new(WrongDimensionEmbedder),
            Box::new(CountingGenerator {
                calls: Arc::new(AtomicUsize::new(0)),
            }),
            QdrantService::new(&server.base_url(), None).expect("qdrant"),
            Arc::new(ServiceMetrics::new()),
            "docs",
            8,
            split_options(),
            "eng",
        );

        let error = service.store(&folder).await.unwrap_err();
        assert!(matches!(
            error,
            StoreError::DimensionMismatch { expected: 8, actual: 3 }
        ));
    }

    #[tokio::test]
    async fn delete_message_names_the_title() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/collections/docs/points/delete");
                then.status(200).json_body(json!({ "result": { "status": "acknowledged" } }));
            })
            .await;

        let calls = Arc::new(AtomicUsize::new(0));
        let service = service_for(&server, 8, calls);
        let message = service.delete("folder").await.expect("delete");
        assert_eq!(message, "Deleted all chunks from book 'folder'");
    }

    #[tokio::test]
    async fn update_proceeds_when_delete_fails() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/collections/docs/points/delete");
                then.status(500).body("unavailable");
            })
            .await;
        let upsert = server
            .mock_async(|when, then| {
                when.method(httpmock::Method::PUT).path("/collections/docs/points");
                then.status(200).json_body(json!({ "result": { "status": "completed" } }));
            })
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let folder = dir.path().join("folder");
        std::fs::create_dir(&folder).expect("mkdir");
        std::fs::write(folder.join("a.txt"), "updated text").expect("write");

        let calls = Arc::new(AtomicUsize::new(0));
        let service = service_for(&server, 8, calls);
        let message = service.update(&folder, "folder").await.expect("update");

        upsert.assert();
        assert_eq!(message, STORE_SUCCESS_MESSAGE);
    }
}
