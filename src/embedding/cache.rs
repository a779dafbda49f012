//! Content-addressed on-disk cache wrapped around an embedding client.
//!
//! Entries are keyed by `(sha256(content), model id)` and never expire on
//! their own; only deleting the files invalidates them. Concurrent identical
//! misses may both compute and both write, which is harmless because the
//! value is deterministic for a given input.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use super::{EmbeddingClient, EmbeddingClientError};

/// Embedding client decorator that caches vectors on local disk.
pub struct CachedEmbedder {
    inner: Box<dyn EmbeddingClient>,
    root: PathBuf,
}

impl CachedEmbedder {
    /// Wrap `inner` with a cache rooted at `root`.
    pub fn new(inner: Box<dyn EmbeddingClient>, root: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            root: root.into(),
        }
    }

    fn entry_path(&self, text: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        let digest = hex::encode(hasher.finalize());
        self.root
            .join(sanitize_model_id(self.inner.model_id()))
            .join(format!("{digest}.json"))
    }

    fn read_entry(path: &Path) -> Option<Vec<f32>> {
        let bytes = std::fs::read(path).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    fn write_entry(path: &Path, vector: &[f32]) {
        if let Some(parent) = path.parent()
            && let Err(err) = std::fs::create_dir_all(parent)
        {
            tracing::warn!(path = %parent.display(), error = %err, "Failed to create cache directory");
            return;
        }
        match serde_json::to_vec(vector) {
            Ok(bytes) => {
                if let Err(err) = std::fs::write(path, bytes) {
                    tracing::warn!(path = %path.display(), error = %err, "Failed to write cache entry");
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "Failed to serialize cache entry");
            }
        }
    }
}

fn sanitize_model_id(model: &str) -> String {
    model
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
            c
        } else {
            '_'
        })
        .collect()
}

#[async_trait]
impl EmbeddingClient for CachedEmbedder {
    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        let mut resolved: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());
        let mut misses: Vec<(usize, String)> = Vec::new();

        for (index, text) in texts.iter().enumerate() {
            match Self::read_entry(&self.entry_path(text)) {
                Some(vector) => resolved.push(Some(vector)),
                None => {
                    resolved.push(None);
                    misses.push((index, text.clone()));
                }
            }
        }

        if !misses.is_empty() {
            let miss_texts: Vec<String> = misses.iter().map(|(_, text)| text.clone()).collect();
            let computed = self.inner.generate_embeddings(miss_texts).await?;
            if computed.len() != misses.len() {
                return Err(EmbeddingClientError::GenerationFailed(format!(
                    "backend returned {} vectors for {} inputs",
                    computed.len(),
                    misses.len()
                )));
            }
            for ((index, text), vector) in misses.into_iter().zip(computed) {
                Self::write_entry(&self.entry_path(&text), &vector);
                resolved[index] = Some(vector);
            }
        }

        let hits = resolved.iter().filter(|entry| entry.is_some()).count();
        tracing::debug!(total = resolved.len(), hits, "Embedding cache lookup");

        Ok(resolved
            .into_iter()
            .map(|entry| entry.expect("all cache slots resolved"))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use std::sync::Arc;

    struct CountingClient {
        calls: Arc<AtomicUsize>,
        dimension: usize,
    }

    impl CountingClient {
        fn new(dimension: usize) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    calls: Arc::clone(&calls),
                    dimension,
                },
                calls,
            )
        }
    }

    #[async_trait]
    impl EmbeddingClient for CountingClient {
        fn model_id(&self) -> &str {
            "counting-model"
        }

        async fn generate_embeddings(
            &self,
            texts: Vec<String>,
        ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts
                .into_iter()
                .map(|text| {
                    let mut vector = vec![0.0_f32; self.dimension];
                    vector[0] = text.len() as f32;
                    vector
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn second_lookup_hits_cache_with_zero_backend_calls() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (inner, calls) = CountingClient::new(4);
        let cache = CachedEmbedder::new(Box::new(inner), dir.path());

        let first = cache
            .generate_embeddings(vec!["repeat me".into()])
            .await
            .unwrap();
        let second = cache
            .generate_embeddings(vec!["repeat me".into()])
            .await
            .unwrap();

        assert_eq!(first, second);
        // backend was consulted exactly once; the second call was a pure hit
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn misses_are_batched_into_one_backend_call() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (inner, _calls) = CountingClient::new(4);
        let cache = CachedEmbedder::new(Box::new(inner), dir.path());

        cache
            .generate_embeddings(vec!["alpha".into()])
            .await
            .unwrap();
        let mixed = cache
            .generate_embeddings(vec!["alpha".into(), "beta".into(), "gamma".into()])
            .await
            .unwrap();

        assert_eq!(mixed.len(), 3);
        assert_eq!(mixed[0][0], 5.0);
        assert_eq!(mixed[1][0], 4.0);
    }

    #[test]
    fn model_ids_are_sanitized_for_paths() {
        assert_eq!(sanitize_model_id("org/model:v1"), "org_model_v1");
        assert_eq!(sanitize_model_id("text-embedding-3.large"), "text-embedding-3.large");
    }
}
