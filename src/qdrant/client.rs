//! HTTP client wrapper for interacting with Qdrant.

use crate::qdrant::{
    filters::{match_all, title_filter},
    payload::{build_payload, current_timestamp_rfc3339, generate_chunk_id},
    types::{PointInsert, QdrantError, QueryResponse, QueryResponseResult, ScoredPoint,
        ScrollResponse},
};
use reqwest::{Client, Method, StatusCode};
use serde_json::{Value, json};
use std::collections::BTreeSet;

const SCROLL_PAGE_LIMIT: usize = 512;

/// Lightweight HTTP client for Qdrant operations.
pub struct QdrantService {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
}

impl QdrantService {
    /// Construct a new client for the given base URL and optional API key.
    ///
    /// Construction is explicit so tests can point the service at a mock
    /// server instead of a live Qdrant instance.
    pub fn new(url: &str, api_key: Option<String>) -> Result<Self, QdrantError> {
        let client = Client::builder()
            .user_agent("arke/0.1")
            .build()?;

        let base_url = normalize_base_url(url).map_err(QdrantError::InvalidUrl)?;
        tracing::debug!(
            url = %base_url,
            has_api_key = api_key.as_deref().map(|value| !value.is_empty()).unwrap_or(false),
            "Initialized Qdrant HTTP client"
        );

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// Create a collection only when it is missing from Qdrant.
    ///
    /// The distance metric is fixed to cosine similarity and the vector size
    /// is fixed for the lifetime of the collection.
    pub async fn create_collection_if_not_exists(
        &self,
        collection_name: &str,
        vector_size: u64,
    ) -> Result<(), QdrantError> {
        if self.collection_exists(collection_name).await? {
            return Ok(());
        }

        tracing::debug!(
            collection = collection_name,
            vector_size,
            "Creating collection"
        );
        self.create_collection(collection_name, vector_size).await
    }

    /// Create or update a collection with the specified vector size.
    pub async fn create_collection(
        &self,
        collection_name: &str,
        vector_size: u64,
    ) -> Result<(), QdrantError> {
        let body = json!({
            "vectors": {
                "size": vector_size,
                "distance": "Cosine"
            }
        });

        let response = self
            .request(Method::PUT, &format!("collections/{collection_name}"))
            .json(&body)
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(collection = collection_name, "Collection ensured/created");
        })
        .await
    }

    /// Upload chunk vectors to the given collection.
    ///
    /// Every point receives a freshly generated random id; there is no
    /// upsert-by-content identity, so re-ingesting identical content creates
    /// duplicate entries.
    pub async fn upsert_points(
        &self,
        collection_name: &str,
        points: Vec<PointInsert>,
    ) -> Result<usize, QdrantError> {
        if points.is_empty() {
            return Ok(0);
        }

        let now = current_timestamp_rfc3339();
        let serialized: Vec<_> = points
            .into_iter()
            .map(|point| {
                let payload = build_payload(&point, &now);
                json!({
                    "id": generate_chunk_id(),
                    "vector": point.vector,
                    "payload": payload,
                })
            })
            .collect();

        let point_count = serialized.len();
        let response = self
            .request(
                Method::PUT,
                &format!("collections/{collection_name}/points"),
            )
            .query(&[("wait", true)])
            .json(&json!({ "points": serialized }))
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(
                collection = collection_name,
                points = point_count,
                "Points indexed"
            );
        })
        .await?;

        Ok(point_count)
    }

    /// Perform a top-k cosine similarity search, returning scored payloads.
    ///
    /// Tie order among equal scores is backend-defined and not guaranteed
    /// stable.
    pub async fn search_points(
        &self,
        collection_name: &str,
        vector: Vec<f32>,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, QdrantError> {
        let body = json!({
            "query": vector,
            "limit": limit,
            "with_payload": true,
        });

        let response = self
            .request(
                Method::POST,
                &format!("collections/{collection_name}/points/query"),
            )
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = QdrantError::UnexpectedStatus { status, body };
            tracing::error!(collection = collection_name, error = %error, "Qdrant search failed");
            return Err(error);
        }

        let payload: QueryResponse = response.json().await?;
        let points = match payload.result {
            QueryResponseResult::Points(points) => points,
            QueryResponseResult::Object { points } => points,
        };
        let results = points
            .into_iter()
            .map(|point| ScoredPoint {
                id: stringify_point_id(point.id),
                score: point.score,
                payload: point.payload,
            })
            .collect();

        Ok(results)
    }

    /// Delete every point whose payload title equals `title` exactly.
    ///
    /// Zero matches is still success; deleting a nonexistent title is not an
    /// error.
    pub async fn delete_by_title(
        &self,
        collection_name: &str,
        title: &str,
    ) -> Result<(), QdrantError> {
        self.delete_with_filter(collection_name, title_filter(title))
            .await?;
        tracing::info!(collection = collection_name, title, "Deleted chunks by title");
        Ok(())
    }

    /// Remove every point in the collection. Irreversible.
    pub async fn delete_all(&self, collection_name: &str) -> Result<(), QdrantError> {
        self.delete_with_filter(collection_name, match_all()).await?;
        tracing::info!(collection = collection_name, "Flushed collection");
        Ok(())
    }

    async fn delete_with_filter(
        &self,
        collection_name: &str,
        filter: Value,
    ) -> Result<(), QdrantError> {
        let response = self
            .request(
                Method::POST,
                &format!("collections/{collection_name}/points/delete"),
            )
            .query(&[("wait", true)])
            .json(&json!({ "filter": filter }))
            .send()
            .await?;

        self.ensure_success(response, || {}).await
    }

    /// Collect every distinct title in the collection, lexicographically sorted.
    ///
    /// Pages through the whole collection with the scroll cursor protocol and
    /// terminates when Qdrant stops returning a next offset; the set
    /// deduplicates titles seen across pages.
    pub async fn list_titles(&self, collection_name: &str) -> Result<Vec<String>, QdrantError> {
        let mut offset: Option<Value> = None;
        let mut titles = BTreeSet::new();

        loop {
            let body = json!({
                "with_payload": ["title"],
                "with_vector": false,
                "limit": SCROLL_PAGE_LIMIT,
                "offset": offset.clone().unwrap_or(Value::Null),
            });

            let response = self
                .request(
                    Method::POST,
                    &format!("collections/{collection_name}/points/scroll"),
                )
                .json(&body)
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                let error = QdrantError::UnexpectedStatus { status, body };
                tracing::error!(collection = collection_name, error = %error, "Failed to scroll titles");
                return Err(error);
            }

            let ScrollResponse { result } = response.json().await?;
            for point in result.points {
                if let Some(payload) = point.payload
                    && let Some(Value::String(title)) = payload.get("title")
                {
                    titles.insert(title.clone());
                }
            }

            match result.next_page_offset {
                Some(next) if !next.is_null() => offset = Some(next),
                _ => break,
            }
        }

        Ok(titles.into_iter().collect())
    }

    async fn collection_exists(&self, collection_name: &str) -> Result<bool, QdrantError> {
        let response = self
            .request(Method::GET, &format!("collections/{collection_name}"))
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => {
                let body = response.text().await.unwrap_or_default();
                let error = QdrantError::UnexpectedStatus { status, body };
                tracing::error!(collection = collection_name, error = %error, "Collection existence check failed");
                Err(error)
            }
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format_endpoint(&self.base_url, path);
        let mut req = self.client.request(method, url);
        if let Some(api_key) = &self.api_key
            && !api_key.is_empty()
        {
            req = req.header("api-key", api_key);
        }
        req
    }

    async fn ensure_success<F>(
        &self,
        response: reqwest::Response,
        on_success: F,
    ) -> Result<(), QdrantError>
    where
        F: FnOnce(),
    {
        if response.status().is_success() {
            on_success();
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = QdrantError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Qdrant request failed");
            Err(error)
        }
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

fn stringify_point_id(id: Value) -> String {
    match id {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
