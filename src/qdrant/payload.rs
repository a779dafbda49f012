//! Helpers for constructing Qdrant payloads and point identifiers.

use crate::qdrant::types::PointInsert;
use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

/// Build the payload object stored alongside each indexed chunk.
///
/// Reserved keys (`title`, `chunk`, `content`, `indexed_at`) win over extra
/// metadata carrying the same name.
pub(crate) fn build_payload(point: &PointInsert, indexed_at: &str) -> Value {
    let mut payload = Map::new();
    for (key, value) in &point.extra {
        payload.insert(key.clone(), Value::String(value.clone()));
    }
    payload.insert("title".into(), Value::String(point.title.clone()));
    payload.insert("chunk".into(), Value::from(point.chunk as u64));
    payload.insert("content".into(), Value::String(point.content.clone()));
    payload.insert("indexed_at".into(), Value::String(indexed_at.to_string()));
    Value::Object(payload)
}

/// Current timestamp formatted for payload storage.
pub(crate) fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/// Construct a random chunk identifier.
///
/// Ids are never derived from content, so identifiers are never reused after
/// deletion within a process run and re-ingesting identical content creates
/// fresh entries.
pub(crate) fn generate_chunk_id() -> String {
    Uuid::new_v4().to_string()
}
