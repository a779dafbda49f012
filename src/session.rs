//! Conversation session tracking.
//!
//! Sessions live in process memory only; restarting the service starts with
//! an empty store. Vector index contents are unaffected.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Maximum characters of the first message kept as a session title.
const TITLE_PREVIEW_CHARS: usize = 50;

/// Title assigned to sessions before any turn or explicit rename.
const PLACEHOLDER_TITLE: &str = "New conversation";

/// Errors raised by session stores.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No session exists with the requested id.
    #[error("Thread not found")]
    NotFound,
}

/// Metadata tracked for one conversation session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionRecord {
    /// Stable session identifier.
    pub id: String,
    /// Preview of the first user message, or a placeholder before any turn.
    pub title: String,
    /// Unix seconds at creation.
    pub created_at: u64,
    /// Unix seconds of the most recent activity.
    pub updated_at: u64,
    /// Number of user turns recorded.
    pub message_count: u64,
    /// Whether a flush is awaiting confirmation on this session.
    #[serde(skip)]
    pub pending_flush: bool,
}

/// Interface for session persistence.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create a session, optionally with a caller-chosen id.
    async fn create(&self, id: Option<String>) -> SessionRecord;

    /// Fetch one session by id.
    async fn get(&self, id: &str) -> Result<SessionRecord, SessionError>;

    /// All sessions, most recently active first.
    async fn list_recent(&self) -> Vec<SessionRecord>;

    /// Record a user turn: bump activity, count it, and set the title from
    /// the first message unless the session was explicitly renamed.
    async fn record_turn(&self, id: &str, message: &str) -> Result<(), SessionError>;

    /// Explicitly rename a session; the rename survives later turns.
    async fn set_title(&self, id: &str, title: String) -> Result<(), SessionError>;

    /// Delete one session.
    async fn delete(&self, id: &str) -> Result<(), SessionError>;

    /// Mark or clear a pending flush confirmation.
    async fn set_pending_flush(&self, id: &str, pending: bool) -> Result<(), SessionError>;
}

/// In-memory session store.
pub struct InMemorySessionStore {
    inner: RwLock<StoreState>,
}

#[derive(Default)]
struct StoreState {
    sessions: HashMap<String, SessionRecord>,
    // Most recently active last; list_recent reverses.
    order: Vec<String>,
}

impl InMemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreState::default()),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

fn title_preview(message: &str) -> String {
    let trimmed = message.trim();
    let chars: Vec<char> = trimmed.chars().collect();
    if chars.len() > TITLE_PREVIEW_CHARS {
        let mut preview: String = chars[..TITLE_PREVIEW_CHARS].iter().collect();
        preview.push_str("...");
        preview
    } else {
        trimmed.to_string()
    }
}

fn touch_order(order: &mut Vec<String>, id: &str) {
    order.retain(|existing| existing != id);
    order.push(id.to_string());
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, id: Option<String>) -> SessionRecord {
        let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let now = now_unix();
        let record = SessionRecord {
            id: id.clone(),
            title: PLACEHOLDER_TITLE.to_string(),
            created_at: now,
            updated_at: now,
            message_count: 0,
            pending_flush: false,
        };
        let mut state = self.inner.write().await;
        touch_order(&mut state.order, &id);
        state.sessions.insert(id, record.clone());
        record
    }

    async fn get(&self, id: &str) -> Result<SessionRecord, SessionError> {
        let state = self.inner.read().await;
        state.sessions.get(id).cloned().ok_or(SessionError::NotFound)
    }

    async fn list_recent(&self) -> Vec<SessionRecord> {
        let state = self.inner.read().await;
        state
            .order
            .iter()
            .rev()
            .filter_map(|id| state.sessions.get(id).cloned())
            .collect()
    }

    async fn record_turn(&self, id: &str, message: &str) -> Result<(), SessionError> {
        let mut state = self.inner.write().await;
        touch_order(&mut state.order, id);
        let record = state.sessions.get_mut(id).ok_or(SessionError::NotFound)?;
        if record.message_count == 0 && record.title == PLACEHOLDER_TITLE {
            record.title = title_preview(message);
        }
        record.message_count += 1;
        record.updated_at = now_unix();
        Ok(())
    }

    async fn set_title(&self, id: &str, title: String) -> Result<(), SessionError> {
        let mut state = self.inner.write().await;
        let record = state.sessions.get_mut(id).ok_or(SessionError::NotFound)?;
        record.title = title;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), SessionError> {
        let mut state = self.inner.write().await;
        if state.sessions.remove(id).is_none() {
            return Err(SessionError::NotFound);
        }
        state.order.retain(|existing| existing != id);
        Ok(())
    }

    async fn set_pending_flush(&self, id: &str, pending: bool) -> Result<(), SessionError> {
        let mut state = self.inner.write().await;
        let record = state.sessions.get_mut(id).ok_or(SessionError::NotFound)?;
        record.pending_flush = pending;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_and_get_round_trip() {
        let store = InMemorySessionStore::new();
        let record = store.create(None).await;
        let fetched = store.get(&record.id).await.unwrap();
        assert_eq!(fetched.id, record.id);
        assert_eq!(fetched.message_count, 0);
        assert!(!fetched.pending_flush);
    }

    #[tokio::test]
    async fn first_turn_sets_title_preview() {
        let store = InMemorySessionStore::new();
        let record = store.create(None).await;
        let long = "a".repeat(80);
        store.record_turn(&record.id, &long).await.unwrap();
        let fetched = store.get(&record.id).await.unwrap();
        assert_eq!(fetched.title.chars().count(), TITLE_PREVIEW_CHARS + 3);
        assert!(fetched.title.ends_with("..."));
        assert_eq!(fetched.message_count, 1);

        // Second turn leaves the title alone.
        store.record_turn(&record.id, "another message").await.unwrap();
        let fetched = store.get(&record.id).await.unwrap();
        assert!(fetched.title.starts_with("aaa"));
        assert_eq!(fetched.message_count, 2);
    }

    #[tokio::test]
    async fn short_message_is_kept_whole() {
        let store = InMemorySessionStore::new();
        let record = store.create(None).await;
        store.record_turn(&record.id, "  hello there  ").await.unwrap();
        let fetched = store.get(&record.id).await.unwrap();
        assert_eq!(fetched.title, "hello there");
    }

    #[tokio::test]
    async fn list_recent_orders_by_activity() {
        let store = InMemorySessionStore::new();
        let first = store.create(None).await;
        let second = store.create(None).await;
        store.record_turn(&first.id, "bump").await.unwrap();
        let listed = store.list_recent().await;
        assert_eq!(listed[0].id, first.id);
        assert_eq!(listed[1].id, second.id);
    }

    #[tokio::test]
    async fn delete_removes_session() {
        let store = InMemorySessionStore::new();
        let record = store.create(None).await;
        store.delete(&record.id).await.unwrap();
        assert!(matches!(
            store.get(&record.id).await,
            Err(SessionError::NotFound)
        ));
        assert!(matches!(
            store.delete(&record.id).await,
            Err(SessionError::NotFound)
        ));
    }

    #[tokio::test]
    async fn explicit_rename_survives_the_first_turn() {
        let store = InMemorySessionStore::new();
        let record = store.create(None).await;
        store
            .set_title(&record.id, "Research notes".to_string())
            .await
            .unwrap();
        store.record_turn(&record.id, "hello").await.unwrap();
        assert_eq!(store.get(&record.id).await.unwrap().title, "Research notes");
    }

    #[tokio::test]
    async fn pending_flush_flag_round_trips() {
        let store = InMemorySessionStore::new();
        let record = store.create(None).await;
        store.set_pending_flush(&record.id, true).await.unwrap();
        assert!(store.get(&record.id).await.unwrap().pending_flush);
        store.set_pending_flush(&record.id, false).await.unwrap();
        assert!(!store.get(&record.id).await.unwrap().pending_flush);
    }
}
