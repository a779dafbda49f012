//! Conversational agent: moderation, routing, and tool dispatch.

pub mod router;

pub use router::{Command, is_affirmative, route};

use crate::pipeline::RagService;
use crate::safety::{REFUSAL_MESSAGE, SafetyGate, SafetyVerdict};
use crate::session::{SessionError, SessionStore};
use std::sync::Arc;

/// Prompt shown before a flush is executed.
pub const FLUSH_CONFIRMATION_PROMPT: &str =
    "This will permanently delete every document in the knowledge base. Reply 'yes' to confirm.";

/// Message shown when a pending flush is abandoned.
pub const FLUSH_CANCELLED_MESSAGE: &str = "Flush cancelled.";

/// Message shown after a confirmed flush completes.
pub const FLUSH_DONE_MESSAGE: &str = "All documents have been removed from the knowledge base.";

/// Conversational front end over the retrieval pipeline.
///
/// Every turn is moderated before routing; tool failures are rendered as
/// chat messages so a turn never escalates into a transport error.
pub struct Agent {
    gate: SafetyGate,
    rag: Arc<RagService>,
    sessions: Arc<dyn SessionStore>,
}

impl Agent {
    /// Assemble an agent from its collaborators.
    pub fn new(gate: SafetyGate, rag: Arc<RagService>, sessions: Arc<dyn SessionStore>) -> Self {
        Self { gate, rag, sessions }
    }

    /// Session store backing this agent.
    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    /// Retrieval pipeline backing this agent.
    pub fn rag(&self) -> &Arc<RagService> {
        &self.rag
    }

    /// Process one user turn within a session.
    ///
    /// Moderation runs exactly once per turn, before any routing. An unsafe
    /// verdict returns the fixed refusal and never reaches the router; a
    /// classifier failure also refuses, since an unverifiable turn must not
    /// proceed.
    pub async fn handle_turn(
        &self,
        session_id: &str,
        message: &str,
    ) -> Result<String, SessionError> {
        self.sessions.record_turn(session_id, message).await?;

        match self.gate.check(message).await {
            Ok(SafetyVerdict::Safe) => {}
            Ok(SafetyVerdict::Unsafe) => {
                tracing::warn!(session = session_id, "Turn refused by moderation");
                self.clear_pending_flush(session_id).await;
                return Ok(REFUSAL_MESSAGE.to_string());
            }
            Err(err) => {
                tracing::error!(session = session_id, error = %err, "Moderation unavailable; refusing turn");
                self.clear_pending_flush(session_id).await;
                return Ok(REFUSAL_MESSAGE.to_string());
            }
        }

        if self.sessions.get(session_id).await?.pending_flush {
            return self.resolve_pending_flush(session_id, message).await;
        }

        match route(message) {
            Command::Store(path) => Ok(match self.rag.store(&path).await {
                Ok(reply) => reply,
                Err(err) => format!("Could not store documents: {err}"),
            }),
            Command::Query(question) => Ok(match self.rag.query(&question).await {
                Ok(answer) => answer.content,
                Err(err) => format!("Could not answer the question: {err}"),
            }),
            Command::Delete(title) => Ok(match self.rag.delete(&title).await {
                Ok(reply) => reply,
                Err(err) => format!("Could not delete '{title}': {err}"),
            }),
            Command::List => Ok(match self.rag.list_titles().await {
                Ok(titles) if titles.is_empty() => {
                    "The knowledge base is empty.".to_string()
                }
                Ok(titles) => format!("Indexed documents: {}", titles.join(", ")),
                Err(err) => format!("Could not list documents: {err}"),
            }),
            Command::Flush => {
                self.sessions.set_pending_flush(session_id, true).await?;
                Ok(FLUSH_CONFIRMATION_PROMPT.to_string())
            }
        }
    }

    async fn resolve_pending_flush(
        &self,
        session_id: &str,
        message: &str,
    ) -> Result<String, SessionError> {
        self.sessions.set_pending_flush(session_id, false).await?;
        if is_affirmative(message) {
            Ok(match self.rag.flush().await {
                Ok(()) => FLUSH_DONE_MESSAGE.to_string(),
                Err(err) => format!("Could not flush the knowledge base: {err}"),
            })
        } else {
            Ok(FLUSH_CANCELLED_MESSAGE.to_string())
        }
    }

    async fn clear_pending_flush(&self, session_id: &str) {
        if let Err(err) = self.sessions.set_pending_flush(session_id, false).await {
            tracing::debug!(session = session_id, error = %err, "Failed to clear pending flush");
        }
    }
}
