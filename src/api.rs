//! HTTP surface for the conversational service.

use crate::agent::Agent;
use crate::session::{SessionError, SessionRecord};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// Shared state handed to every route handler.
#[derive(Clone)]
pub struct AppState {
    /// Conversational agent processing chat turns.
    pub agent: Arc<Agent>,
}

/// Error wrapper translating domain failures into HTTP responses.
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound => Self {
                status: StatusCode::NOT_FOUND,
                message: "Thread not found".to_string(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

/// Request body for a chat turn.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// User message.
    pub message: String,
    /// Session to continue; omitted to start a new one.
    pub thread_id: Option<String>,
}

/// Response body for a chat turn.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    /// Agent reply.
    pub response: String,
    /// Session the turn was recorded under.
    pub thread_id: String,
}

/// Build the service router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/threads", get(list_threads).post(create_thread))
        .route("/threads/:id", get(get_thread).delete(delete_thread))
        .route("/status", get(status))
        .with_state(state)
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let thread_id = match request.thread_id {
        Some(id) => {
            // Unknown ids are treated as a request to start that thread.
            if state.agent.sessions().get(&id).await.is_err() {
                state.agent.sessions().create(Some(id.clone())).await;
            }
            id
        }
        None => state.agent.sessions().create(None).await.id,
    };

    let response = state.agent.handle_turn(&thread_id, &request.message).await?;
    Ok(Json(ChatResponse {
        response,
        thread_id,
    }))
}

/// Query parameters accepted when listing threads.
#[derive(Debug, Deserialize)]
pub struct ListThreadsQuery {
    /// Maximum number of threads to return, most recent first.
    pub limit: Option<usize>,
}

/// Optional request body when creating a thread.
#[derive(Debug, Default, Deserialize)]
pub struct CreateThreadRequest {
    /// Initial thread title; replaced by the first-message preview later.
    pub title: Option<String>,
}

async fn list_threads(
    State(state): State<AppState>,
    Query(params): Query<ListThreadsQuery>,
) -> Json<Vec<SessionRecord>> {
    let mut threads = state.agent.sessions().list_recent().await;
    if let Some(limit) = params.limit {
        threads.truncate(limit);
    }
    Json(threads)
}

async fn create_thread(
    State(state): State<AppState>,
    request: Option<Json<CreateThreadRequest>>,
) -> Result<(StatusCode, Json<SessionRecord>), AppError> {
    let record = state.agent.sessions().create(None).await;
    if let Some(Json(CreateThreadRequest { title: Some(title) })) = request {
        state.agent.sessions().set_title(&record.id, title).await?;
    }
    let record = state.agent.sessions().get(&record.id).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn get_thread(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionRecord>, AppError> {
    Ok(Json(state.agent.sessions().get(&id).await?))
}

async fn delete_thread(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.agent.sessions().delete(&id).await?;
    Ok(Json(json!({ "success": true })))
}

async fn status(State(state): State<AppState>) -> Json<serde_json::Value> {
    let snapshot = state.agent.rag().metrics_snapshot();
    Json(json!({
        "status": "connected",
        "metrics": snapshot,
    }))
}
