//! Chat session endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{ChatSnapshot, SendOutcome};

use super::error::ApiError;
use super::state::AppState;

#[derive(Debug, Serialize)]
pub struct ChatView {
    pub id: Uuid,
    #[serde(flatten)]
    pub snapshot: ChatSnapshot,
}

#[derive(Debug, Deserialize)]
pub struct SendBody {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub outcome: SendOutcome,
    #[serde(flatten)]
    pub snapshot: ChatSnapshot,
}

async fn open(State(state): State<AppState>) -> (StatusCode, Json<ChatView>) {
    let (id, session) = state.chats.insert(state.new_chat()).await;
    tracing::debug!(%id, "chat session opened");
    (
        StatusCode::CREATED,
        Json(ChatView {
            id,
            snapshot: session.snapshot(),
        }),
    )
}

async fn show(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ChatView>, ApiError> {
    let session = state.chats.get(id).await.ok_or_else(|| ApiError::not_found("chat"))?;
    Ok(Json(ChatView {
        id,
        snapshot: session.snapshot(),
    }))
}

async fn send(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<SendBody>,
) -> Result<Json<SendResponse>, ApiError> {
    let session = state.chats.get(id).await.ok_or_else(|| ApiError::not_found("chat"))?;
    let outcome = session.send(&body.text).await;
    Ok(Json(SendResponse {
        outcome,
        snapshot: session.snapshot(),
    }))
}

async fn reset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ChatView>, ApiError> {
    let session = state.chats.get(id).await.ok_or_else(|| ApiError::not_found("chat"))?;
    session.reset();
    Ok(Json(ChatView {
        id,
        snapshot: session.snapshot(),
    }))
}

async fn close(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if state.chats.remove(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("chat"))
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/chat", post(open))
        .route("/v1/chat/:id", get(show).delete(close))
        .route("/v1/chat/:id/messages", post(send))
        .route("/v1/chat/:id/reset", post(reset))
}
