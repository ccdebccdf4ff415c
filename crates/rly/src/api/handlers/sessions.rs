//! Session CRUD handlers.
//!
//! Reads respect the shared-session visibility rules; title updates and
//! deletion are always restricted to the owner.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::auth::CurrentUser;
use crate::chat::{Message, Session};

/// Create session request.
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub title: String,
}

/// Update session request.
#[derive(Debug, Deserialize)]
pub struct UpdateSessionRequest {
    pub title: String,
}

/// A session together with its messages.
#[derive(Debug, Serialize)]
pub struct SessionWithMessages {
    pub session: Session,
    pub messages: Vec<Message>,
}

/// Delete confirmation.
#[derive(Debug, Serialize)]
pub struct DeleteSessionResponse {
    pub message: String,
}

/// List sessions visible to the caller, most recently updated first.
pub async fn list_sessions(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<Vec<Session>>> {
    let sessions = state.chat.list_visible_sessions(user.id()).await?;
    Ok(Json(sessions))
}

/// Create a new session.
#[instrument(skip(state, user, request), fields(user_id = user.id()))]
pub async fn create_session(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<CreateSessionRequest>,
) -> ApiResult<impl IntoResponse> {
    let title = request.title.trim();
    if title.is_empty() {
        return Err(ApiError::bad_request("Session title is required"));
    }

    let session = state.chat.create_session(user.id(), title).await?;
    info!(session_id = %session.id, "Created session");

    Ok((StatusCode::CREATED, Json(session)))
}

/// Fetch a single session together with its messages.
pub async fn get_session(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(session_id): Path<String>,
) -> ApiResult<Json<SessionWithMessages>> {
    let session = state
        .chat
        .visible_session(user.id(), &session_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Session not found"))?;

    let messages = state.chat.repo().list_messages(&session.id).await?;

    Ok(Json(SessionWithMessages { session, messages }))
}

/// Fetch just the messages of a session.
pub async fn get_session_messages(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(session_id): Path<String>,
) -> ApiResult<Json<Vec<Message>>> {
    let session = state
        .chat
        .visible_session(user.id(), &session_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Session not found"))?;

    let messages = state.chat.repo().list_messages(&session.id).await?;

    Ok(Json(messages))
}

/// Rename a session. Only the owner may change the title.
#[instrument(skip(state, user, request), fields(user_id = user.id()))]
pub async fn update_session(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(session_id): Path<String>,
    Json(request): Json<UpdateSessionRequest>,
) -> ApiResult<Json<Session>> {
    let title = request.title.trim();
    if title.is_empty() {
        return Err(ApiError::bad_request("Session title is required"));
    }

    let session = state
        .chat
        .repo()
        .get_session(&session_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Session not found"))?;

    if session.user_id != user.id() {
        return Err(ApiError::forbidden("Access denied"));
    }

    state.chat.repo().update_title(&session_id, title).await?;

    let updated = state
        .chat
        .repo()
        .get_session(&session_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Session not found"))?;

    Ok(Json(updated))
}

/// Delete a session and its messages. Only the owner may delete it.
#[instrument(skip(state, user), fields(user_id = user.id()))]
pub async fn delete_session(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(session_id): Path<String>,
) -> ApiResult<Json<DeleteSessionResponse>> {
    let session = state
        .chat
        .repo()
        .get_session(&session_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Session not found"))?;

    if session.user_id != user.id() {
        return Err(ApiError::forbidden("Access denied"));
    }

    state.chat.repo().delete_session(&session_id).await?;
    info!(session_id = %session_id, "Deleted session");

    Ok(Json(DeleteSessionResponse {
        message: "Session deleted successfully".to_string(),
    }))
}
