//! Streaming chat relay endpoint.

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::response::Response;
use serde::Deserialize;
use tracing::instrument;

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::auth::CurrentUser;

/// Chat stream request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatStreamRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

/// Relay one chat turn upstream and stream the reply back as SSE.
#[instrument(skip(state, user, request), fields(user_id = user.id()))]
pub async fn chat_stream(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(request): Json<ChatStreamRequest>,
) -> ApiResult<Response<Body>> {
    if request.message.trim().is_empty() {
        return Err(ApiError::bad_request("Message is required"));
    }

    state
        .relay
        .stream_chat(
            user.id(),
            request.message,
            request.session_id,
            request.model,
        )
        .await
}
