//! System prompt handlers.

use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::prompts::{PromptEntry, PromptLookup};

/// A named prompt with its full contents.
#[derive(Debug, Serialize)]
pub struct PromptResponse {
    pub name: String,
    pub content: String,
}

/// List available system prompts.
pub async fn list_prompts(State(state): State<AppState>) -> ApiResult<Json<Vec<PromptEntry>>> {
    let prompts = state
        .prompts
        .list()
        .map_err(|e| ApiError::internal(format!("Failed to list prompts: {}", e)))?;

    Ok(Json(prompts))
}

/// Fetch a single prompt by name.
pub async fn get_prompt(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<PromptResponse>> {
    let lookup = state
        .prompts
        .load(&name)
        .map_err(|e| ApiError::internal(format!("Failed to read prompt: {}", e)))?;

    match lookup {
        PromptLookup::Found(content) => Ok(Json(PromptResponse { name, content })),
        PromptLookup::InvalidName => Err(ApiError::bad_request("Invalid prompt name")),
        PromptLookup::NotFound => Err(ApiError::not_found("Prompt not found")),
    }
}
