//! API request handlers.
//!
//! This module contains all HTTP request handlers, organized by domain:
//! - `auth`: Login, logout, and token verification
//! - `chat`: The streaming chat relay endpoint
//! - `sessions`: Session CRUD operations
//! - `prompts`: System prompt listing and retrieval
//! - `misc`: Health checks

mod auth;
mod chat;
mod misc;
mod prompts;
mod sessions;

// Re-export all public types and handlers

pub use auth::{LoginRequest, LoginResponse, VerifyResponse, login, logout, verify};

pub use chat::{ChatStreamRequest, chat_stream};

pub use misc::{HealthResponse, health};

pub use prompts::{PromptResponse, get_prompt, list_prompts};

pub use sessions::{
    CreateSessionRequest, DeleteSessionResponse, SessionWithMessages, UpdateSessionRequest,
    create_session, delete_session, get_session, get_session_messages, list_sessions,
    update_session,
};
