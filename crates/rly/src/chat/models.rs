//! Chat data models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::System => write!(f, "system"),
        }
    }
}

impl std::str::FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "system" => Ok(Self::System),
            _ => Err(format!("Unknown message role: {}", s)),
        }
    }
}

/// A chat session stored in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    /// Opaque identifier (`session_<millis>_<suffix>`)
    pub id: String,
    /// Owning user
    pub user_id: i64,
    /// Display title
    pub title: String,
    /// ISO timestamp
    pub created_at: String,
    /// Bumped on every message append and title change
    pub updated_at: String,
}

/// A message within a session.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    /// Auto-incrementing ID
    pub id: i64,
    /// Owning session
    pub session_id: String,
    /// Message role (user, assistant, system)
    pub role: String,
    /// Message text
    pub content: String,
    /// ISO timestamp
    pub timestamp: String,
    /// JSON metadata blob (token usage for completed assistant turns)
    pub metadata: Option<String>,
}

/// Input for appending a message to a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    /// Message role
    pub role: MessageRole,
    /// Message text
    pub content: String,
    /// Optional metadata
    pub metadata: Option<serde_json::Value>,
}

impl NewMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            metadata: None,
        }
    }

    pub fn assistant(content: impl Into<String>, metadata: Option<serde_json::Value>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            metadata,
        }
    }
}
