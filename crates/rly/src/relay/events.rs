//! Event types on both sides of the relay.
//!
//! Upstream events are the Anthropic streaming protocol, downstream events
//! are this service's own client protocol. Both are closed tagged unions;
//! unknown upstream kinds collapse into [`UpstreamEvent::Ignored`] so a new
//! provider event type can never break an open stream.

use serde::{Deserialize, Serialize};

use crate::chat::TokenUsage;

/// Decoded payload of one upstream SSE frame.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UpstreamEvent {
    MessageStart,
    ContentBlockDelta {
        #[serde(default)]
        delta: Option<ContentDelta>,
    },
    MessageDelta {
        #[serde(default)]
        usage: Option<UsageDelta>,
    },
    MessageStop,
    #[serde(other)]
    Ignored,
}

/// Delta payload of a `content_block_delta` event. Only text deltas carry
/// `text`; tool-use deltas stream `partial_json` instead and are skipped.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentDelta {
    #[serde(default)]
    pub text: Option<String>,
}

/// Usage payload of a `message_delta` event.
#[derive(Debug, Clone, Deserialize)]
pub struct UsageDelta {
    #[serde(default)]
    pub output_tokens: Option<u64>,
}

/// Event written to the downstream client.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum DownstreamEvent {
    #[serde(rename = "sessionId")]
    SessionId {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    #[serde(rename = "start")]
    Start,
    #[serde(rename = "content")]
    Content { content: String },
    #[serde(rename = "tokenUsage")]
    TokenUsage { usage: TokenUsage },
    #[serde(rename = "finalTokenUsage")]
    FinalTokenUsage { usage: TokenUsage },
    #[serde(rename = "stop")]
    Stop,
    #[serde(rename = "error")]
    Error { error: String },
}
