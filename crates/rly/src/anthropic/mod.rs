//! Upstream Anthropic Messages API client.

pub mod client;
pub mod types;

pub use client::AnthropicClient;
pub use types::{
    ANTHROPIC_VERSION, ChatMessage, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, MessagesRequest, Tool,
};
