//! Wire types for the Anthropic Messages API.

use serde::{Deserialize, Serialize};

/// Protocol version sent with every request.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Model used when the client does not ask for one.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Hard cap on generated tokens per turn.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// One role/content turn of conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Tool entry advertised to the model.
#[derive(Debug, Clone, Serialize)]
pub struct Tool {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub name: String,
}

impl Tool {
    /// Server-side web search, the only tool this relay advertises.
    pub fn web_search() -> Self {
        Self {
            tool_type: "web_search_20250305".to_string(),
            name: "web_search".to_string(),
        }
    }
}

/// Body of `POST /v1/messages`.
#[derive(Debug, Clone, Serialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
    pub stream: bool,
}

/// Body of `POST /v1/messages/count_tokens`.
#[derive(Debug, Clone, Serialize)]
pub struct CountTokensRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
}

/// Response of the token counting endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct CountTokensResponse {
    pub input_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_request_serializes_with_tools() {
        let req = MessagesRequest {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            messages: vec![ChatMessage::new("user", "hello")],
            tools: vec![Tool::web_search()],
            stream: true,
        };

        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["model"], DEFAULT_MODEL);
        assert_eq!(json["max_tokens"], 4096);
        assert_eq!(json["stream"], true);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["tools"][0]["type"], "web_search_20250305");
        assert_eq!(json["tools"][0]["name"], "web_search");
    }

    #[test]
    fn messages_request_omits_empty_tools() {
        let req = MessagesRequest {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            messages: vec![ChatMessage::new("user", "hello")],
            tools: Vec::new(),
            stream: true,
        };

        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("tools").is_none());
    }

    #[test]
    fn count_tokens_response_deserializes() {
        let resp: CountTokensResponse = serde_json::from_str(r#"{"input_tokens": 42}"#).unwrap();
        assert_eq!(resp.input_tokens, 42);
    }
}
