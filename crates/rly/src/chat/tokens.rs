//! Token accounting for conversation turns.
//!
//! Input counts come from the upstream counting endpoint when it answers,
//! else from a deterministic offline heuristic. Output counts arrive
//! mid-stream from usage deltas and are folded in at completion.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::anthropic::{AnthropicClient, ChatMessage};

const CHARS_PER_TOKEN: u64 = 4;
const MESSAGE_OVERHEAD_TOKENS: u64 = 4;
const SYSTEM_OVERHEAD_TOKENS: u64 = 3;

/// Token usage for one turn, in the client's wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub input_tokens: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_tokens: Option<u64>,
    pub total_tokens: u64,
    pub message_count: u64,
}

impl TokenUsage {
    /// Usage before any output exists: total equals input.
    pub fn from_input(input_tokens: u64, message_count: u64) -> Self {
        Self {
            input_tokens,
            output_tokens: None,
            total_tokens: input_tokens,
            message_count,
        }
    }

    /// Fold in the streamed output count, keeping the total invariant.
    pub fn with_output(mut self, output_tokens: u64) -> Self {
        self.output_tokens = Some(output_tokens);
        self.total_tokens = self.input_tokens + output_tokens;
        self
    }
}

impl fmt::Display for TokenUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.output_tokens {
            Some(out) => write!(
                f,
                "{} tokens ({} in, {} out, {} messages)",
                self.total_tokens, self.input_tokens, out, self.message_count
            ),
            None => write!(
                f,
                "{} input tokens ({} messages)",
                self.input_tokens, self.message_count
            ),
        }
    }
}

/// Computes pre-call input estimates.
#[derive(Debug, Clone)]
pub struct TokenAccountant {
    client: AnthropicClient,
}

impl TokenAccountant {
    pub fn new(client: AnthropicClient) -> Self {
        Self { client }
    }

    /// Estimate input usage for a conversation. Never fails: when the
    /// counting endpoint is unreachable the offline heuristic answers.
    pub async fn estimate(&self, messages: &[ChatMessage], model: &str) -> TokenUsage {
        let message_count = messages.len() as u64;
        match self.client.count_tokens(model, messages).await {
            Ok(input) => TokenUsage::from_input(input, message_count),
            Err(err) => {
                warn!("Token counting unavailable, using offline estimate: {err:#}");
                TokenUsage::from_input(estimate_input_tokens(messages), message_count)
            }
        }
    }
}

/// Deterministic offline estimate: roughly four characters per token, plus
/// fixed per-message and per-request framing overhead.
pub fn estimate_input_tokens(messages: &[ChatMessage]) -> u64 {
    let per_message: u64 = messages
        .iter()
        .map(|m| (m.content.chars().count() as u64).div_ceil(CHARS_PER_TOKEN) + MESSAGE_OVERHEAD_TOKENS)
        .sum();
    per_message + SYSTEM_OVERHEAD_TOKENS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(content: &str) -> ChatMessage {
        ChatMessage::new("user", content)
    }

    #[test]
    fn test_estimate_is_deterministic() {
        let history = vec![msg("Hello there"), msg("How are you today?")];
        assert_eq!(estimate_input_tokens(&history), estimate_input_tokens(&history));
    }

    #[test]
    fn test_estimate_known_values() {
        // 4 chars -> 1 content token, + 4 message overhead + 3 system overhead.
        assert_eq!(estimate_input_tokens(&[msg("abcd")]), 8);
        // Empty content still pays the framing overhead.
        assert_eq!(estimate_input_tokens(&[msg("")]), 7);
        // 5 chars round up to 2 content tokens.
        assert_eq!(estimate_input_tokens(&[msg("abcde")]), 9);
    }

    #[test]
    fn test_estimate_counts_chars_not_bytes() {
        // "héllo" is 5 chars but 6 bytes; both sides must see 5.
        assert_eq!(
            estimate_input_tokens(&[msg("h\u{e9}llo")]),
            estimate_input_tokens(&[msg("hello")])
        );
    }

    #[test]
    fn test_total_tokens_invariant() {
        let usage = TokenUsage::from_input(100, 3);
        assert_eq!(usage.total_tokens, 100);
        assert!(usage.output_tokens.is_none());

        let finished = usage.with_output(25);
        assert_eq!(finished.output_tokens, Some(25));
        assert_eq!(
            finished.total_tokens,
            finished.input_tokens + finished.output_tokens.unwrap()
        );
    }

    #[test]
    fn test_wire_shape_is_camel_case() {
        let usage = TokenUsage::from_input(10, 2);
        let json = serde_json::to_value(&usage).unwrap();
        assert_eq!(json["inputTokens"], 10);
        assert_eq!(json["totalTokens"], 10);
        assert_eq!(json["messageCount"], 2);
        assert!(json.get("outputTokens").is_none());

        let json = serde_json::to_value(usage.with_output(5)).unwrap();
        assert_eq!(json["outputTokens"], 5);
        assert_eq!(json["totalTokens"], 15);
    }

    #[test]
    fn test_display_formats() {
        let usage = TokenUsage::from_input(10, 2);
        assert_eq!(usage.to_string(), "10 input tokens (2 messages)");
        assert_eq!(
            usage.with_output(5).to_string(),
            "15 tokens (10 in, 5 out, 2 messages)"
        );
    }
}
