//! HTTP client for the Anthropic Messages API.

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::debug;

use super::types::{
    ANTHROPIC_VERSION, ChatMessage, CountTokensRequest, CountTokensResponse, MessagesRequest,
};

/// Client for the upstream Messages API. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    request_timeout: Duration,
}

impl AnthropicClient {
    /// Build a client. `request_timeout` bounds non-streaming calls only;
    /// streaming responses stay open as long as the model keeps talking.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("building HTTP client")?;

        let base_url = base_url.into();
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            request_timeout,
        })
    }

    /// Open a streaming Messages call. Returns the raw response without
    /// checking the status; the caller decides how to surface upstream
    /// failures to its own client.
    pub async fn stream_messages(&self, request: &MessagesRequest) -> Result<reqwest::Response> {
        debug!(model = %request.model, messages = request.messages.len(), "opening upstream stream");
        self.http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await
            .context("sending messages request")
    }

    /// Authoritative input-token count for a conversation.
    pub async fn count_tokens(&self, model: &str, messages: &[ChatMessage]) -> Result<u64> {
        let request = CountTokensRequest { model, messages };
        let response = self
            .http
            .post(format!("{}/v1/messages/count_tokens", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .timeout(self.request_timeout)
            .json(&request)
            .send()
            .await
            .context("sending count_tokens request")?
            .error_for_status()
            .context("count_tokens request failed")?;

        let body: CountTokensResponse = response
            .json()
            .await
            .context("decoding count_tokens response")?;
        Ok(body.input_tokens)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
