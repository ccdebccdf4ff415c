//! Relay engine: one streaming chat turn end to end.
//!
//! The pre-stream phase (session resolution, title policy, history) fails
//! as an ordinary HTTP error. Once the response body starts, every failure
//! is delivered in-band as an `error` event, and the `[DONE]` terminator is
//! written on every path so a client never hangs on an open connection.

use axum::body::Body;
use axum::http::{Response, StatusCode};
use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, info, warn};

use crate::anthropic::{AnthropicClient, ChatMessage, MessagesRequest, Tool};
use crate::api::ApiError;
use crate::chat::models::NewMessage;
use crate::chat::{ChatService, TokenAccountant, TokenUsage};

use super::decoder::{FrameDecoder, StreamFrame};
use super::events::DownstreamEvent;
use super::transform::{RelayAction, dispatch};

/// Client-facing text for any upstream failure. Status codes and bodies
/// stay in the server log.
const UPSTREAM_ERROR_MESSAGE: &str = "Failed to get response from Claude";

const CHANNEL_CAPACITY: usize = 64;

/// Tuning for upstream calls.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub default_model: String,
    pub max_tokens: u32,
    pub web_search: bool,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            default_model: crate::anthropic::DEFAULT_MODEL.to_string(),
            max_tokens: crate::anthropic::DEFAULT_MAX_TOKENS,
            web_search: true,
        }
    }
}

/// Orchestrates one relay call per chat turn.
#[derive(Debug, Clone)]
pub struct RelayEngine {
    chat: ChatService,
    accountant: TokenAccountant,
    client: AnthropicClient,
    settings: RelaySettings,
}

impl RelayEngine {
    pub fn new(
        chat: ChatService,
        accountant: TokenAccountant,
        client: AnthropicClient,
        settings: RelaySettings,
    ) -> Self {
        Self {
            chat,
            accountant,
            client,
            settings,
        }
    }

    /// Run the pre-stream phase and hand the open stream to a relay task.
    pub async fn stream_chat(
        &self,
        user_id: i64,
        message: String,
        session_id: Option<String>,
        model: Option<String>,
    ) -> Result<Response<Body>, ApiError> {
        let session = self
            .chat
            .resolve_for_relay(user_id, session_id.as_deref())
            .await
            .map_err(|e| ApiError::internal(format!("Failed to resolve session: {}", e)))?
            .ok_or_else(|| ApiError::not_found("Session not found or access denied"))?;

        // Title policy runs before the user turn lands so "first user
        // message" means exactly that.
        self.chat
            .apply_title_policy(&session, &message)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to update session title: {}", e)))?;

        self.chat
            .repo()
            .append_message(&session.id, NewMessage::user(message))
            .await
            .map_err(|e| ApiError::internal(format!("Failed to store message: {}", e)))?;

        let history: Vec<ChatMessage> = self
            .chat
            .repo()
            .list_messages(&session.id)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to load history: {}", e)))?
            .into_iter()
            .map(|m| ChatMessage::new(m.role, m.content))
            .collect();

        let (tx, rx) = mpsc::channel::<Bytes>(CHANNEL_CAPACITY);
        let turn = RelayTurn {
            chat: self.chat.clone(),
            accountant: self.accountant.clone(),
            client: self.client.clone(),
            settings: self.settings.clone(),
            session_id: session.id,
            model: model.unwrap_or_else(|| self.settings.default_model.clone()),
            history,
            tx,
            transcript: String::new(),
            output_tokens: 0,
            started: false,
        };
        tokio::spawn(turn.run());

        sse_response(rx)
    }
}

enum TurnOutcome {
    /// Upstream finished the turn (message_stop, terminator, or clean EOF).
    Completed,
    /// Upstream failed; an error event is owed to the client.
    Errored,
    /// The downstream client went away mid-stream.
    ClientGone,
}

/// State of one in-flight turn, owned by its relay task.
struct RelayTurn {
    chat: ChatService,
    accountant: TokenAccountant,
    client: AnthropicClient,
    settings: RelaySettings,
    session_id: String,
    model: String,
    history: Vec<ChatMessage>,
    tx: mpsc::Sender<Bytes>,
    transcript: String,
    output_tokens: u64,
    started: bool,
}

impl RelayTurn {
    async fn run(mut self) {
        let estimate = self.accountant.estimate(&self.history, &self.model).await;

        if !self
            .send(&DownstreamEvent::SessionId {
                session_id: self.session_id.clone(),
            })
            .await
        {
            // Client gone before the first byte; the user turn is already
            // stored and there is nothing to relay.
            return;
        }
        let _ = self
            .send(&DownstreamEvent::TokenUsage {
                usage: estimate.clone(),
            })
            .await;

        match self.relay_upstream().await {
            TurnOutcome::Completed => {
                let final_usage = estimate.with_output(self.output_tokens);
                let _ = self
                    .send(&DownstreamEvent::FinalTokenUsage {
                        usage: final_usage.clone(),
                    })
                    .await;
                let _ = self.send(&DownstreamEvent::Stop).await;
                self.persist_assistant_turn(Some(&final_usage)).await;
                info!(session_id = %self.session_id, "Completed turn: {}", final_usage);
            }
            TurnOutcome::Errored => {
                let _ = self
                    .send(&DownstreamEvent::Error {
                        error: UPSTREAM_ERROR_MESSAGE.to_string(),
                    })
                    .await;
                self.persist_assistant_turn(None).await;
            }
            TurnOutcome::ClientGone => {
                debug!(session_id = %self.session_id, "Client disconnected mid-stream");
                self.persist_assistant_turn(None).await;
            }
        }

        // The terminator closes every stream, error paths included.
        let _ = self.tx.send(Bytes::from_static(b"data: [DONE]\n\n")).await;
    }

    /// Open the upstream call and pump its frames downstream.
    async fn relay_upstream(&mut self) -> TurnOutcome {
        let request = MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.settings.max_tokens,
            messages: self.history.clone(),
            tools: if self.settings.web_search {
                vec![Tool::web_search()]
            } else {
                Vec::new()
            },
            stream: true,
        };

        let response = match self.client.stream_messages(&request).await {
            Ok(response) => response,
            Err(err) => {
                error!(session_id = %self.session_id, "Upstream request failed: {err:#}");
                return TurnOutcome::Errored;
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(session_id = %self.session_id, %status, body = %body, "Upstream returned error status");
            return TurnOutcome::Errored;
        }

        let mut decoder = FrameDecoder::new();
        let mut stream = response.bytes_stream();

        while let Some(next) = stream.next().await {
            let chunk = match next {
                Ok(chunk) => chunk,
                Err(err) => {
                    warn!(session_id = %self.session_id, "Upstream stream interrupted: {err:#}");
                    return TurnOutcome::Errored;
                }
            };

            for frame in decoder.feed(&chunk) {
                match frame {
                    StreamFrame::Done => return TurnOutcome::Completed,
                    StreamFrame::Event(event) => match dispatch(event) {
                        RelayAction::Start => {
                            if !self.started {
                                self.started = true;
                                if !self.send(&DownstreamEvent::Start).await {
                                    return TurnOutcome::ClientGone;
                                }
                            }
                        }
                        RelayAction::Content(text) => {
                            self.transcript.push_str(&text);
                            if !self.send(&DownstreamEvent::Content { content: text }).await {
                                return TurnOutcome::ClientGone;
                            }
                        }
                        RelayAction::OutputTokens(count) => self.output_tokens = count,
                        RelayAction::Complete => return TurnOutcome::Completed,
                        RelayAction::Skip => {}
                    },
                }
            }
        }

        // Upstream closed without an explicit stop; deliver what arrived.
        TurnOutcome::Completed
    }

    /// Store the accumulated assistant text, if any. Errors here must not
    /// disturb what the client already received, so they only get logged.
    async fn persist_assistant_turn(&self, usage: Option<&TokenUsage>) {
        if self.transcript.trim().is_empty() {
            return;
        }
        let metadata = usage.and_then(|u| serde_json::to_value(u).ok());
        if let Err(err) = self
            .chat
            .repo()
            .append_message(
                &self.session_id,
                NewMessage::assistant(self.transcript.clone(), metadata),
            )
            .await
        {
            error!(session_id = %self.session_id, "Failed to store assistant message: {err:#}");
        }
    }

    /// Write one event frame. Returns false once the client is gone.
    async fn send(&self, event: &DownstreamEvent) -> bool {
        let json = match serde_json::to_string(event) {
            Ok(json) => json,
            Err(err) => {
                warn!("Failed to serialize stream event: {err}");
                return true;
            }
        };
        self.tx
            .send(Bytes::from(format!("data: {json}\n\n")))
            .await
            .is_ok()
    }
}

/// Build the streaming response around the relay channel.
fn sse_response(rx: mpsc::Receiver<Bytes>) -> Result<Response<Body>, ApiError> {
    let stream = ReceiverStream::new(rx).map(Ok::<_, std::convert::Infallible>);

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "text/event-stream")
        .header("Cache-Control", "no-cache")
        .header("Connection", "keep-alive")
        .header("X-Accel-Buffering", "no") // Disable nginx buffering if present
        .body(Body::from_stream(stream))
        .map_err(|e| ApiError::internal(format!("Failed to build stream response: {}", e)))
}
