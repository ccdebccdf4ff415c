//! Chat sessions, messages and token accounting.

pub mod models;
pub mod repository;
pub mod service;
pub mod tokens;

pub use models::{Message, MessageRole, NewMessage, Session};
pub use repository::ChatRepository;
pub use service::{ChatService, DEFAULT_SESSION_TITLE};
pub use tokens::{TokenAccountant, TokenUsage, estimate_input_tokens};
