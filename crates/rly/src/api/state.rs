//! Application state shared across handlers.

use crate::auth::AuthState;
use crate::chat::ChatService;
use crate::prompts::PromptStore;
use crate::relay::RelayEngine;
use crate::user::UserRepository;

/// Shared state handed to every API handler.
#[derive(Clone)]
pub struct AppState {
    /// JWT validation and issuing.
    pub auth: AuthState,
    /// User lookups for login and verification.
    pub users: UserRepository,
    /// Session and message persistence plus visibility rules.
    pub chat: ChatService,
    /// The streaming chat relay.
    pub relay: RelayEngine,
    /// System prompt files served to the frontend.
    pub prompts: PromptStore,
}

impl AppState {
    pub fn new(
        auth: AuthState,
        users: UserRepository,
        chat: ChatService,
        relay: RelayEngine,
        prompts: PromptStore,
    ) -> Self {
        Self {
            auth,
            users,
            chat,
            relay,
            prompts,
        }
    }
}
