//! Test utilities and common setup.
#![allow(clippy::field_reassign_with_default)]
#![allow(dead_code)]

use std::path::PathBuf;
use std::time::Duration;

use axum::Router;
use rly::anthropic::AnthropicClient;
use rly::api::{self, AppState};
use rly::auth::{AuthConfig, AuthState};
use rly::chat::{ChatRepository, ChatService, TokenAccountant};
use rly::db::Database;
use rly::prompts::PromptStore;
use rly::relay::{RelayEngine, RelaySettings};
use rly::user::{User, UserRepository};

/// Password used for every account the harness creates.
pub const TEST_PASSWORD: &str = "testpassword123";

/// Create a test AuthConfig with a JWT secret for testing.
fn test_auth_config() -> AuthConfig {
    let mut config = AuthConfig::default();
    config.dev_mode = true;
    // Set a JWT secret for tests (required for token generation)
    config.jwt_secret = Some("test-secret-for-integration-tests-minimum-32-chars".to_string());
    config
}

/// Knobs for building a test backend.
pub struct TestOptions {
    /// Base URL for the upstream Messages API. Point this at a mock server
    /// for streaming tests; the default refuses connections.
    pub upstream_url: String,
    /// Whether authenticated users can read each other's sessions.
    pub shared_sessions: bool,
    /// Directory served by the prompts endpoints.
    pub prompts_dir: Option<PathBuf>,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            upstream_url: "http://127.0.0.1:9".to_string(),
            shared_sessions: true,
            prompts_dir: None,
        }
    }
}

/// A fully wired backend over an in-memory database, with handles to the
/// layers tests assert against directly.
pub struct TestBackend {
    pub router: Router,
    pub db: Database,
    pub auth: AuthState,
    pub users: UserRepository,
    pub chat: ChatRepository,
}

impl TestBackend {
    /// Create a user with [`TEST_PASSWORD`] and mint a bearer token for them.
    pub async fn user_with_token(&self, username: &str) -> (User, String) {
        let hash = bcrypt::hash(TEST_PASSWORD, bcrypt::DEFAULT_COST).unwrap();
        let user = self.users.create(username, &hash).await.unwrap();
        let token = self.auth.generate_token(user.id, &user.username).unwrap();
        (user, token)
    }
}

/// Create a test backend with all services initialized.
pub async fn test_backend(options: TestOptions) -> TestBackend {
    // Use in-memory database for tests
    let db = Database::in_memory().await.unwrap();

    let auth = AuthState::new(test_auth_config());
    let users = UserRepository::new(db.pool().clone());
    let chat = ChatRepository::new(db.pool().clone());
    let service = ChatService::new(chat.clone(), options.shared_sessions, 50);

    let client =
        AnthropicClient::new(options.upstream_url, "test-key", Duration::from_secs(5)).unwrap();
    let relay = RelayEngine::new(
        service.clone(),
        TokenAccountant::new(client.clone()),
        client,
        RelaySettings::default(),
    );

    let prompts_dir = options
        .prompts_dir
        .unwrap_or_else(|| std::env::temp_dir().join("rly-tests-no-prompts"));
    let prompts = PromptStore::new(prompts_dir);

    let state = AppState::new(auth.clone(), users.clone(), service, relay, prompts);

    TestBackend {
        router: api::create_router(state),
        db,
        auth,
        users,
        chat,
    }
}

/// Create a test application with default options.
pub async fn test_app() -> Router {
    test_backend(TestOptions::default()).await.router
}

/// Create a test application plus a valid token for a fresh user.
pub async fn test_app_with_token() -> (Router, String) {
    let backend = test_backend(TestOptions::default()).await;
    let (_, token) = backend.user_with_token("alice").await;
    (backend.router, token)
}
