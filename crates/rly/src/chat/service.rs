//! Session resolution and title policy.

use anyhow::Result;
use chrono::Utc;
use tracing::{debug, instrument};

use super::models::Session;
use super::repository::ChatRepository;

/// Placeholder title for sessions that have not earned one yet.
pub const DEFAULT_SESSION_TITLE: &str = "New Session";

/// Alphabet for the random part of session ids.
const SESSION_ID_ALPHABET: [char; 36] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h',
    'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

/// Session management: resolution, ownership, visibility, titles.
#[derive(Debug, Clone)]
pub struct ChatService {
    repo: ChatRepository,
    shared_sessions: bool,
    title_max_chars: usize,
}

impl ChatService {
    pub fn new(repo: ChatRepository, shared_sessions: bool, title_max_chars: usize) -> Self {
        Self {
            repo,
            shared_sessions,
            title_max_chars,
        }
    }

    pub fn repo(&self) -> &ChatRepository {
        &self.repo
    }

    /// Synthesize a session id: current time plus a random suffix. The
    /// primary key rejects the (practically unreachable) collision case
    /// instead of silently reusing a session.
    pub fn new_session_id() -> String {
        format!(
            "session_{}_{}",
            Utc::now().timestamp_millis(),
            nanoid::nanoid!(9, &SESSION_ID_ALPHABET)
        )
    }

    /// Resolve the session a relay call operates on. With no requested id a
    /// fresh session is created for the caller. A requested id resolves only
    /// when it exists and the caller owns it; anything else is `None` so the
    /// relay cannot write into foreign sessions.
    #[instrument(skip(self))]
    pub async fn resolve_for_relay(
        &self,
        user_id: i64,
        requested: Option<&str>,
    ) -> Result<Option<Session>> {
        match requested {
            Some(id) => {
                let session = self.repo.get_session(id).await?;
                Ok(session.filter(|s| s.user_id == user_id))
            }
            None => {
                let id = Self::new_session_id();
                let session = self
                    .repo
                    .create_session(&id, user_id, DEFAULT_SESSION_TITLE)
                    .await?;
                debug!(session_id = %session.id, "created session");
                Ok(Some(session))
            }
        }
    }

    /// Fetch a session under the read-visibility rules: with shared sessions
    /// every authenticated caller may read, otherwise only the owner.
    pub async fn visible_session(&self, user_id: i64, id: &str) -> Result<Option<Session>> {
        let session = self.repo.get_session(id).await?;
        if self.shared_sessions {
            Ok(session)
        } else {
            Ok(session.filter(|s| s.user_id == user_id))
        }
    }

    /// List sessions under the read-visibility rules.
    pub async fn list_visible_sessions(&self, user_id: i64) -> Result<Vec<Session>> {
        if self.shared_sessions {
            self.repo.list_sessions().await
        } else {
            self.repo.list_sessions_for_user(user_id).await
        }
    }

    /// Create a session with an explicit title (the sessions API; the relay
    /// path goes through [`Self::resolve_for_relay`]).
    pub async fn create_session(&self, user_id: i64, title: &str) -> Result<Session> {
        let id = Self::new_session_id();
        self.repo.create_session(&id, user_id, title).await
    }

    /// Derive a title from the first user turn. Applies at most once per
    /// session: only while the title is still the placeholder, only before
    /// any user message exists, and never for control messages starting
    /// with `#`. Runs before the user turn is persisted.
    #[instrument(skip(self, session, message), fields(session_id = %session.id))]
    pub async fn apply_title_policy(&self, session: &Session, message: &str) -> Result<()> {
        if session.title != DEFAULT_SESSION_TITLE {
            return Ok(());
        }
        if message.starts_with('#') {
            return Ok(());
        }
        if self.repo.count_user_messages(&session.id).await? != 0 {
            return Ok(());
        }

        let title = self.sanitize_title(message);
        if title.is_empty() {
            return Ok(());
        }

        debug!(title = %title, "derived session title");
        self.repo.update_title(&session.id, &title).await
    }

    /// Keep word characters, whitespace and light punctuation, collapse
    /// whitespace runs, and cut at the configured length.
    fn sanitize_title(&self, raw: &str) -> String {
        let kept: String = raw
            .chars()
            .filter(|c| {
                c.is_alphanumeric() || *c == '_' || c.is_whitespace() || "-.,!?()".contains(*c)
            })
            .collect();
        let collapsed = kept.split_whitespace().collect::<Vec<_>>().join(" ");
        collapsed.chars().take(self.title_max_chars).collect()
    }
}
