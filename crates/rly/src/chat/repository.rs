//! Repository for session and message storage.

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::instrument;

use super::models::{Message, NewMessage, Session};

/// Repository for chat database operations.
#[derive(Debug, Clone)]
pub struct ChatRepository {
    pool: SqlitePool,
}

impl ChatRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ========== Session Operations ==========

    /// Create a session with a caller-supplied id.
    #[instrument(skip(self))]
    pub async fn create_session(&self, id: &str, user_id: i64, title: &str) -> Result<Session> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO sessions (id, user_id, title, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(title)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .context("inserting session")?;

        self.get_session(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Session not found after creation"))
    }

    /// Get a session by id.
    #[instrument(skip(self))]
    pub async fn get_session(&self, id: &str) -> Result<Option<Session>> {
        sqlx::query_as::<_, Session>(
            "SELECT id, user_id, title, created_at, updated_at FROM sessions WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("fetching session")
    }

    /// List all sessions, most recently active first.
    #[instrument(skip(self))]
    pub async fn list_sessions(&self) -> Result<Vec<Session>> {
        sqlx::query_as::<_, Session>(
            "SELECT id, user_id, title, created_at, updated_at FROM sessions ORDER BY updated_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .context("listing sessions")
    }

    /// List one user's sessions, most recently active first.
    #[instrument(skip(self))]
    pub async fn list_sessions_for_user(&self, user_id: i64) -> Result<Vec<Session>> {
        sqlx::query_as::<_, Session>(
            r#"
            SELECT id, user_id, title, created_at, updated_at
            FROM sessions
            WHERE user_id = ?
            ORDER BY updated_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .context("listing sessions for user")
    }

    /// Update a session's title and bump its activity timestamp.
    #[instrument(skip(self))]
    pub async fn update_title(&self, id: &str, title: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE sessions SET title = ?, updated_at = ? WHERE id = ?")
            .bind(title)
            .bind(&now)
            .bind(id)
            .execute(&self.pool)
            .await
            .context("updating session title")?;
        Ok(())
    }

    /// Bump a session's activity timestamp.
    #[instrument(skip(self))]
    pub async fn touch_session(&self, id: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE sessions SET updated_at = ? WHERE id = ?")
            .bind(&now)
            .bind(id)
            .execute(&self.pool)
            .await
            .context("touching session")?;
        Ok(())
    }

    /// Delete a session. Messages cascade via the foreign key. Returns
    /// whether a row was actually removed.
    #[instrument(skip(self))]
    pub async fn delete_session(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("deleting session")?;
        Ok(result.rows_affected() > 0)
    }

    // ========== Message Operations ==========

    /// Append a message and bump the owning session's activity timestamp,
    /// so the session list never shows a stale ordering.
    #[instrument(skip(self, message))]
    pub async fn append_message(&self, session_id: &str, message: NewMessage) -> Result<Message> {
        let timestamp = Utc::now().to_rfc3339();
        let role = message.role.to_string();
        let metadata = message.metadata.map(|m| m.to_string());

        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO messages (session_id, role, content, timestamp, metadata)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(session_id)
        .bind(&role)
        .bind(&message.content)
        .bind(&timestamp)
        .bind(&metadata)
        .fetch_one(&self.pool)
        .await
        .context("inserting message")?;

        self.touch_session(session_id).await?;
        self.get_message(id).await
    }

    /// Get a message by ID.
    #[instrument(skip(self))]
    pub async fn get_message(&self, id: i64) -> Result<Message> {
        sqlx::query_as::<_, Message>(
            "SELECT id, session_id, role, content, timestamp, metadata FROM messages WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .context("fetching message")
    }

    /// Get a session's messages in conversation order.
    #[instrument(skip(self))]
    pub async fn list_messages(&self, session_id: &str) -> Result<Vec<Message>> {
        sqlx::query_as::<_, Message>(
            r#"
            SELECT id, session_id, role, content, timestamp, metadata
            FROM messages
            WHERE session_id = ?
            ORDER BY timestamp ASC, id ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .context("fetching messages by session")
    }

    /// Count user-role messages in a session. Drives the first-turn check
    /// of the title policy.
    #[instrument(skip(self))]
    pub async fn count_user_messages(&self, session_id: &str) -> Result<i64> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM messages WHERE session_id = ? AND role = 'user'",
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .context("counting user messages")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::models::MessageRole;
    use crate::db::Database;
    use crate::user::UserRepository;

    async fn setup() -> (ChatRepository, i64) {
        let db = Database::in_memory().await.unwrap();
        let users = UserRepository::new(db.pool().clone());
        let user = users.create("tester", "hash").await.unwrap();
        (ChatRepository::new(db.pool().clone()), user.id)
    }

    #[tokio::test]
    async fn test_session_crud() {
        let (repo, user_id) = setup().await;

        let session = repo
            .create_session("session_1_abc", user_id, "New Session")
            .await
            .unwrap();
        assert_eq!(session.id, "session_1_abc");
        assert_eq!(session.user_id, user_id);
        assert_eq!(session.title, "New Session");

        let fetched = repo.get_session("session_1_abc").await.unwrap().unwrap();
        assert_eq!(fetched.id, session.id);

        repo.update_title("session_1_abc", "Renamed").await.unwrap();
        let renamed = repo.get_session("session_1_abc").await.unwrap().unwrap();
        assert_eq!(renamed.title, "Renamed");
        assert!(renamed.updated_at >= session.updated_at);

        assert!(repo.delete_session("session_1_abc").await.unwrap());
        assert!(!repo.delete_session("session_1_abc").await.unwrap());
        assert!(repo.get_session("session_1_abc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_sessions_orders_by_activity() {
        let (repo, user_id) = setup().await;

        repo.create_session("session_1_aaa", user_id, "First")
            .await
            .unwrap();
        repo.create_session("session_2_bbb", user_id, "Second")
            .await
            .unwrap();

        // Touching the older session moves it to the front.
        repo.touch_session("session_1_aaa").await.unwrap();

        let sessions = repo.list_sessions().await.unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].id, "session_1_aaa");
    }

    #[tokio::test]
    async fn test_append_and_list_messages() {
        let (repo, user_id) = setup().await;
        let session = repo
            .create_session("session_1_abc", user_id, "New Session")
            .await
            .unwrap();

        let first = repo
            .append_message("session_1_abc", NewMessage::user("hello"))
            .await
            .unwrap();
        assert_eq!(first.role, "user");
        assert_eq!(first.content, "hello");
        assert!(first.metadata.is_none());

        let second = repo
            .append_message(
                "session_1_abc",
                NewMessage::assistant("hi there", Some(serde_json::json!({"outputTokens": 3}))),
            )
            .await
            .unwrap();
        assert_eq!(second.role, "assistant");
        assert!(second.metadata.as_deref().unwrap().contains("outputTokens"));

        let messages = repo.list_messages("session_1_abc").await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "hello");
        assert_eq!(messages[1].content, "hi there");

        // Appending bumps the session's activity timestamp.
        let after = repo.get_session("session_1_abc").await.unwrap().unwrap();
        assert!(after.updated_at > session.created_at);
    }

    #[tokio::test]
    async fn test_count_user_messages() {
        let (repo, user_id) = setup().await;
        repo.create_session("session_1_abc", user_id, "New Session")
            .await
            .unwrap();

        assert_eq!(repo.count_user_messages("session_1_abc").await.unwrap(), 0);

        repo.append_message("session_1_abc", NewMessage::user("one"))
            .await
            .unwrap();
        repo.append_message("session_1_abc", NewMessage::assistant("reply", None))
            .await
            .unwrap();
        repo.append_message(
            "session_1_abc",
            NewMessage {
                role: MessageRole::System,
                content: "note".to_string(),
                metadata: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(repo.count_user_messages("session_1_abc").await.unwrap(), 1);
    }
}
