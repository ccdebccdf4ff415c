//! User repository for database operations.

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{info, instrument, warn};

use super::models::User;

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a user by ID.
    #[instrument(skip(self))]
    pub async fn get(&self, id: i64) -> Result<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch user")
    }

    /// Get a user by username.
    #[instrument(skip(self))]
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch user by username")
    }

    /// Create a user from a username and an already-computed bcrypt hash.
    #[instrument(skip(self, password_hash))]
    pub async fn create(&self, username: &str, password_hash: &str) -> Result<User> {
        let now = Utc::now().to_rfc3339();
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO users (username, password_hash, created_at) VALUES (?, ?, ?) RETURNING id",
        )
        .bind(username)
        .bind(password_hash)
        .bind(&now)
        .fetch_one(&self.pool)
        .await
        .context("Failed to create user")?;

        self.get(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User not found after creation"))
    }

    /// Count all users.
    #[instrument(skip(self))]
    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count users")?;
        Ok(row.0)
    }

    /// Verify a username/password pair. Returns the user on success, `None`
    /// for unknown users and wrong passwords alike.
    #[instrument(skip(self, password))]
    pub async fn verify_password(&self, username: &str, password: &str) -> Result<Option<User>> {
        let Some(user) = self.get_by_username(username).await? else {
            return Ok(None);
        };
        let valid = bcrypt::verify(password, &user.password_hash)
            .context("Failed to verify password hash")?;
        Ok(valid.then_some(user))
    }

    /// Create the bootstrap account on first boot if it does not exist yet.
    /// Without a configured password a random one is generated and logged
    /// once at startup.
    #[instrument(skip(self, password))]
    pub async fn ensure_bootstrap_user(&self, username: &str, password: Option<&str>) -> Result<()> {
        if self.get_by_username(username).await?.is_some() {
            return Ok(());
        }

        let (password, generated) = match password {
            Some(p) => (p.to_string(), false),
            None => (generate_password(), true),
        };
        let hash =
            bcrypt::hash(&password, bcrypt::DEFAULT_COST).context("Failed to hash password")?;
        self.create(username, &hash).await?;

        if generated {
            warn!(
                "Created bootstrap user '{}' with generated password: {}",
                username, password
            );
        } else {
            info!("Created bootstrap user '{}'", username);
        }
        Ok(())
    }
}

fn generate_password() -> String {
    use rand::Rng;
    // Excludes the ambiguous 0/O/1/l/I.
    const CHARS: &[u8] = b"abcdefghijkmnpqrstuvwxyzABCDEFGHJKLMNPQRSTUVWXYZ23456789";
    let mut rng = rand::rng();
    (0..20)
        .map(|_| CHARS[rng.random_range(0..CHARS.len())] as char)
        .collect()
}
