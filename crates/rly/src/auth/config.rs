//! Authentication configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum accepted HS256 secret length, in bytes.
const MIN_SECRET_LEN: usize = 32;

/// Auth section of the application config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 signing secret. Supports `env:VAR_NAME` indirection so the
    /// secret itself never has to live in the config file.
    pub jwt_secret: Option<String>,

    /// Token lifetime in hours.
    pub token_ttl_hours: u64,

    /// Dev mode: relaxed CORS and an ephemeral secret when none is set.
    pub dev_mode: bool,

    /// Origins allowed by CORS.
    pub allowed_origins: Vec<String>,

    /// Account created on first boot when the users table is empty of it.
    pub bootstrap_username: String,

    /// Password for the bootstrap account. When unset a random password is
    /// generated and logged once.
    pub bootstrap_password: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: Some("env:RLY_JWT_SECRET".to_string()),
            token_ttl_hours: 24 * 7,
            dev_mode: false,
            allowed_origins: Vec::new(),
            bootstrap_username: "admin".to_string(),
            bootstrap_password: None,
        }
    }
}

/// Validation failures for [`AuthConfig`].
#[derive(Debug, Error)]
pub enum ConfigValidationError {
    #[error("no JWT secret configured (set auth.jwt_secret or enable dev_mode)")]
    MissingJwtSecret,

    #[error("JWT secret env var {0} is not set")]
    JwtSecretEnvMissing(String),

    #[error("JWT secret too short: {0} bytes (minimum {MIN_SECRET_LEN})")]
    WeakJwtSecret(usize),
}

impl AuthConfig {
    /// Resolve `env:VAR` indirection in the configured secret.
    pub fn resolve_jwt_secret(&self) -> Result<Option<String>, ConfigValidationError> {
        match self.jwt_secret.as_deref() {
            None => Ok(None),
            Some(value) => match value.strip_prefix("env:") {
                None => Ok(Some(value.to_string())),
                Some(var) => match std::env::var(var) {
                    Ok(secret) if !secret.is_empty() => Ok(Some(secret)),
                    _ => Err(ConfigValidationError::JwtSecretEnvMissing(var.to_string())),
                },
            },
        }
    }

    /// Check the config is usable. Dev mode tolerates a missing secret
    /// (an ephemeral one gets generated); production does not.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let secret = match self.resolve_jwt_secret() {
            Ok(secret) => secret,
            Err(_) if self.dev_mode => None,
            Err(err) => return Err(err),
        };

        match secret {
            Some(s) if s.len() < MIN_SECRET_LEN => {
                Err(ConfigValidationError::WeakJwtSecret(s.len()))
            }
            Some(_) => Ok(()),
            None if self.dev_mode => Ok(()),
            None => Err(ConfigValidationError::MissingJwtSecret),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_secret_resolves() {
        let config = AuthConfig {
            jwt_secret: Some("a-literal-secret-of-sufficient-length!!".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.resolve_jwt_secret().unwrap().as_deref(),
            Some("a-literal-secret-of-sufficient-length!!")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_indirection_missing_var() {
        let config = AuthConfig {
            jwt_secret: Some("env:RLY_TEST_SECRET_THAT_DOES_NOT_EXIST".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            config.resolve_jwt_secret(),
            Err(ConfigValidationError::JwtSecretEnvMissing(_))
        ));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_dev_mode_tolerates_missing_secret() {
        let config = AuthConfig {
            jwt_secret: None,
            dev_mode: true,
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        let prod = AuthConfig {
            jwt_secret: None,
            dev_mode: false,
            ..Default::default()
        };
        assert!(matches!(
            prod.validate(),
            Err(ConfigValidationError::MissingJwtSecret)
        ));
    }

    #[test]
    fn test_short_secret_rejected() {
        let config = AuthConfig {
            jwt_secret: Some("too-short".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::WeakJwtSecret(9))
        ));
    }
}
