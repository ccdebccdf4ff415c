//! JWT claims.

use serde::{Deserialize, Serialize};

/// Claims carried in every issued token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: i64,
    /// Username at issue time.
    pub username: String,
    /// Issued at (unix seconds).
    pub iat: i64,
    /// Expiry (unix seconds).
    pub exp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_roundtrip() {
        let claims = Claims {
            sub: 7,
            username: "alice".to_string(),
            iat: 1_700_000_000,
            exp: 1_700_604_800,
        };

        let json = serde_json::to_string(&claims).unwrap();
        let back: Claims = serde_json::from_str(&json).unwrap();
        assert_eq!(back.sub, 7);
        assert_eq!(back.username, "alice");
        assert_eq!(back.exp, claims.exp);
    }
}
