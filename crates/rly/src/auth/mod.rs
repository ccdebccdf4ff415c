//! Authentication module.
//!
//! HS256 JWT issuance and validation, with token extraction from the
//! Authorization header or the `auth_token` cookie.

mod claims;
mod config;
mod error;
mod middleware;

pub use claims::Claims;
pub use config::{AuthConfig, ConfigValidationError};
pub use error::AuthError;
pub use middleware::{AuthState, CurrentUser, auth_middleware};
