//! Bearer-token authorization.
//!
//! [`TokenValidator`] checks a token against the configured signing keys and
//! its `permissions` claim. [`require_permission`] wraps a route so that the
//! check runs before any extractor of the handler.

mod middleware;
mod validator;

pub use middleware::{PermissionGuard, require_permission};
pub use validator::TokenValidator;

use axum::http::StatusCode;

/// A rejected request. `code` is the machine-readable reason, `description`
/// ends up in the error envelope.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {description}")]
pub struct AuthError {
    pub status: StatusCode,
    pub code: &'static str,
    pub description: String,
}

impl AuthError {
    fn new(status: StatusCode, code: &'static str, description: impl Into<String>) -> Self {
        AuthError {
            status,
            code,
            description: description.into(),
        }
    }

    pub fn header_missing() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "authorization_header_missing",
            "Authorization header is expected.",
        )
    }

    pub fn invalid_header(description: &str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "invalid_header", description)
    }

    pub fn token_expired() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "token_expired", "Token expired.")
    }

    pub fn invalid_claims() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "invalid_claims",
            "Incorrect claims. Please, check the audience and issuer.",
        )
    }

    pub fn permissions_missing() -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            "invalid_claims",
            "Permissions not included in JWT.",
        )
    }

    pub fn permission_not_found() -> Self {
        Self::new(StatusCode::FORBIDDEN, "unauthorized", "Permission not found.")
    }
}
