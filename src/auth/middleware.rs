use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::TokenValidator;
use crate::error::ApiError;

/// Middleware state: the shared validator plus the permission one route needs.
#[derive(Clone)]
pub struct PermissionGuard {
    validator: Arc<TokenValidator>,
    permission: &'static str,
}

impl PermissionGuard {
    pub fn new(validator: Arc<TokenValidator>, permission: &'static str) -> Self {
        Self {
            validator,
            permission,
        }
    }
}

/// Rejects the request with the auth error envelope unless its bearer token
/// grants the guard's permission.
pub async fn require_permission(
    State(guard): State<PermissionGuard>,
    request: Request,
    next: Next,
) -> Response {
    // a header that is not valid ascii is treated as malformed, not missing
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .map(|value| value.to_str().unwrap_or("<non-ascii>"));

    if let Err(e) = guard.validator.verify(authorization, guard.permission) {
        tracing::warn!(
            permission = guard.permission,
            path = %request.uri().path(),
            reason = e.code,
            "rejected request"
        );
        return ApiError::from(e).into_response();
    }

    next.run(request).await
}
