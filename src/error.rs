use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::api::ErrorResponse;
use crate::auth::AuthError;
use crate::pagination::PaginationError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("database error: {0}")]
    Database(#[from] libsql::Error),
    #[error("invalid stored value: {0}")]
    Corrupt(String),
}

/// Everything a handler can fail with. Rendered as
/// `{"success": false, "error": <status>, "message": <text>}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("resource not found")]
    NotFound,
    #[error("bad request")]
    BadRequest,
    #[error("unprocessable")]
    Unprocessable,
    #[error("The method is not allowed for the requested URL")]
    MethodNotAllowed,
    #[error("Internal Server Error")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        use ApiError::*;
        match self {
            Auth(e) => e.status,
            NotFound => StatusCode::NOT_FOUND,
            BadRequest => StatusCode::BAD_REQUEST,
            Unprocessable => StatusCode::UNPROCESSABLE_ENTITY,
            MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Auth(e) => e.description.clone(),
            other => other.to_string(),
        }
    }

    /// Maps a failed create/update/delete. Unresolved ids stay 404, anything
    /// else becomes 422 after the cause is logged.
    pub fn from_mutation(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => {
                tracing::info!(entity, id, "mutation referenced a missing row");
                ApiError::NotFound
            }
            other => {
                tracing::error!(error = %crate::unpack_error(&other), "mutation failed");
                ApiError::Unprocessable
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => ApiError::NotFound,
            other => {
                tracing::error!(error = %crate::unpack_error(&other), "read failed");
                ApiError::Internal
            }
        }
    }
}

impl From<PaginationError> for ApiError {
    fn from(err: PaginationError) -> Self {
        tracing::info!(error = %err, "rejected pagination query");
        ApiError::BadRequest
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse::new(status, self.message());
        (status, Json(body)).into_response()
    }
}
