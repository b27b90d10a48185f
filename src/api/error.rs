//! Shared error handling for API endpoints.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::auth::AuthError;

/// Extension trait for concise error mapping on Results.
pub trait ResultExt<T> {
    /// Map an [`AuthError`], replacing the client-facing message for the
    /// 401 and 400 cases with `msg`.
    fn auth_err(self, msg: &str) -> Result<T, ApiError>;
}

impl<T> ResultExt<T> for Result<T, AuthError> {
    fn auth_err(self, msg: &str) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::from_auth(msg, e))
    }
}

/// API error type with automatic response conversion.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Forbidden(String),
    Unauthorized(String),
    Internal(String),
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn from_auth(msg: &str, e: AuthError) -> Self {
        match e {
            AuthError::Unauthorized => Self::Unauthorized(msg.into()),
            AuthError::BadRequest => Self::BadRequest(msg.into()),
            AuthError::Unavailable | AuthError::Timeout => {
                error!(error = %e, "{}", msg);
                Self::ServiceUnavailable(e.message().into())
            }
            AuthError::Conflict => {
                error!(error = %e, "{}", msg);
                Self::Internal("Failed to issue token".into())
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
