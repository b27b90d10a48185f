//! Authentication error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::store::StoreError;

/// Terminal outcome of a failed auth operation.
///
/// `Unauthorized` deliberately carries no reason: an unknown identity, a wrong
/// password and an inactive account look the same to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// Bad credentials, inactive account, or an unknown/expired/rotated refresh token
    Unauthorized,
    /// Logout of a refresh token that does not exist
    BadRequest,
    /// A store call failed
    Unavailable,
    /// A store call did not finish within the configured timeout
    Timeout,
    /// A freshly minted refresh token collided with an existing one, repeatedly
    Conflict,
}

impl AuthError {
    pub fn message(&self) -> &'static str {
        match self {
            AuthError::Unauthorized => "Unauthorized",
            AuthError::BadRequest => "Bad request",
            AuthError::Unavailable => "Service unavailable",
            AuthError::Timeout => "Service timed out",
            AuthError::Conflict => "Token conflict",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
            AuthError::BadRequest => StatusCode::BAD_REQUEST,
            AuthError::Unavailable | AuthError::Timeout => StatusCode::SERVICE_UNAVAILABLE,
            AuthError::Conflict => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for AuthError {}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict => AuthError::Conflict,
            StoreError::Unavailable(_) => AuthError::Unavailable,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: &'static str,
        }

        (
            self.status_code(),
            Json(ErrorResponse {
                error: self.message(),
            }),
        )
            .into_response()
    }
}
