//! Authentication API endpoints.
//!
//! - POST `/login` - Exchange email and password for a token pair
//! - POST `/refresh` - Rotate a refresh token into a new token pair
//! - POST `/logout` - Revoke a refresh token
//! - GET `/verify` - Check a bearer access token

use axum::{
    Json, Router,
    extract::{FromRequestParts, State},
    http::{StatusCode, request::Parts},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::{ApiError, ResultExt};
use crate::auth::{AuthService, BearerAuth, ClientIpHeader, extract_client_ip};
use crate::impl_has_auth_service;
use crate::rate_limit::{RateLimitConfig, rate_limit_login};

#[derive(Clone)]
pub struct AuthState {
    pub auth: AuthService,
    pub ip_header: Option<ClientIpHeader>,
}

impl_has_auth_service!(AuthState);

pub fn router(state: AuthState, rate_limit: RateLimitConfig) -> Router {
    let login_router = Router::new()
        .route("/login", post(login))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(rate_limit, rate_limit_login));

    Router::new()
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/verify", get(verify))
        .with_state(state)
        .merge(login_router)
}

/// Network origin of the caller, as recorded in the login audit log.
struct ClientOrigin(String);

impl FromRequestParts<AuthState> for ClientOrigin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AuthState,
    ) -> Result<Self, Self::Rejection> {
        extract_client_ip(parts, state.ip_header)
            .map(ClientOrigin)
            .map_err(|reason| {
                debug!(reason = %reason, "Could not determine client origin");
                ApiError::forbidden("Unable to determine client IP")
            })
    }
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct RefreshRequest {
    refresh_token: String,
}

#[derive(Serialize)]
struct VerifyResponse {
    user_id: i64,
}

async fn login(
    State(state): State<AuthState>,
    ClientOrigin(origin): ClientOrigin,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tokens = state
        .auth
        .login(payload.email.trim(), &payload.password, &origin)
        .await
        .auth_err("Invalid credentials")?;

    Ok((StatusCode::OK, Json(tokens)))
}

async fn refresh(
    State(state): State<AuthState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tokens = state
        .auth
        .refresh(&payload.refresh_token)
        .await
        .auth_err("Invalid or expired refresh token")?;

    Ok((StatusCode::OK, Json(tokens)))
}

async fn logout(
    State(state): State<AuthState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .auth
        .logout(&payload.refresh_token)
        .await
        .auth_err("Invalid refresh token")?;

    Ok(StatusCode::NO_CONTENT)
}

/// Lightweight check that the presented access token is still valid.
async fn verify(BearerAuth(user_id): BearerAuth) -> impl IntoResponse {
    Json(VerifyResponse { user_id })
}
