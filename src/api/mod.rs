mod auth;
mod error;

use axum::Router;

use crate::auth::{AuthService, ClientIpHeader};
use crate::rate_limit::RateLimitConfig;

pub use auth::AuthState;
pub use error::ApiError;

/// Create the API router.
pub fn create_api_router(
    auth: AuthService,
    ip_header: Option<ClientIpHeader>,
    rate_limit: RateLimitConfig,
) -> Router {
    let auth_state = auth::AuthState { auth, ip_header };

    Router::new().nest("/auth", auth::router(auth_state, rate_limit))
}
