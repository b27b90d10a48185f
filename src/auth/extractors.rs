//! Axum extractors for authentication.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use super::errors::AuthError;
use super::state::HasAuthService;

/// Read the token out of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &axum::http::HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() { None } else { Some(token) }
}

/// Extractor for endpoints that require a valid access token.
///
/// Only the token signature and expiry are checked; no store is consulted.
/// Yields the principal ID the token was issued for.
pub struct BearerAuth(pub i64);

impl<S> FromRequestParts<S> for BearerAuth
where
    S: HasAuthService + Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(AuthError::Unauthorized)?;
        let user_id = state.auth().verify_access(token)?;
        Ok(BearerAuth(user_id))
    }
}
