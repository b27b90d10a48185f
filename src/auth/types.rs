//! Records exchanged between the auth service and its stores.

use std::time::Duration;

use serde::Serialize;

use crate::jwt::DEFAULT_REFRESH_TTL_SECS;

/// The identity tokens are issued for. Owned by the user store; read-only here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub id: i64,
    pub active: bool,
}

/// A principal together with the password hash needed to authenticate it.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub principal: Principal,
    pub password_hash: String,
}

/// A persisted refresh token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub token: String,
    pub owner: i64,
    /// Unix seconds
    pub expires_at: u64,
    /// Unix seconds
    pub created_at: u64,
}

impl SessionRecord {
    pub fn is_expired(&self, now: u64) -> bool {
        self.expires_at <= now
    }
}

/// A single login attempt, keyed by the identity the caller claimed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginAttempt {
    pub identity: String,
    pub origin: String,
    pub success: bool,
    /// Unix seconds
    pub attempted_at: u64,
}

/// Token pair returned by login and refresh.
#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    /// Access token lifetime in seconds
    pub expires_in: u64,
}

impl TokenResponse {
    pub fn bearer(access_token: String, refresh_token: String, expires_in: u64) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "bearer",
            expires_in,
        }
    }
}

/// Lifetimes and I/O bounds for the auth service.
#[derive(Debug, Clone, Copy)]
pub struct AuthConfig {
    /// Refresh token lifetime in seconds
    pub refresh_ttl: u64,
    /// Upper bound on each store or audit call
    pub io_timeout: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            refresh_ttl: DEFAULT_REFRESH_TTL_SECS,
            io_timeout: Duration::from_secs(5),
        }
    }
}
