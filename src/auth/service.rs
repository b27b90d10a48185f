//! Login, refresh-token rotation and logout.
//!
//! Every store call is bounded by `AuthConfig::io_timeout`; a store failure or
//! timeout fails the whole operation closed. The audit log is the exception:
//! its failures are logged and never change a login outcome.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::errors::AuthError;
use super::store::{AuditLog, SessionStore, StoreError, UserDirectory};
use super::types::{AuthConfig, LoginAttempt, SessionRecord, TokenResponse};
use crate::clock::Clock;
use crate::jwt::TokenCodec;
use crate::password::{PasswordError, PasswordHasher};

/// How many fresh refresh tokens to try before giving up on collisions.
const MAX_MINT_ATTEMPTS: u32 = 3;

/// Collaborators injected into [`AuthService`].
#[derive(Clone)]
pub struct AuthComponents {
    pub codec: Arc<TokenCodec>,
    pub sessions: Arc<dyn SessionStore>,
    pub audit: Arc<dyn AuditLog>,
    pub users: Arc<dyn UserDirectory>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub clock: Arc<dyn Clock>,
}

#[derive(Clone)]
pub struct AuthService {
    codec: Arc<TokenCodec>,
    sessions: Arc<dyn SessionStore>,
    audit: Arc<dyn AuditLog>,
    users: Arc<dyn UserDirectory>,
    hasher: Arc<dyn PasswordHasher>,
    clock: Arc<dyn Clock>,
    config: AuthConfig,
    /// Verified against when the identity is unknown, so that path costs one hash too.
    dummy_hash: Arc<str>,
}

impl AuthService {
    /// Fails if the hasher cannot produce the placeholder hash.
    pub fn new(components: AuthComponents, config: AuthConfig) -> Result<Self, PasswordError> {
        let dummy_hash = Arc::from(components.hasher.hash("unknown-identity-placeholder")?);

        Ok(Self {
            codec: components.codec,
            sessions: components.sessions,
            audit: components.audit,
            users: components.users,
            hasher: components.hasher,
            clock: components.clock,
            config,
            dummy_hash,
        })
    }

    /// Authenticate `identity` with `password` and issue a token pair.
    ///
    /// Exactly one login attempt is recorded per call, reflecting the final outcome.
    pub async fn login(
        &self,
        identity: &str,
        password: &str,
        origin: &str,
    ) -> Result<TokenResponse, AuthError> {
        let result = self.authenticate(identity, password).await;

        self.record_attempt(identity, origin, result.is_ok()).await;

        match &result {
            Ok(_) => info!(identity = %identity, origin = %origin, "Login succeeded"),
            Err(e) => info!(identity = %identity, origin = %origin, error = %e, "Login failed"),
        }

        result
    }

    async fn authenticate(
        &self,
        identity: &str,
        password: &str,
    ) -> Result<TokenResponse, AuthError> {
        let credentials = self
            .bounded("find_by_identity", self.users.find_by_identity(identity))
            .await?;

        let Some(credentials) = credentials else {
            self.verify_password(password, self.dummy_hash.to_string())
                .await;
            debug!(identity = %identity, "Unknown identity");
            return Err(AuthError::Unauthorized);
        };

        if !self
            .verify_password(password, credentials.password_hash)
            .await
        {
            debug!(identity = %identity, "Password mismatch");
            return Err(AuthError::Unauthorized);
        }

        if !credentials.principal.active {
            debug!(identity = %identity, "Account inactive");
            return Err(AuthError::Unauthorized);
        }

        self.issue(credentials.principal.id).await
    }

    /// Exchange a refresh token for a new pair. The presented token is consumed.
    pub async fn refresh(&self, presented: &str) -> Result<TokenResponse, AuthError> {
        let now = self.clock.now();

        let record = self
            .bounded("get_session", self.sessions.get(presented))
            .await?
            .ok_or(AuthError::Unauthorized)?;

        if record.is_expired(now) {
            debug!(user_id = record.owner, "Refresh token expired");
            return Err(AuthError::Unauthorized);
        }

        // Only the caller whose delete removed the row may issue its replacement.
        let removed = self
            .bounded("delete_session", self.sessions.delete(presented))
            .await?;
        if !removed {
            warn!(user_id = record.owner, "Refresh token already consumed");
            return Err(AuthError::Unauthorized);
        }

        let response = self.issue(record.owner).await?;
        debug!(user_id = record.owner, "Refresh token rotated");
        Ok(response)
    }

    /// Revoke a refresh token. Not idempotent: an unknown token is `BadRequest`.
    pub async fn logout(&self, presented: &str) -> Result<(), AuthError> {
        let removed = self
            .bounded("delete_session", self.sessions.delete(presented))
            .await?;

        if removed {
            Ok(())
        } else {
            Err(AuthError::BadRequest)
        }
    }

    /// Validate an access token and return the principal ID it was issued for.
    pub fn verify_access(&self, token: &str) -> Result<i64, AuthError> {
        self.codec
            .verify_access(token, self.clock.now())
            .map_err(|e| {
                debug!(error = %e, "Access token rejected");
                AuthError::Unauthorized
            })
    }

    /// Unexpired sessions of a principal, newest first.
    pub async fn sessions(&self, owner: i64) -> Result<Vec<SessionRecord>, AuthError> {
        let now = self.clock.now();
        self.bounded("list_sessions", self.sessions.list_by_owner(owner, now))
            .await
    }

    /// Revoke every session of a principal.
    pub async fn logout_all(&self, owner: i64) -> Result<u64, AuthError> {
        self.bounded("delete_sessions", self.sessions.delete_all_by_owner(owner))
            .await
    }

    /// Evict expired refresh tokens.
    pub async fn purge_expired(&self) -> Result<u64, AuthError> {
        let now = self.clock.now();
        self.bounded("purge_sessions", self.sessions.delete_expired(now))
            .await
    }

    /// Mint an access token and a persisted refresh token for `owner`.
    async fn issue(&self, owner: i64) -> Result<TokenResponse, AuthError> {
        let now = self.clock.now();

        let access = self.codec.mint_access(owner, now).map_err(|e| {
            error!(error = %e, "Failed to mint access token");
            AuthError::Unavailable
        })?;
        let refresh = self.persist_refresh(owner, now).await?;

        Ok(TokenResponse::bearer(access.token, refresh, access.duration))
    }

    /// Store a new refresh token, minting another if the first collides.
    async fn persist_refresh(&self, owner: i64, now: u64) -> Result<String, AuthError> {
        let Some(expires_at) = now.checked_add(self.config.refresh_ttl) else {
            error!(refresh_ttl = self.config.refresh_ttl, "Refresh token expiry overflows");
            return Err(AuthError::Unavailable);
        };

        for attempt in 1..=MAX_MINT_ATTEMPTS {
            let token = self.codec.mint_refresh();
            let stored = self
                .bounded("put_session", self.sessions.put(&token, owner, expires_at, now))
                .await;
            match stored {
                Ok(()) => return Ok(token),
                Err(AuthError::Conflict) => {
                    warn!(attempt, "Refresh token collision, minting another");
                }
                Err(e) => return Err(e),
            }
        }

        error!(user_id = owner, "Gave up minting a unique refresh token");
        Err(AuthError::Conflict)
    }

    async fn verify_password(&self, plaintext: &str, hash: String) -> bool {
        let hasher = self.hasher.clone();
        let plaintext = plaintext.to_string();
        tokio::task::spawn_blocking(move || hasher.verify(&plaintext, &hash))
            .await
            .unwrap_or_else(|e| {
                error!(error = %e, "Password verification task failed");
                false
            })
    }

    async fn record_attempt(&self, identity: &str, origin: &str, success: bool) {
        let attempt = LoginAttempt {
            identity: identity.to_string(),
            origin: origin.to_string(),
            success,
            attempted_at: self.clock.now(),
        };

        match tokio::time::timeout(self.config.io_timeout, self.audit.record(&attempt)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(identity = %identity, error = %e, "Failed to record login attempt"),
            Err(_) => warn!(identity = %identity, "Timed out recording login attempt"),
        }
    }

    /// Run a store call under the configured timeout.
    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, AuthError> {
        match tokio::time::timeout(self.config.io_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(StoreError::Conflict)) => Err(AuthError::Conflict),
            Ok(Err(e)) => {
                error!(operation, error = %e, "Store call failed");
                Err(e.into())
            }
            Err(_) => {
                error!(operation, timeout = ?self.config.io_timeout, "Store call timed out");
                Err(AuthError::Timeout)
            }
        }
    }
}
