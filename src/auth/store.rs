//! Contracts for the collaborators the auth service depends on.
//!
//! The SQLite stores in [`crate::db`] and the in-memory stores in
//! [`super::memory`] both implement these.

use async_trait::async_trait;

use super::types::{LoginAttempt, SessionRecord, UserCredentials};

/// Errors surfaced by store implementations.
#[derive(Debug)]
pub enum StoreError {
    /// A record with the same unique key already exists
    Conflict,
    /// The backing store could not complete the operation
    Unavailable(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Conflict => write!(f, "Duplicate key"),
            StoreError::Unavailable(msg) => write!(f, "Store unavailable: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        let is_unique = e
            .as_database_error()
            .is_some_and(|db| db.is_unique_violation());
        if is_unique {
            StoreError::Conflict
        } else {
            StoreError::Unavailable(e.to_string())
        }
    }
}

/// Refresh token persistence.
///
/// There is no update operation: rotation is a delete followed by a put, and
/// `delete` must report `true` to exactly one caller per token.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a new refresh token. Fails with [`StoreError::Conflict`] if the token exists.
    async fn put(
        &self,
        token: &str,
        owner: i64,
        expires_at: u64,
        created_at: u64,
    ) -> Result<(), StoreError>;

    async fn get(&self, token: &str) -> Result<Option<SessionRecord>, StoreError>;

    /// Remove a token. Returns whether a record was removed.
    async fn delete(&self, token: &str) -> Result<bool, StoreError>;

    /// Remove every token with `expires_at <= now`. Returns the number removed.
    async fn delete_expired(&self, now: u64) -> Result<u64, StoreError>;

    /// Unexpired tokens for an owner, newest first.
    async fn list_by_owner(&self, owner: i64, now: u64)
    -> Result<Vec<SessionRecord>, StoreError>;

    /// Remove every token for an owner (logout everywhere).
    async fn delete_all_by_owner(&self, owner: i64) -> Result<u64, StoreError>;
}

/// Append-only login audit trail.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn record(&self, attempt: &LoginAttempt) -> Result<(), StoreError>;
}

/// Read-only view of the user store.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_identity(&self, identity: &str)
    -> Result<Option<UserCredentials>, StoreError>;
}
