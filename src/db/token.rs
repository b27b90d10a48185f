//! Refresh token storage for rotation and revocation.
//!
//! Only refresh tokens are stored. Access tokens are stateless and never touch
//! the database.

use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;

use super::unix_to_sql;
use crate::auth::{SessionRecord, SessionStore, StoreError};

#[derive(sqlx::FromRow)]
struct RefreshTokenRow {
    token: String,
    user_id: i64,
    expires_at: i64,
    created_at: i64,
}

impl From<RefreshTokenRow> for SessionRecord {
    fn from(row: RefreshTokenRow) -> Self {
        Self {
            token: row.token,
            owner: row.user_id,
            expires_at: row.expires_at.max(0) as u64,
            created_at: row.created_at.max(0) as u64,
        }
    }
}

/// Store for refresh tokens.
#[derive(Clone)]
pub struct RefreshTokenStore {
    pool: SqlitePool,
}

impl RefreshTokenStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new refresh token record.
    pub async fn insert(
        &self,
        token: &str,
        user_id: i64,
        expires_at: u64,
        created_at: u64,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO refresh_tokens (token, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(token)
        .bind(user_id)
        .bind(unix_to_sql(expires_at)?)
        .bind(unix_to_sql(created_at)?)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Get a refresh token record by its token string.
    pub async fn find(&self, token: &str) -> Result<Option<SessionRecord>, sqlx::Error> {
        let row: Option<RefreshTokenRow> = sqlx::query_as(
            "SELECT token, user_id, expires_at, created_at FROM refresh_tokens WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(SessionRecord::from))
    }

    /// Delete a token (revoke). Returns whether a row was removed.
    pub async fn remove(&self, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete all tokens that expire at or before `now`.
    pub async fn remove_expired(&self, now: u64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= ?")
            .bind(unix_to_sql(now)?)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// List a user's unexpired refresh tokens, newest first.
    pub async fn list_by_user(
        &self,
        user_id: i64,
        now: u64,
    ) -> Result<Vec<SessionRecord>, sqlx::Error> {
        let rows: Vec<RefreshTokenRow> = sqlx::query_as(
            "SELECT token, user_id, expires_at, created_at FROM refresh_tokens WHERE user_id = ? AND expires_at > ? ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .bind(unix_to_sql(now)?)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(SessionRecord::from).collect())
    }

    /// Delete all tokens for a user (logout everywhere).
    pub async fn remove_all_by_user(&self, user_id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl SessionStore for RefreshTokenStore {
    async fn put(
        &self,
        token: &str,
        owner: i64,
        expires_at: u64,
        created_at: u64,
    ) -> Result<(), StoreError> {
        self.insert(token, owner, expires_at, created_at).await?;
        Ok(())
    }

    async fn get(&self, token: &str) -> Result<Option<SessionRecord>, StoreError> {
        Ok(self.find(token).await?)
    }

    async fn delete(&self, token: &str) -> Result<bool, StoreError> {
        Ok(self.remove(token).await?)
    }

    async fn delete_expired(&self, now: u64) -> Result<u64, StoreError> {
        Ok(self.remove_expired(now).await?)
    }

    async fn list_by_owner(
        &self,
        owner: i64,
        now: u64,
    ) -> Result<Vec<SessionRecord>, StoreError> {
        Ok(self.list_by_user(owner, now).await?)
    }

    async fn delete_all_by_owner(&self, owner: i64) -> Result<u64, StoreError> {
        Ok(self.remove_all_by_user(owner).await?)
    }
}
