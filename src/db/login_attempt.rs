//! Append-only login audit log.

use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;

use super::unix_to_sql;
use crate::auth::{AuditLog, LoginAttempt, StoreError};

/// A stored login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginAttemptRecord {
    pub id: i64,
    pub attempt: LoginAttempt,
}

#[derive(sqlx::FromRow)]
struct LoginAttemptRow {
    id: i64,
    email: String,
    ip_address: String,
    success: i32,
    attempted_at: i64,
}

impl From<LoginAttemptRow> for LoginAttemptRecord {
    fn from(row: LoginAttemptRow) -> Self {
        Self {
            id: row.id,
            attempt: LoginAttempt {
                identity: row.email,
                origin: row.ip_address,
                success: row.success != 0,
                attempted_at: row.attempted_at.max(0) as u64,
            },
        }
    }
}

#[derive(Clone)]
pub struct LoginAttemptStore {
    pool: SqlitePool,
}

impl LoginAttemptStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append an attempt. Returns its row ID.
    pub async fn append(&self, attempt: &LoginAttempt) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO login_attempts (email, ip_address, success, attempted_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&attempt.identity)
        .bind(&attempt.origin)
        .bind(i32::from(attempt.success))
        .bind(unix_to_sql(attempt.attempted_at)?)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// All attempts for an email, oldest first.
    pub async fn list_by_email(&self, email: &str) -> Result<Vec<LoginAttemptRecord>, sqlx::Error> {
        let rows: Vec<LoginAttemptRow> = sqlx::query_as(
            "SELECT id, email, ip_address, success, attempted_at FROM login_attempts WHERE email = ? ORDER BY id",
        )
        .bind(email)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(LoginAttemptRecord::from).collect())
    }

    /// Number of failed attempts for an email at or after `since`.
    pub async fn count_failures_since(&self, email: &str, since: u64) -> Result<i64, sqlx::Error> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM login_attempts WHERE email = ? AND success = 0 AND attempted_at >= ?",
        )
        .bind(email)
        .bind(unix_to_sql(since)?)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.0)
    }
}

#[async_trait]
impl AuditLog for LoginAttemptStore {
    async fn record(&self, attempt: &LoginAttempt) -> Result<(), StoreError> {
        self.append(attempt).await?;
        Ok(())
    }
}
