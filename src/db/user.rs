use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;

use crate::auth::{Principal, StoreError, UserCredentials, UserDirectory};

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    email: String,
    username: String,
    is_active: i32,
    created_at: String,
    updated_at: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            username: row.username,
            active: row.is_active != 0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CredentialsRow {
    id: i64,
    password_hash: String,
    is_active: i32,
}

impl From<CredentialsRow> for UserCredentials {
    fn from(row: CredentialsRow) -> Self {
        Self {
            principal: Principal {
                id: row.id,
                active: row.is_active != 0,
            },
            password_hash: row.password_hash,
        }
    }
}

/// Fields of a user that may be changed after creation. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub active: Option<bool>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.active.is_none()
    }
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new active user. Returns the user ID.
    pub async fn create(
        &self,
        email: &str,
        username: &str,
        password_hash: &str,
    ) -> Result<i64, sqlx::Error> {
        let result =
            sqlx::query("INSERT INTO users (email, username, password_hash) VALUES (?, ?, ?)")
                .bind(email)
                .bind(username)
                .bind(password_hash)
                .execute(&self.pool)
                .await?;
        Ok(result.last_insert_rowid())
    }

    /// Get a user by email (case-insensitive).
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, email, username, is_active, created_at, updated_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, email, username, is_active, created_at, updated_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    /// Apply the set fields of `update`. Returns whether the user exists.
    pub async fn update(&self, id: i64, update: &UserUpdate) -> Result<bool, sqlx::Error> {
        if update.is_empty() {
            return Ok(self.get_by_id(id).await?.is_some());
        }

        let result = sqlx::query(
            "UPDATE users SET
                username = COALESCE(?, username),
                is_active = COALESCE(?, is_active),
                updated_at = datetime('now')
            WHERE id = ?",
        )
        .bind(update.username.as_deref())
        .bind(update.active.map(i32::from))
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a user by ID.
    pub async fn delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl UserDirectory for UserStore {
    async fn find_by_identity(
        &self,
        identity: &str,
    ) -> Result<Option<UserCredentials>, StoreError> {
        let row: Option<CredentialsRow> =
            sqlx::query_as("SELECT id, password_hash, is_active FROM users WHERE email = ?")
                .bind(identity)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(UserCredentials::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    #[tokio::test]
    async fn test_create_and_get_user() {
        let db = Database::open(":memory:").await.unwrap();

        let id = db.users().create("a@x.com", "alice", "hash").await.unwrap();

        let user = db.users().get_by_email("A@X.com").await.unwrap().unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.username, "alice");
        assert!(user.active);

        let user = db.users().get_by_id(id).await.unwrap().unwrap();
        assert_eq!(user.email, "a@x.com");
    }

    #[tokio::test]
    async fn test_duplicate_email_fails() {
        let db = Database::open(":memory:").await.unwrap();

        db.users().create("a@x.com", "alice", "hash").await.unwrap();
        let result = db.users().create("A@x.com", "alice2", "hash").await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_update_only_touches_set_fields() {
        let db = Database::open(":memory:").await.unwrap();
        let id = db.users().create("a@x.com", "alice", "hash").await.unwrap();

        let deactivate = UserUpdate {
            active: Some(false),
            ..UserUpdate::default()
        };
        assert!(db.users().update(id, &deactivate).await.unwrap());

        let user = db.users().get_by_id(id).await.unwrap().unwrap();
        assert!(!user.active);
        assert_eq!(user.username, "alice");

        let rename = UserUpdate {
            username: Some("alicia".into()),
            ..UserUpdate::default()
        };
        assert!(db.users().update(id, &rename).await.unwrap());

        let user = db.users().get_by_id(id).await.unwrap().unwrap();
        assert!(!user.active);
        assert_eq!(user.username, "alicia");

        assert!(!db.users().update(999, &rename).await.unwrap());
        assert!(db.users().update(id, &UserUpdate::default()).await.unwrap());
    }

    #[tokio::test]
    async fn test_find_by_identity() {
        let db = Database::open(":memory:").await.unwrap();
        let id = db.users().create("a@x.com", "alice", "$argon2id$x").await.unwrap();

        let credentials = db
            .users()
            .find_by_identity("a@x.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(credentials.principal, Principal { id, active: true });
        assert_eq!(credentials.password_hash, "$argon2id$x");

        assert!(db.users().find_by_identity("b@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_user() {
        let db = Database::open(":memory:").await.unwrap();

        let id = db.users().create("a@x.com", "alice", "hash").await.unwrap();
        db.users().delete(id).await.unwrap();

        assert!(db.users().get_by_id(id).await.unwrap().is_none());
    }
}
