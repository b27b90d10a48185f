//! In-memory implementations of the store contracts.
//!
//! Each store guards its data with a single mutex, so every operation is
//! atomic with respect to the others.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::store::{AuditLog, SessionStore, StoreError, UserDirectory};
use super::types::{LoginAttempt, Principal, SessionRecord, UserCredentials};

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("lock poisoned".into())
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, SessionRecord>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tokens, expired ones included.
    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn put(
        &self,
        token: &str,
        owner: i64,
        expires_at: u64,
        created_at: u64,
    ) -> Result<(), StoreError> {
        let mut sessions = self.sessions.lock().map_err(poisoned)?;
        if sessions.contains_key(token) {
            return Err(StoreError::Conflict);
        }
        sessions.insert(
            token.to_string(),
            SessionRecord {
                token: token.to_string(),
                owner,
                expires_at,
                created_at,
            },
        );
        Ok(())
    }

    async fn get(&self, token: &str) -> Result<Option<SessionRecord>, StoreError> {
        let sessions = self.sessions.lock().map_err(poisoned)?;
        Ok(sessions.get(token).cloned())
    }

    async fn delete(&self, token: &str) -> Result<bool, StoreError> {
        let mut sessions = self.sessions.lock().map_err(poisoned)?;
        Ok(sessions.remove(token).is_some())
    }

    async fn delete_expired(&self, now: u64) -> Result<u64, StoreError> {
        let mut sessions = self.sessions.lock().map_err(poisoned)?;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now));
        Ok((before - sessions.len()) as u64)
    }

    async fn list_by_owner(
        &self,
        owner: i64,
        now: u64,
    ) -> Result<Vec<SessionRecord>, StoreError> {
        let sessions = self.sessions.lock().map_err(poisoned)?;
        let mut records: Vec<SessionRecord> = sessions
            .values()
            .filter(|s| s.owner == owner && !s.is_expired(now))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn delete_all_by_owner(&self, owner: i64) -> Result<u64, StoreError> {
        let mut sessions = self.sessions.lock().map_err(poisoned)?;
        let before = sessions.len();
        sessions.retain(|_, s| s.owner != owner);
        Ok((before - sessions.len()) as u64)
    }
}

#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    attempts: Mutex<Vec<LoginAttempt>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every recorded attempt in insertion order.
    pub fn attempts(&self) -> Vec<LoginAttempt> {
        self.attempts
            .lock()
            .map(|a| a.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AuditLog for MemoryAuditLog {
    async fn record(&self, attempt: &LoginAttempt) -> Result<(), StoreError> {
        self.attempts.lock().map_err(poisoned)?.push(attempt.clone());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryUserDirectory {
    users: Mutex<HashMap<String, UserCredentials>>,
    next_id: Mutex<i64>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user and return its principal. `identity` is matched case-insensitively.
    pub fn insert(&self, identity: &str, password_hash: &str, active: bool) -> Principal {
        let mut next_id = self.next_id.lock().unwrap_or_else(|e| e.into_inner());
        *next_id += 1;
        let principal = Principal {
            id: *next_id,
            active,
        };
        self.users.lock().unwrap_or_else(|e| e.into_inner()).insert(
            identity.to_lowercase(),
            UserCredentials {
                principal,
                password_hash: password_hash.to_string(),
            },
        );
        principal
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_by_identity(
        &self,
        identity: &str,
    ) -> Result<Option<UserCredentials>, StoreError> {
        let users = self.users.lock().map_err(poisoned)?;
        Ok(users.get(&identity.to_lowercase()).cloned())
    }
}
