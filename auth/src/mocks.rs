//! In-memory account and session stores for tests and local runs.

use crate::error::{AuthError, Result};
use crate::providers::{SessionStore, UserStore};
use crate::state::{NewUser, Session, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hotel_booking_core::UserId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| AuthError::Store("Mutex lock failed".to_string()))
}

/// Mock user store.
#[derive(Debug, Clone, Default)]
pub struct MockUserStore {
    users: Arc<Mutex<Vec<User>>>,
}

impl MockUserStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered users (for testing).
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn user_count(&self) -> Result<usize> {
        Ok(lock(&self.users)?.len())
    }
}

#[async_trait]
impl UserStore for MockUserStore {
    async fn create(&self, user: NewUser, now: DateTime<Utc>) -> Result<User> {
        let mut users = lock(&self.users)?;
        if users.iter().any(|u| u.email == user.email) {
            return Err(AuthError::EmailTaken);
        }
        let id = UserId::new(i64::try_from(users.len()).unwrap_or(i64::MAX - 1) + 1);
        let user = User {
            id,
            email: user.email,
            name: user.name,
            password_hash: user.password_hash,
            created_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(lock(&self.users)?.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
        Ok(lock(&self.users)?.iter().find(|u| u.id == id).cloned())
    }
}

/// Mock session store.
#[derive(Debug, Clone, Default)]
pub struct MockSessionStore {
    sessions: Arc<Mutex<HashMap<String, Session>>>,
}

impl MockSessionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions (for testing).
    ///
    /// # Errors
    ///
    /// Returns error if lock is poisoned.
    pub fn session_count(&self) -> Result<usize> {
        Ok(lock(&self.sessions)?.len())
    }
}

#[async_trait]
impl SessionStore for MockSessionStore {
    async fn insert(&self, session: Session) -> Result<()> {
        lock(&self.sessions)?.insert(session.token_hash.clone(), session);
        Ok(())
    }

    async fn find(&self, token_hash: &str) -> Result<Option<Session>> {
        Ok(lock(&self.sessions)?.get(token_hash).cloned())
    }

    async fn revoke(&self, token_hash: &str) -> Result<()> {
        lock(&self.sessions)?.remove(token_hash);
        Ok(())
    }
}
