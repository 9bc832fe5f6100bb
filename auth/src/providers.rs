//! Storage traits for accounts and sessions.
//!
//! Implemented in memory by [`crate::mocks`] and on PostgreSQL by the
//! `hotel-booking-postgres` crate.

use crate::error::Result;
use crate::state::{NewUser, Session, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hotel_booking_core::UserId;

/// User repository.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create a user.
    ///
    /// # Errors
    ///
    /// - Email already registered → `AuthError::EmailTaken`
    /// - Store failure → `AuthError::Store`
    async fn create(&self, user: NewUser, now: DateTime<Utc>) -> Result<User>;

    /// Find a user by normalized email.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Store` if the query fails.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Find a user by id.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Store` if the query fails.
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>>;
}

/// Session store.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a new session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Store` if the write fails.
    async fn insert(&self, session: Session) -> Result<()>;

    /// Look up a session by token digest, expired or not.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Store` if the query fails.
    async fn find(&self, token_hash: &str) -> Result<Option<Session>>;

    /// Delete a session. Deleting an unknown session is not an error.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Store` if the write fails.
    async fn revoke(&self, token_hash: &str) -> Result<()>;
}
