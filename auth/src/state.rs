//! Account and session records.

use chrono::{DateTime, Utc};
use hotel_booking_core::UserId;
use serde::{Deserialize, Serialize};

/// A stored account, including its password digest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    /// User ID, shared with bookings, payments and reviews
    pub id: UserId,
    /// Normalized (lowercase) email
    pub email: String,
    /// Display name
    pub name: String,
    /// Encoded password digest, see [`crate::password`]
    pub password_hash: String,
    /// Registration timestamp
    pub created_at: DateTime<Utc>,
}

/// Fields required to register an account
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewUser {
    /// Normalized email
    pub email: String,
    /// Display name
    pub name: String,
    /// Encoded password digest
    pub password_hash: String,
}

/// The part of an account that is safe to return to clients
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUser {
    /// User ID
    pub id: UserId,
    /// Email
    pub email: String,
    /// Display name
    pub name: String,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
        }
    }
}

/// A sign-in session.
///
/// Only the SHA-256 digest of the bearer token is stored; the token itself
/// is returned to the client once and never persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    /// Hex SHA-256 digest of the bearer token
    pub token_hash: String,
    /// Signed-in user
    pub user_id: UserId,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Expiry timestamp
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Whether the session has expired at `now`
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
