//! Identity provider adapter.
//!
//! [`IdentityProvider`] is the seam the HTTP layer talks to. Deployed
//! environments put an external managed identity service behind it; the
//! [`LocalIdentityProvider`] here keeps accounts and sessions in the
//! service's own stores for local development.

use crate::error::{AuthError, Result};
use crate::password::{generate_token, hash_password, hash_token, verify_password};
use crate::providers::{SessionStore, UserStore};
use crate::state::{NewUser, PublicUser, Session};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use hotel_booking_core::Clock;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Self-service account creation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Display name
    pub name: String,
    /// Email, normalized before storage
    pub email: String,
    /// Plain-text password
    pub password: String,
}

/// A successful sign-in: the user and a fresh bearer token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedIn {
    /// Signed-in user
    pub user: PublicUser,
    /// Bearer token, shown once
    pub token: String,
    /// Session expiry
    pub expires_at: DateTime<Utc>,
}

/// Issues and validates credentials.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an account and sign it in.
    ///
    /// # Errors
    ///
    /// `EmailTaken`, `RegistrationDisabled` or `Store`.
    async fn register(&self, registration: Registration) -> Result<SignedIn>;

    /// Exchange credentials for a session.
    ///
    /// # Errors
    ///
    /// `InvalidCredentials` for an unknown email or a wrong password.
    async fn login(&self, email: &str, password: &str) -> Result<SignedIn>;

    /// Resolve a bearer token to its user.
    ///
    /// # Errors
    ///
    /// `SessionNotFound`, `SessionExpired` or `UserNotFound`.
    async fn authenticate(&self, token: &str) -> Result<PublicUser>;

    /// Revoke a bearer token. Unknown tokens are ignored.
    ///
    /// # Errors
    ///
    /// `Store` if the revocation could not be written.
    async fn logout(&self, token: &str) -> Result<()>;
}

/// Local development identity provider
#[derive(Clone)]
pub struct LocalIdentityProvider {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    session_ttl: Duration,
    allow_registration: bool,
}

impl LocalIdentityProvider {
    /// Default session lifetime
    pub const DEFAULT_SESSION_TTL: Duration = Duration::days(7);

    /// Create a provider over the given stores
    #[must_use]
    pub fn new(
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            users,
            sessions,
            clock,
            session_ttl: Self::DEFAULT_SESSION_TTL,
            allow_registration: true,
        }
    }

    /// Override the session lifetime
    #[must_use]
    pub const fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Enable or disable self-service registration
    #[must_use]
    pub const fn with_registration(mut self, allow: bool) -> Self {
        self.allow_registration = allow;
        self
    }

    async fn open_session(&self, user: PublicUser) -> Result<SignedIn> {
        let now = self.clock.now();
        let token = generate_token();
        let session = Session {
            token_hash: hash_token(&token),
            user_id: user.id,
            created_at: now,
            expires_at: now + self.session_ttl,
        };
        let expires_at = session.expires_at;
        self.sessions.insert(session).await?;

        Ok(SignedIn {
            user,
            token,
            expires_at,
        })
    }
}

/// Lowercase and trim an email so lookups are case-insensitive.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Digest verified against when the email is unknown, so both failure paths
/// cost the same.
async fn decoy_digest() -> Result<&'static str> {
    static DECOY: OnceCell<String> = OnceCell::const_new();
    DECOY
        .get_or_try_init(|| hash_password("decoy password"))
        .await
        .map(String::as_str)
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn register(&self, registration: Registration) -> Result<SignedIn> {
        if !self.allow_registration {
            return Err(AuthError::RegistrationDisabled);
        }

        let user = self
            .users
            .create(
                NewUser {
                    email: normalize_email(&registration.email),
                    name: registration.name.trim().to_string(),
                    password_hash: hash_password(&registration.password).await?,
                },
                self.clock.now(),
            )
            .await?;

        tracing::info!(user_id = %user.id, "User registered");
        self.open_session(user.into()).await
    }

    async fn login(&self, email: &str, password: &str) -> Result<SignedIn> {
        let Some(user) = self.users.find_by_email(&normalize_email(email)).await? else {
            let _ = verify_password(password, decoy_digest().await?).await;
            tracing::debug!("Login attempt for unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(password, &user.password_hash).await {
            tracing::debug!(user_id = %user.id, "Login attempt with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        tracing::info!(user_id = %user.id, "User signed in");
        self.open_session(user.into()).await
    }

    async fn authenticate(&self, token: &str) -> Result<PublicUser> {
        let token_hash = hash_token(token);
        let session = self
            .sessions
            .find(&token_hash)
            .await?
            .ok_or(AuthError::SessionNotFound)?;

        if session.is_expired(self.clock.now()) {
            self.sessions.revoke(&token_hash).await?;
            return Err(AuthError::SessionExpired);
        }

        self.users
            .find_by_id(session.user_id)
            .await?
            .map(PublicUser::from)
            .ok_or(AuthError::UserNotFound)
    }

    async fn logout(&self, token: &str) -> Result<()> {
        self.sessions.revoke(&hash_token(token)).await
    }
}
