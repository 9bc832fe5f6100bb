//! Error types for authentication operations.

use axum::http::StatusCode;
use hotel_booking_web::AppError;
use thiserror::Error;

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Failure modes of the identity provider.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown email or wrong password. Deliberately does not say which.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// An account with this email already exists.
    #[error("User already exists")]
    EmailTaken,

    /// Self-service registration is turned off.
    #[error("Registration is disabled")]
    RegistrationDisabled,

    /// No session matches the presented token.
    #[error("Session not found")]
    SessionNotFound,

    /// The session exists but has expired.
    #[error("Session has expired")]
    SessionExpired,

    /// The session points at a user that no longer exists.
    #[error("User not found")]
    UserNotFound,

    /// The user or session store failed.
    #[error("Store error: {0}")]
    Store(String),

    /// A password could not be hashed.
    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
}

impl AuthError {
    /// Returns `true` if the caller should be asked to sign in again.
    #[must_use]
    pub const fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            Self::InvalidCredentials | Self::SessionNotFound | Self::SessionExpired | Self::UserNotFound
        )
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::unauthorized(err.to_string()),
            AuthError::SessionNotFound | AuthError::SessionExpired | AuthError::UserNotFound => {
                Self::unauthorized("Invalid or expired session")
            },
            AuthError::EmailTaken => Self::bad_request(err.to_string()),
            AuthError::RegistrationDisabled => {
                Self::new(StatusCode::FORBIDDEN, err.to_string(), "FORBIDDEN")
            },
            AuthError::Store(_) => {
                Self::unavailable("The service is temporarily unavailable").with_source(err)
            },
            AuthError::PasswordHash(_) => Self::internal("An internal error occurred").with_source(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_failures_share_one_message() {
        let expired: AppError = AuthError::SessionExpired.into();
        let missing: AppError = AuthError::SessionNotFound.into();
        assert_eq!(expired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(expired.message(), missing.message());
    }

    #[test]
    fn test_duplicate_email_is_bad_request() {
        let err: AppError = AuthError::EmailTaken.into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "User already exists");
    }

    #[test]
    fn test_hashing_failure_is_opaque() {
        let err: AppError = AuthError::PasswordHash("cost out of range".to_string()).into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.message().contains("cost"));
    }

    #[test]
    fn test_unauthenticated_classification() {
        assert!(AuthError::InvalidCredentials.is_unauthenticated());
        assert!(!AuthError::EmailTaken.is_unauthenticated());
        assert!(!AuthError::Store("down".to_string()).is_unauthenticated());
    }
}
