//! Password digests and session tokens.
//!
//! Passwords are stored as bcrypt digests (`$2b$10$...`), hashed and
//! checked on the blocking thread pool.

use crate::error::{AuthError, Result};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// bcrypt cost for newly hashed passwords.
pub const PASSWORD_HASH_COST: u32 = 10;

/// Hash a password with a fresh random salt.
///
/// # Errors
///
/// Returns [`AuthError::PasswordHash`] if hashing fails or its task is lost.
pub async fn hash_password(password: &str) -> Result<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, PASSWORD_HASH_COST))
        .await
        .map_err(|err| AuthError::PasswordHash(err.to_string()))?
        .map_err(|err| AuthError::PasswordHash(err.to_string()))
}

/// Check a password against a stored digest.
///
/// Malformed digests never verify.
pub async fn verify_password(password: &str, stored: &str) -> bool {
    let password = password.to_string();
    let stored = stored.to_string();
    match tokio::task::spawn_blocking(move || bcrypt::verify(password, &stored)).await {
        Ok(Ok(matches)) => matches,
        Ok(Err(err)) => {
            tracing::warn!(error = %err, "Unreadable password digest");
            false
        },
        Err(err) => {
            tracing::error!(error = %err, "Password check task failed");
            false
        },
    }
}

/// Generate a cryptographically secure random session token.
///
/// Returns a 256-bit random token encoded as base64url (43 characters).
#[must_use]
pub fn generate_token() -> String {
    let mut random_bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut random_bytes);
    URL_SAFE_NO_PAD.encode(random_bytes)
}

/// Hex SHA-256 digest of a session token, the form sessions are stored under.
#[must_use]
pub fn hash_token(token: &str) -> String {
    Sha256::digest(token.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_password_round_trip() {
        let stored = hash_password("correct horse battery").await.unwrap();
        assert!(stored.starts_with("$2b$10$"));
        assert!(verify_password("correct horse battery", &stored).await);
        assert!(!verify_password("correct horse battery!", &stored).await);
    }

    #[tokio::test]
    async fn test_same_password_gets_different_salts() {
        assert_ne!(
            hash_password("password123").await.unwrap(),
            hash_password("password123").await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_malformed_digest_never_verifies() {
        assert!(!verify_password("x", "").await);
        assert!(!verify_password("x", "$2b$10$short").await);
        assert!(!verify_password("x", "sha256$1$c2FsdA$ZGlnZXN0").await);
    }

    #[test]
    fn test_tokens_are_unique_and_url_safe() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_token_hash_is_stable_hex() {
        let digest = hash_token("abc");
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
