//! Custom Axum extractors.
//!
//! - `CorrelationId`: the request's correlation id, set by the middleware
//! - `IdempotencyKey`: the client-supplied `Idempotency-Key` header
//!
//! # Examples
//!
//! ```ignore
//! use hotel_booking_web::extractors::{CorrelationId, IdempotencyKey};
//!
//! async fn handler(
//!     correlation_id: CorrelationId,
//!     key: IdempotencyKey,
//! ) -> Result<Json<Response>, AppError> {
//!     tracing::info!(correlation_id = %correlation_id.0, key = %key.as_str(), "Processing request");
//!     Ok(Json(response))
//! }
//! ```

use crate::error::AppError;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

/// Header carrying the client's idempotency key.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Shortest accepted idempotency key
pub const MIN_IDEMPOTENCY_KEY_LEN: usize = 16;

/// Longest accepted idempotency key
pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 128;

/// Correlation ID for request tracing.
///
/// Read from the request extensions when the correlation middleware is
/// installed; otherwise taken from the `X-Correlation-ID` header, or freshly
/// generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(id) = parts.extensions.get::<Self>() {
            return Ok(*id);
        }

        let correlation_id = parts
            .headers
            .get(crate::middleware::CORRELATION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        Ok(Self(correlation_id))
    }
}

/// Client-supplied idempotency key.
///
/// Required: a missing key, or one outside 16 to 128 visible ASCII
/// characters, is rejected with a 400 validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Validate a raw header value
    ///
    /// # Errors
    ///
    /// Returns a validation [`AppError`] describing why the key was refused.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let key = raw.trim();
        if key.len() < MIN_IDEMPOTENCY_KEY_LEN || key.len() > MAX_IDEMPOTENCY_KEY_LEN {
            return Err(AppError::invalid_field(
                IDEMPOTENCY_KEY_HEADER,
                format!(
                    "must be between {MIN_IDEMPOTENCY_KEY_LEN} and {MAX_IDEMPOTENCY_KEY_LEN} characters"
                ),
            ));
        }
        if !key.chars().all(|c| c.is_ascii_graphic()) {
            return Err(AppError::invalid_field(
                IDEMPOTENCY_KEY_HEADER,
                "must contain only visible ASCII characters",
            ));
        }
        Ok(Self(key.to_string()))
    }

    /// The key
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the owned key
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for IdempotencyKey
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(IDEMPOTENCY_KEY_HEADER)
            .ok_or_else(|| AppError::invalid_field(IDEMPOTENCY_KEY_HEADER, "header is required"))?
            .to_str()
            .map_err(|_| {
                AppError::invalid_field(IDEMPOTENCY_KEY_HEADER, "must be valid ASCII")
            })?;

        Self::parse(raw)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};

    async fn extract_key(value: Option<&str>) -> Result<IdempotencyKey, AppError> {
        let mut builder = Request::builder();
        if let Some(value) = value {
            builder = builder.header(IDEMPOTENCY_KEY_HEADER, value);
        }
        let (mut parts, ()) = builder.body(()).expect("Valid request").into_parts();
        IdempotencyKey::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_correlation_id_from_header() {
        let uuid = Uuid::new_v4();
        let req = Request::builder()
            .header("X-Correlation-ID", uuid.to_string())
            .body(())
            .expect("Valid request");

        let (mut parts, ()) = req.into_parts();
        let correlation_id = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .expect("Should extract");

        assert_eq!(correlation_id.0, uuid);
    }

    #[tokio::test]
    async fn test_correlation_id_prefers_extension() {
        let stored = Uuid::new_v4();
        let mut req = Request::builder()
            .header("X-Correlation-ID", Uuid::new_v4().to_string())
            .body(())
            .expect("Valid request");
        req.extensions_mut().insert(CorrelationId(stored));

        let (mut parts, ()) = req.into_parts();
        let correlation_id = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .expect("Should extract");

        assert_eq!(correlation_id.0, stored);
    }

    #[tokio::test]
    async fn test_idempotency_key_accepted() {
        let key = extract_key(Some("checkout-2025-01-01-abcdef")).await.unwrap();
        assert_eq!(key.as_str(), "checkout-2025-01-01-abcdef");
    }

    #[tokio::test]
    async fn test_idempotency_key_required() {
        let err = extract_key(None).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.field_errors()[0].path, IDEMPOTENCY_KEY_HEADER);
    }

    #[tokio::test]
    async fn test_idempotency_key_length_bounds() {
        assert!(extract_key(Some("too-short")).await.is_err());
        assert!(extract_key(Some(&"k".repeat(129))).await.is_err());
        assert!(extract_key(Some(&"k".repeat(128))).await.is_ok());
        assert!(extract_key(Some(&"k".repeat(16))).await.is_ok());
    }

    #[tokio::test]
    async fn test_idempotency_key_rejects_inner_whitespace() {
        assert!(extract_key(Some("checkout attempt 0001")).await.is_err());
    }
}
