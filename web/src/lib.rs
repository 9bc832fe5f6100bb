//! Axum integration for the hotel booking services.
//!
//! This crate is the imperative shell's HTTP edge: it turns requests into
//! validated domain input and domain failures into stable JSON errors.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │         Imperative Shell (Axum)         │  ← HTTP, JSON, CORS
//! │  - Request parsing + validation         │  ← ValidatedJson, IdempotencyKey
//! │  - Error envelope                       │  ← AppError
//! │  - Correlation, logging, metrics        │  ← middleware
//! ├─────────────────────────────────────────┤
//! │         Functional Core                 │
//! │  - Booking lifecycle, checkout saga     │  ← hotel-booking-core
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use hotel_booking_web::{AppError, ValidatedJson};
//!
//! async fn create_hotel(
//!     State(state): State<AppState>,
//!     ValidatedJson(request): ValidatedJson<CreateHotelRequest>,
//! ) -> Result<(StatusCode, Json<Hotel>), AppError> {
//!     let hotel = state.hotels.create(request.into(), state.clock.now()).await?;
//!     Ok((StatusCode::CREATED, Json(hotel)))
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod validation;

// Re-export key types for convenience
pub use error::AppError;
pub use extractors::{CorrelationId, IDEMPOTENCY_KEY_HEADER, IdempotencyKey};
pub use middleware::{CORRELATION_ID_HEADER, correlation_id_layer, cors_layer};
pub use validation::{ValidatedJson, field_errors};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
