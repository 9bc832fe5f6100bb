//! Repository traits for every record type, plus the checkout ledger.
//!
//! Each trait is object safe so the HTTP layer can hold `Arc<dyn …>` and swap
//! PostgreSQL for in-memory stores in tests. Writes take `now` explicitly so
//! timestamps come from an injected [`Clock`](crate::environment::Clock).

use crate::booking::{Booking, BookingPatch, BookingStatus, NewBooking};
use crate::hotel::{Hotel, HotelPatch, NewHotel};
use crate::payment::{NewPayment, Payment, PaymentStatus};
use crate::review::{NewReview, RatingSummary, Review, ReviewPatch};
use crate::types::{BookingId, HotelId, PaymentId, ReviewId, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Store operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The addressed record does not exist
    #[error("{resource} {id} not found")]
    NotFound {
        /// Record kind, e.g. `"Booking"`
        resource: &'static str,
        /// Requested id
        id: String,
    },

    /// A uniqueness or compare-and-set check failed
    #[error("conflict: {0}")]
    Conflict(String),

    /// The backing store could not be reached or failed
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Shorthand for [`StoreError::NotFound`]
    #[must_use]
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Hotel Directory persistence
#[async_trait]
pub trait HotelRepository: Send + Sync {
    /// All hotels, in id order
    async fn list(&self) -> StoreResult<Vec<Hotel>>;

    /// A single hotel
    async fn get(&self, id: HotelId) -> StoreResult<Option<Hotel>>;

    /// Insert a hotel
    async fn create(&self, hotel: NewHotel, now: DateTime<Utc>) -> StoreResult<Hotel>;

    /// Patch a hotel. `NotFound` if absent.
    async fn update(&self, id: HotelId, patch: HotelPatch, now: DateTime<Utc>)
    -> StoreResult<Hotel>;

    /// Delete a hotel. `NotFound` if absent.
    async fn delete(&self, id: HotelId) -> StoreResult<()>;

    /// Hotels whose location contains `location`, ignoring case
    async fn search(&self, location: &str) -> StoreResult<Vec<Hotel>>;
}

/// Booking Ledger persistence
///
/// Every list is ordered newest first.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// All bookings
    async fn list(&self) -> StoreResult<Vec<Booking>>;

    /// A single booking
    async fn get(&self, id: BookingId) -> StoreResult<Option<Booking>>;

    /// Insert a booking in `pending` state
    async fn create(&self, booking: NewBooking, now: DateTime<Utc>) -> StoreResult<Booking>;

    /// Patch a booking without lifecycle checks. `NotFound` if absent.
    async fn update(
        &self,
        id: BookingId,
        patch: BookingPatch,
        now: DateTime<Utc>,
    ) -> StoreResult<Booking>;

    /// Delete a booking. `NotFound` if absent.
    async fn delete(&self, id: BookingId) -> StoreResult<()>;

    /// Bookings made by a user
    async fn list_by_user(&self, user_id: UserId) -> StoreResult<Vec<Booking>>;

    /// Bookings of a hotel
    async fn list_by_hotel(&self, hotel_id: HotelId) -> StoreResult<Vec<Booking>>;

    /// Overwrite the status unconditionally. `NotFound` if absent.
    async fn set_status(
        &self,
        id: BookingId,
        status: BookingStatus,
        now: DateTime<Utc>,
    ) -> StoreResult<Booking>;

    /// Move the status from `from` to `to` atomically.
    ///
    /// `Conflict` if the current status is not `from`, `NotFound` if absent.
    async fn transition_status(
        &self,
        id: BookingId,
        from: BookingStatus,
        to: BookingStatus,
        now: DateTime<Utc>,
    ) -> StoreResult<Booking>;
}

/// Payment persistence
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Insert a payment. Several payments may reference the same booking.
    async fn create(&self, payment: NewPayment, now: DateTime<Utc>) -> StoreResult<Payment>;

    /// A single payment
    async fn get(&self, id: PaymentId) -> StoreResult<Option<Payment>>;

    /// Payments of a user, newest first
    async fn list_by_user(&self, user_id: UserId) -> StoreResult<Vec<Payment>>;

    /// Overwrite the status. `NotFound` if absent.
    async fn set_status(
        &self,
        id: PaymentId,
        status: PaymentStatus,
        now: DateTime<Utc>,
    ) -> StoreResult<Payment>;
}

/// Review Store persistence
///
/// Every list is ordered newest first.
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// All reviews
    async fn list(&self) -> StoreResult<Vec<Review>>;

    /// A single review
    async fn get(&self, id: ReviewId) -> StoreResult<Option<Review>>;

    /// Insert a review
    async fn create(&self, review: NewReview, now: DateTime<Utc>) -> StoreResult<Review>;

    /// Patch a review. `NotFound` if absent.
    async fn update(
        &self,
        id: ReviewId,
        patch: ReviewPatch,
        now: DateTime<Utc>,
    ) -> StoreResult<Review>;

    /// Delete a review. `NotFound` if absent.
    async fn delete(&self, id: ReviewId) -> StoreResult<()>;

    /// Reviews of a hotel
    async fn list_by_hotel(&self, hotel_id: HotelId) -> StoreResult<Vec<Review>>;

    /// Reviews written by a user
    async fn list_by_user(&self, user_id: UserId) -> StoreResult<Vec<Review>>;

    /// Average rating and count for a hotel; zero for both with no reviews
    async fn rating_summary(&self, hotel_id: HotelId) -> StoreResult<RatingSummary>;
}

/// The response recorded for a finished checkout attempt
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredResponse {
    /// HTTP status code
    pub status: u16,
    /// JSON body
    pub body: serde_json::Value,
}

/// What [`CheckoutLedger::begin`] found for an idempotency key
#[derive(Clone, Debug, PartialEq)]
pub enum BeginOutcome {
    /// First use of the key, or an expired claim taken over; the caller owns the attempt
    Started,
    /// Another request with the same key has not finished yet
    InProgress,
    /// The attempt finished earlier; replay its response
    Completed(StoredResponse),
    /// The key was used for a different request body
    Mismatch,
}

/// Idempotency ledger for checkout attempts, keyed by the client's
/// `Idempotency-Key`.
#[async_trait]
pub trait CheckoutLedger: Send + Sync {
    /// Claim `key` for a request whose body hashes to `fingerprint`.
    ///
    /// A claim holds for `lease`. An unfinished claim older than that (its
    /// owner crashed or could not record the outcome) is taken over by a
    /// request with the same fingerprint, which then gets
    /// [`BeginOutcome::Started`].
    async fn begin(
        &self,
        key: &str,
        user_id: UserId,
        fingerprint: &str,
        now: DateTime<Utc>,
        lease: Duration,
    ) -> StoreResult<BeginOutcome>;

    /// Record the final response for `key`
    async fn complete(
        &self,
        key: &str,
        response: &StoredResponse,
        now: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Release a claim that produced no side effects so the key can be retried
    async fn abandon(&self, key: &str) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_names_resource_and_id() {
        let err = StoreError::not_found("Booking", BookingId::new(9));
        assert_eq!(err.to_string(), "Booking 9 not found");
    }
}
