//! Booking Ledger endpoints.
//!
//! - GET /api/bookings - All bookings, newest first
//! - GET /api/bookings/:id - Booking details
//! - POST /api/bookings - Create a pending booking
//! - PUT /api/bookings/:id - Partial update
//! - DELETE /api/bookings/:id - Delete a booking
//! - GET /api/bookings/user/:userId - Bookings of a user
//! - GET /api/bookings/hotel/:hotelId - Bookings of a hotel
//! - POST /api/bookings/:id/cancel - Cancel a booking
//!
//! Bookings created here are not tied to a payment. The checkout endpoint
//! is the only path that links the two.

use super::write_failed;
use crate::metrics;
use crate::server::state::AppState;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use hotel_booking_core::{
    Booking, BookingId, BookingPatch, BookingStatus, HotelId, NewBooking, StoreError, UserId,
};
use hotel_booking_web::{AppError, ValidatedJson};
use serde::Deserialize;
use validator::Validate;

// ============================================================================
// Request Types
// ============================================================================

/// Request to create a booking.
///
/// A `status` field, if sent, is ignored: bookings always start `pending`.
/// Dates are not compared with each other.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    /// Guest making the booking
    #[validate(range(min = 1, message = "User id must be positive"))]
    pub user_id: i64,
    /// Hotel being booked
    #[validate(range(min = 1, message = "Hotel id must be positive"))]
    pub hotel_id: i64,
    /// Arrival
    pub check_in: DateTime<Utc>,
    /// Departure
    pub check_out: DateTime<Utc>,
    /// Party size
    #[validate(range(min = 1, message = "Guests must be at least 1"))]
    pub guests: i32,
    /// Price of the stay in major units
    #[validate(range(exclusive_min = 0.0, message = "Total price must be positive"))]
    pub total_price: f64,
}

impl From<CreateBookingRequest> for NewBooking {
    fn from(request: CreateBookingRequest) -> Self {
        Self {
            user_id: UserId::new(request.user_id),
            hotel_id: HotelId::new(request.hotel_id),
            check_in: request.check_in,
            check_out: request.check_out,
            guests: request.guests,
            total_price: request.total_price,
        }
    }
}

/// Partial booking update.
///
/// `status` must name a known status; the transition itself is not checked.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookingRequest {
    /// Arrival
    pub check_in: Option<DateTime<Utc>>,
    /// Departure
    pub check_out: Option<DateTime<Utc>>,
    /// Party size
    #[validate(range(min = 1, message = "Guests must be at least 1"))]
    pub guests: Option<i32>,
    /// Price of the stay in major units
    #[validate(range(exclusive_min = 0.0, message = "Total price must be positive"))]
    pub total_price: Option<f64>,
    /// New lifecycle status
    pub status: Option<BookingStatus>,
}

impl From<UpdateBookingRequest> for BookingPatch {
    fn from(request: UpdateBookingRequest) -> Self {
        Self {
            check_in: request.check_in,
            check_out: request.check_out,
            guests: request.guests,
            total_price: request.total_price,
            status: request.status,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Routes mounted at `/api/bookings`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_bookings).post(create_booking))
        .route(
            "/:id",
            get(get_booking).put(update_booking).delete(delete_booking),
        )
        .route("/:id/cancel", post(cancel_booking))
        .route("/user/:user_id", get(list_user_bookings))
        .route("/hotel/:hotel_id", get(list_hotel_bookings))
}

/// All bookings, newest first.
pub async fn list_bookings(State(state): State<AppState>) -> Result<Json<Vec<Booking>>, AppError> {
    Ok(Json(state.bookings.list().await?))
}

/// Booking details.
pub async fn get_booking(
    Path(id): Path<BookingId>,
    State(state): State<AppState>,
) -> Result<Json<Booking>, AppError> {
    state
        .bookings
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Booking", id))
}

/// Create a booking in `pending` state.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/bookings \
///   -H "Content-Type: application/json" \
///   -d '{
///     "userId": 7,
///     "hotelId": 3,
///     "checkIn": "2025-06-01T15:00:00Z",
///     "checkOut": "2025-06-03T11:00:00Z",
///     "guests": 2,
///     "totalPrice": 320.0
///   }'
/// ```
pub async fn create_booking(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let booking = state
        .bookings
        .create(request.into(), state.clock.now())
        .await?;

    metrics::record_booking("created");
    tracing::info!(
        booking_id = %booking.id,
        user_id = %booking.user_id,
        hotel_id = %booking.hotel_id,
        "Booking created"
    );

    Ok((StatusCode::CREATED, Json(booking)))
}

/// Apply a partial update.
///
/// Any known status is accepted. Transitions the lifecycle forbids are
/// applied anyway and logged.
pub async fn update_booking(
    Path(id): Path<BookingId>,
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<UpdateBookingRequest>,
) -> Result<Json<Booking>, AppError> {
    if let Some(next) = request.status {
        let current = state
            .bookings
            .get(id)
            .await?
            .ok_or_else(|| StoreError::not_found("Booking", id))
            .map_err(write_failed("Failed to update booking"))?;

        if current.status != next && !current.status.can_transition_to(next) {
            tracing::warn!(
                booking_id = %id,
                from = current.status.as_str(),
                to = next.as_str(),
                "Applying booking status change outside the lifecycle"
            );
        }
    }

    let booking = state
        .bookings
        .update(id, request.into(), state.clock.now())
        .await
        .map_err(write_failed("Failed to update booking"))?;

    tracing::info!(booking_id = %booking.id, status = booking.status.as_str(), "Booking updated");
    Ok(Json(booking))
}

/// Delete a booking.
pub async fn delete_booking(
    Path(id): Path<BookingId>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    state
        .bookings
        .delete(id)
        .await
        .map_err(write_failed("Failed to delete booking"))?;

    tracing::info!(booking_id = %id, "Booking deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Bookings made by a user.
pub async fn list_user_bookings(
    Path(user_id): Path<UserId>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Booking>>, AppError> {
    Ok(Json(state.bookings.list_by_user(user_id).await?))
}

/// Bookings of a hotel.
pub async fn list_hotel_bookings(
    Path(hotel_id): Path<HotelId>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Booking>>, AppError> {
    Ok(Json(state.bookings.list_by_hotel(hotel_id).await?))
}

/// Cancel a booking from any state.
///
/// Cancelling an already cancelled booking succeeds and leaves it cancelled.
/// Payments of the booking are not refunded.
pub async fn cancel_booking(
    Path(id): Path<BookingId>,
    State(state): State<AppState>,
) -> Result<Json<Booking>, AppError> {
    let previous = state
        .bookings
        .get(id)
        .await?
        .ok_or_else(|| StoreError::not_found("Booking", id))
        .map_err(write_failed("Failed to cancel booking"))?
        .status;

    let booking = state
        .bookings
        .set_status(id, BookingStatus::Cancelled, state.clock.now())
        .await
        .map_err(write_failed("Failed to cancel booking"))?;

    if previous != BookingStatus::Cancelled {
        metrics::record_booking("cancelled");
    }
    tracing::info!(booking_id = %id, from = previous.as_str(), "Booking cancelled");

    Ok(Json(booking))
}
