//! Checkout endpoint: reserve, charge and confirm in one request.
//!
//! - POST /api/checkout - Book a stay and pay for it
//!
//! # HTTP Header
//!
//! Clients must provide the `Idempotency-Key` header:
//! ```text
//! POST /api/checkout
//! Idempotency-Key: 5f0c1a9e-checkout-0001
//! ```
//!
//! # Behavior
//!
//! - **First request**: runs the checkout saga and records the response
//! - **Retry with same key and body**: replays the recorded response, no side effects
//! - **Retry while the first is still running**: 409
//! - **Retry after an unfinished attempt's lease expired**: runs the saga again
//! - **Same key, different body**: 409
//!
//! An attempt that failed before anything was created is forgotten so the
//! key can be retried. Once claimed, the attempt runs to completion even if
//! the client disconnects.

use super::resolve_currency;
use crate::coordinator::{CheckoutCoordinator, CheckoutReport};
use crate::server::state::AppState;
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use chrono::{DateTime, Utc};
use hotel_booking_core::checkout::{CheckoutFailure, CheckoutOrder, CheckoutState};
use hotel_booking_core::stores::{BeginOutcome, StoredResponse};
use hotel_booking_core::{HotelId, Money, UserId};
use hotel_booking_web::{AppError, IdempotencyKey, field_errors};
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use validator::Validate;

/// Response header set when a recorded response is replayed
pub const IDEMPOTENT_REPLAYED_HEADER: &str = "Idempotent-Replayed";

/// Request to book and pay for a stay.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
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
    /// Price of the stay in major units, charged in full
    #[validate(range(exclusive_min = 0.0, message = "Total price must be positive"))]
    pub total_price: f64,
    /// ISO 4217 code; the configured default when absent
    #[validate(length(equal = 3, message = "Currency must be a 3-letter code"))]
    pub currency: Option<String>,
    /// Provider payment method reference
    #[validate(length(min = 1, message = "Payment method is required"))]
    pub payment_method_id: String,
}

/// Routes mounted at `/api/checkout`.
pub fn router() -> Router<AppState> {
    Router::new().route("/", post(checkout))
}

/// Book a stay and pay for it.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/checkout \
///   -H "Idempotency-Key: 5f0c1a9e-checkout-0001" \
///   -H "Content-Type: application/json" \
///   -d '{
///     "userId": 7,
///     "hotelId": 3,
///     "checkIn": "2025-06-01T15:00:00Z",
///     "checkOut": "2025-06-03T11:00:00Z",
///     "guests": 2,
///     "totalPrice": 320.0,
///     "currency": "usd",
///     "paymentMethodId": "pm_card_visa"
///   }'
/// ```
pub async fn checkout(
    State(state): State<AppState>,
    key: IdempotencyKey,
    body: Bytes,
) -> Result<Response, AppError> {
    let request = parse_request(&body)?;
    let order = to_order(request, &state, key.as_str())?;
    let fingerprint = fingerprint(&body);

    let begun = state
        .checkouts
        .begin(
            key.as_str(),
            order.user_id,
            &fingerprint,
            state.clock.now(),
            state.checkout_lease,
        )
        .await?;
    match begun {
        BeginOutcome::Started => {},
        BeginOutcome::Completed(stored) => {
            tracing::info!(idempotency_key = key.as_str(), status = stored.status, "Replaying checkout");
            return Ok(replay(stored));
        },
        BeginOutcome::InProgress => {
            return Err(AppError::conflict(
                "A checkout with this idempotency key is still in progress",
            ));
        },
        BeginOutcome::Mismatch => {
            return Err(AppError::conflict(
                "This idempotency key was already used for a different checkout",
            ));
        },
    }

    // Own task: a client disconnect drops this future, not the saga
    let attempt = tokio::spawn(run_attempt(state, key.as_str().to_string(), order));
    let stored = attempt.await.map_err(|err| {
        AppError::internal("The checkout could not be completed").with_source(err)
    })?;

    Ok(into_response(&stored))
}

/// Run the saga for a claimed key and record its outcome in the ledger.
async fn run_attempt(state: AppState, key: String, order: CheckoutOrder) -> StoredResponse {
    let report = CheckoutCoordinator::from_state(&state).run(order).await;
    let stored = respond(&report);

    if matches!(
        report.state,
        CheckoutState::Failed {
            failure: CheckoutFailure::ReservationFailed(_),
            booking_id: None,
            ..
        }
    ) {
        if let Err(err) = state.checkouts.abandon(&key).await {
            tracing::error!(idempotency_key = %key, error = %err, "Failed to release checkout key");
        }
    } else if let Err(err) = state.checkouts.complete(&key, &stored, state.clock.now()).await {
        // The claim stays open until its lease runs out; a retry then re-runs
        // the saga and the provider deduplicates the charge on the same key.
        tracing::error!(idempotency_key = %key, error = %err, "Failed to record checkout response");
    }

    stored
}

fn parse_request(body: &[u8]) -> Result<CheckoutRequest, AppError> {
    let request: CheckoutRequest = serde_json::from_slice(body).map_err(|err| {
        if err.is_data() {
            AppError::invalid_field("body", err.to_string())
        } else {
            AppError::bad_request(format!("Failed to parse the request body as JSON: {err}"))
        }
    })?;

    request
        .validate()
        .map_err(|errors| AppError::validation_failed(field_errors(&errors)))?;
    Ok(request)
}

fn to_order(request: CheckoutRequest, state: &AppState, key: &str) -> Result<CheckoutOrder, AppError> {
    let currency = resolve_currency(request.currency.as_deref(), state.default_currency)?;
    let amount = Money::from_major(request.total_price)
        .filter(|money| money.minor() > 0)
        .ok_or_else(|| AppError::invalid_field("totalPrice", "Total price must be positive"))?;

    Ok(CheckoutOrder {
        user_id: UserId::new(request.user_id),
        hotel_id: HotelId::new(request.hotel_id),
        check_in: request.check_in,
        check_out: request.check_out,
        guests: request.guests,
        total_price: request.total_price,
        amount,
        currency,
        payment_method_id: request.payment_method_id,
        idempotency_key: key.to_string(),
    })
}

/// Hex SHA-256 of the raw request body
fn fingerprint(body: &[u8]) -> String {
    format!("{:x}", Sha256::digest(body))
}

/// Turn the saga outcome into the response recorded for the key.
fn respond(report: &CheckoutReport) -> StoredResponse {
    match &report.state {
        CheckoutState::Completed { booking_id, receipt } => {
            tracing::info!(booking_id = %booking_id, provider_payment_id = %receipt.provider_payment_id, "Checkout confirmed");
            StoredResponse {
                status: StatusCode::CREATED.as_u16(),
                body: json!({
                    "status": "confirmed",
                    "booking": report.booking,
                    "payment": report.payment,
                    "clientSecret": receipt.client_secret,
                }),
            }
        },
        CheckoutState::AwaitingCustomerAction { booking_id, receipt } => {
            tracing::info!(booking_id = %booking_id, provider_payment_id = %receipt.provider_payment_id, "Checkout awaiting customer action");
            StoredResponse {
                status: StatusCode::ACCEPTED.as_u16(),
                body: json!({
                    "status": "requires_action",
                    "booking": report.booking,
                    "payment": report.payment,
                    "clientSecret": receipt.client_secret,
                }),
            }
        },
        CheckoutState::Failed {
            failure,
            booking_id,
            errors,
            ..
        } => {
            let (status, code, message) = describe_failure(failure);
            if errors.is_empty() {
                tracing::warn!(booking_id = ?booking_id, reason = failure.reason(), code, "Checkout failed");
            } else {
                tracing::error!(
                    booking_id = ?booking_id,
                    reason = failure.reason(),
                    compensation_errors = ?errors,
                    "Checkout failed and could not be fully undone"
                );
            }
            StoredResponse {
                status: status.as_u16(),
                body: json!({
                    "code": code,
                    "message": message,
                    "bookingId": booking_id,
                    "compensationErrors": errors,
                }),
            }
        },
        other => {
            tracing::error!(state = ?other, "Checkout stopped before reaching an outcome");
            StoredResponse {
                status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                body: json!({
                    "code": "INTERNAL_SERVER_ERROR",
                    "message": "An internal error occurred",
                    "compensationErrors": report.compensation_errors(),
                }),
            }
        },
    }
}

fn describe_failure(failure: &CheckoutFailure) -> (StatusCode, &'static str, String) {
    match failure {
        CheckoutFailure::ReservationFailed(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            "The booking could not be created; please retry".to_string(),
        ),
        CheckoutFailure::PaymentDeclined(reason) => {
            (StatusCode::PAYMENT_REQUIRED, "PAYMENT_DECLINED", reason.clone())
        },
        CheckoutFailure::PaymentProviderFailed(_) => (
            StatusCode::BAD_GATEWAY,
            "PAYMENT_PROVIDER_ERROR",
            "The payment provider could not process the charge".to_string(),
        ),
        CheckoutFailure::PaymentNotRecorded(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            "The payment could not be recorded".to_string(),
        ),
        CheckoutFailure::ConfirmationConflict(_) => (
            StatusCode::CONFLICT,
            "CONFLICT",
            "The booking changed during checkout".to_string(),
        ),
        CheckoutFailure::ConfirmationFailed(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            "The booking could not be confirmed".to_string(),
        ),
    }
}

fn into_response(stored: &StoredResponse) -> Response {
    let status = StatusCode::from_u16(stored.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(stored.body.clone())).into_response()
}

fn replay(stored: StoredResponse) -> Response {
    let mut response = into_response(&stored);
    response
        .headers_mut()
        .insert(IDEMPOTENT_REPLAYED_HEADER, HeaderValue::from_static("true"));
    response
}
