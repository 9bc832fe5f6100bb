//! Payment Gateway Adapter endpoints.
//!
//! - POST /api/payments/process - Create and confirm a charge
//! - POST /api/payments/create-intent - Unconfirmed intent for client-side confirmation
//! - GET /api/payments/:id - Payment details
//! - GET /api/payments/:id/status - Payment status
//! - GET /api/payments/user/:userId - Payments of a user
//! - POST /api/payments/:id/refund - Full refund
//!
//! These endpoints never read or write bookings.

use super::resolve_currency;
use crate::metrics;
use crate::payment_provider::{ChargeRequest, Refund};
use crate::server::state::AppState;
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use hotel_booking_core::{
    BookingId, Money, NewPayment, Payment, PaymentId, PaymentStatus, UserId,
};
use hotel_booking_web::{AppError, ValidatedJson};
use serde::{Deserialize, Serialize};
use validator::Validate;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to charge a payment method.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPaymentRequest {
    /// Amount in major units
    #[validate(range(exclusive_min = 0.0, message = "Amount must be positive"))]
    pub amount: f64,
    /// ISO 4217 code; the configured default when absent
    #[validate(length(equal = 3, message = "Currency must be a 3-letter code"))]
    pub currency: Option<String>,
    /// Provider payment method reference
    #[validate(length(min = 1, message = "Payment method is required"))]
    pub payment_method_id: String,
    /// Booking the payment is for
    #[validate(range(min = 1, message = "Booking id must be positive"))]
    pub booking_id: i64,
    /// Paying user
    #[validate(range(min = 1, message = "User id must be positive"))]
    pub user_id: i64,
}

/// Response after processing a payment.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPaymentResponse {
    /// Always `true`
    pub success: bool,
    /// Stored payment record
    pub payment: Payment,
    /// Secret for finishing confirmation on the client
    pub client_secret: Option<String>,
}

/// Request for an unconfirmed intent.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentRequest {
    /// Amount in major units
    #[validate(range(exclusive_min = 0.0, message = "Amount must be positive"))]
    pub amount: f64,
    /// ISO 4217 code; the configured default when absent
    #[validate(length(equal = 3, message = "Currency must be a 3-letter code"))]
    pub currency: Option<String>,
}

/// Client secret of a new intent.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentResponse {
    /// Secret for confirming on the client
    pub client_secret: Option<String>,
}

/// Current payment status.
#[derive(Debug, Serialize)]
pub struct PaymentStatusResponse {
    /// Mirrored provider status
    pub status: PaymentStatus,
}

/// Response after a refund.
#[derive(Debug, Serialize)]
pub struct RefundResponse {
    /// Always `true`
    pub success: bool,
    /// Provider refund
    pub refund: Refund,
}

fn amount_of(major: f64) -> Result<Money, AppError> {
    Money::from_major(major)
        .filter(|money| money.minor() > 0)
        .ok_or_else(|| AppError::invalid_field("amount", "Amount must be positive"))
}

// ============================================================================
// Handlers
// ============================================================================

/// Routes mounted at `/api/payments`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/process", post(process_payment))
        .route("/create-intent", post(create_intent))
        .route("/user/:user_id", get(list_user_payments))
        .route("/:id", get(get_payment))
        .route("/:id/status", get(get_payment_status))
        .route("/:id/refund", post(refund_payment))
}

/// Create and confirm a provider intent, then store the local record.
///
/// The booking is neither checked nor updated; a booking may collect any
/// number of payments.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/payments/process \
///   -H "Content-Type: application/json" \
///   -d '{
///     "amount": 320.0,
///     "currency": "usd",
///     "paymentMethodId": "pm_card_visa",
///     "bookingId": 12,
///     "userId": 7
///   }'
/// ```
pub async fn process_payment(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<ProcessPaymentRequest>,
) -> Result<Json<ProcessPaymentResponse>, AppError> {
    let amount = amount_of(request.amount)?;
    let currency = resolve_currency(request.currency.as_deref(), state.default_currency)?;

    let charge = ChargeRequest {
        amount,
        currency,
        payment_method_id: request.payment_method_id,
        idempotency_key: None,
    };
    let intent = match state.provider.charge(&charge).await {
        Ok(intent) => intent,
        Err(err) => {
            metrics::record_payment(err.kind());
            tracing::warn!(booking_id = request.booking_id, error = %err, "Charge failed");
            return Err(err.into());
        },
    };

    metrics::record_payment(intent.status.as_str());
    if intent.status.is_captured() {
        metrics::record_payment_captured(amount.minor(), currency.code());
    }

    let new_payment = NewPayment {
        amount,
        currency,
        status: intent.status,
        provider_payment_id: intent.id.clone(),
        booking_id: BookingId::new(request.booking_id),
        user_id: UserId::new(request.user_id),
        payment_method: state.provider.name().to_string(),
    };
    let payment = state
        .payments
        .create(new_payment, state.clock.now())
        .await
        .inspect_err(|err| {
            tracing::error!(
                provider_payment_id = %intent.id,
                error = %err,
                "Charge succeeded at the provider but the payment was not recorded"
            );
        })?;

    tracing::info!(
        payment_id = %payment.id,
        booking_id = %payment.booking_id,
        status = payment.status.as_str(),
        "Payment processed"
    );

    Ok(Json(ProcessPaymentResponse {
        success: true,
        payment,
        client_secret: intent.client_secret,
    }))
}

/// Create an intent the client confirms itself. Nothing is stored.
pub async fn create_intent(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateIntentRequest>,
) -> Result<Json<CreateIntentResponse>, AppError> {
    let amount = amount_of(request.amount)?;
    let currency = resolve_currency(request.currency.as_deref(), state.default_currency)?;

    let intent = state.provider.create_intent(amount, currency).await?;

    tracing::debug!(payment_intent = %intent.id, "Payment intent created");
    Ok(Json(CreateIntentResponse {
        client_secret: intent.client_secret,
    }))
}

/// Payment details.
pub async fn get_payment(
    Path(id): Path<PaymentId>,
    State(state): State<AppState>,
) -> Result<Json<Payment>, AppError> {
    state
        .payments
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Payment", id))
}

/// Stored status of a payment.
pub async fn get_payment_status(
    Path(id): Path<PaymentId>,
    State(state): State<AppState>,
) -> Result<Json<PaymentStatusResponse>, AppError> {
    let payment = state
        .payments
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found("Payment", id))?;

    Ok(Json(PaymentStatusResponse {
        status: payment.status,
    }))
}

/// Payments of a user, newest first.
pub async fn list_user_payments(
    Path(user_id): Path<UserId>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Payment>>, AppError> {
    Ok(Json(state.payments.list_by_user(user_id).await?))
}

/// Refund a payment in full and mark it `refunded`.
///
/// The booking the payment belongs to is left as it is.
pub async fn refund_payment(
    Path(id): Path<PaymentId>,
    State(state): State<AppState>,
) -> Result<Json<RefundResponse>, AppError> {
    let payment = state
        .payments
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found("Payment", id))?;

    let idempotency_key = format!("refund-payment-{id}");
    let refund = state
        .provider
        .refund(&payment.provider_payment_id, Some(&idempotency_key))
        .await?;

    state
        .payments
        .set_status(id, PaymentStatus::Refunded, state.clock.now())
        .await?;

    metrics::record_refund();
    tracing::info!(
        payment_id = %id,
        refund_id = %refund.id,
        provider_payment_id = %payment.provider_payment_id,
        "Payment refunded"
    );

    Ok(Json(RefundResponse {
        success: true,
        refund,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_amount_of_rejects_sub_cent_and_negative() {
        assert_eq!(amount_of(12.34).unwrap().minor(), 1234);
        assert!(amount_of(0.004).is_err());
        assert!(amount_of(-1.0).is_err());
        assert!(amount_of(f64::NAN).is_err());
    }

    proptest! {
        #[test]
        fn prop_whole_cents_are_exact(cents in 1_i64..10_000_000) {
            #[allow(clippy::cast_precision_loss)]
            let major = cents as f64 / 100.0;
            prop_assert_eq!(amount_of(major).unwrap().minor(), cents);
        }
    }
}
