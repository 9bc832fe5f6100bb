//! Card processor abstraction.
//!
//! The payment endpoints and the checkout coordinator talk to the card
//! processor through [`PaymentProvider`]. Production uses
//! [`StripeProvider`](crate::stripe::StripeProvider); development and tests
//! use [`MockPaymentProvider`], which mirrors Stripe's test payment methods.

use async_trait::async_trait;
use hotel_booking_core::{Currency, Money, PaymentStatus};
use hotel_booking_web::AppError;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Provider result
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Payment provider errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The card was declined
    #[error("card declined: {0}")]
    Declined(String),

    /// The provider refused the request as malformed (unknown payment method, bad amount, ...)
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The API key was rejected
    #[error("provider authentication failed: {0}")]
    Authentication(String),

    /// The provider did not answer in time
    #[error("provider timeout")]
    Timeout,

    /// The provider could not be reached
    #[error("transport error: {0}")]
    Transport(String),

    /// The provider answered with something we cannot use
    #[error("unexpected provider response (status {status}): {message}")]
    UnexpectedResponse {
        /// HTTP status code
        status: u16,
        /// Provider message or decode failure
        message: String,
    },
}

impl ProviderError {
    /// Whether the customer's card was refused, as opposed to a provider fault
    #[must_use]
    pub const fn is_decline(&self) -> bool {
        matches!(self, Self::Declined(_))
    }

    /// Label for metrics
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Declined(_) => "declined",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Authentication(_) => "authentication",
            Self::Timeout => "timeout",
            Self::Transport(_) => "transport",
            Self::UnexpectedResponse { .. } => "unexpected_response",
        }
    }
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Declined(reason) => Self::payment_declined(reason),
            ProviderError::InvalidRequest(reason) => Self::bad_request(reason),
            err => Self::bad_gateway("The payment provider could not process the request")
                .with_source(err),
        }
    }
}

/// A charge to create and confirm immediately
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeRequest {
    /// Amount to charge
    pub amount: Money,
    /// Charge currency
    pub currency: Currency,
    /// Provider payment method reference
    pub payment_method_id: String,
    /// Forwarded as the provider's idempotency key
    pub idempotency_key: Option<String>,
}

/// A provider payment intent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    /// Provider reference, stored as the payment's `providerPaymentId`
    pub id: String,
    /// Intent amount
    pub amount: Money,
    /// Intent currency
    pub currency: Currency,
    /// Intent status
    pub status: PaymentStatus,
    /// Secret the client uses to finish confirmation
    pub client_secret: Option<String>,
}

/// A provider refund
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Refund {
    /// Provider refund reference
    pub id: String,
    /// Refunded payment intent
    pub payment_intent_id: String,
    /// Refunded amount
    pub amount: Money,
    /// Refund currency
    pub currency: Currency,
    /// Provider refund status (`pending`, `succeeded`, ...)
    pub status: String,
}

/// Card processor operations
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Provider name, recorded as the payment method of stored payments
    fn name(&self) -> &'static str;

    /// Create a payment intent for `request` and confirm it immediately.
    ///
    /// A successful call may still return an intent that needs customer
    /// action (`requires_action`); only a refused card is an error.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Declined`] when the card is refused, other
    /// variants when the provider fails.
    async fn charge(&self, request: &ChargeRequest) -> ProviderResult<PaymentIntent>;

    /// Create an unconfirmed intent the client confirms itself.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] when the provider fails.
    async fn create_intent(&self, amount: Money, currency: Currency) -> ProviderResult<PaymentIntent>;

    /// Refund a captured intent in full.
    ///
    /// # Errors
    ///
    /// Returns a [`ProviderError`] when the provider refuses or fails.
    async fn refund(
        &self,
        payment_intent_id: &str,
        idempotency_key: Option<&str>,
    ) -> ProviderResult<Refund>;
}

/// Shared provider handle
pub type SharedPaymentProvider = Arc<dyn PaymentProvider>;

#[derive(Debug, Default)]
struct MockLedger {
    intents: HashMap<String, PaymentIntent>,
    by_idempotency_key: HashMap<String, String>,
    refunds: Vec<Refund>,
}

/// Deterministic in-process provider.
///
/// Behaviour follows the payment method id, case-insensitively, mirroring
/// Stripe's test payment methods:
///
/// - contains `declined` → [`ProviderError::Declined`]
/// - contains `authentication` or `3ds` → intent in `requires_action`
/// - contains `unreachable` → [`ProviderError::Transport`]
/// - anything else → intent in `succeeded`
///
/// Charges that reuse an idempotency key return the original intent.
#[derive(Debug, Clone, Default)]
pub struct MockPaymentProvider {
    ledger: Arc<Mutex<MockLedger>>,
    sequence: Arc<AtomicU64>,
    fail_refunds: Arc<AtomicBool>,
    charge_delay_ms: Arc<AtomicU64>,
}

impl MockPaymentProvider {
    /// Creates a new mock provider
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every refund fail with a transport error until switched back
    pub fn fail_refunds(&self, fail: bool) {
        self.fail_refunds.store(fail, Ordering::SeqCst);
    }

    /// Hold every charge for `delay` before answering, like a slow network
    pub fn delay_charges(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.charge_delay_ms.store(millis, Ordering::SeqCst);
    }

    /// Number of distinct intents created (for testing)
    #[must_use]
    pub fn intent_count(&self) -> usize {
        self.lock().intents.len()
    }

    /// Refunds issued so far (for testing)
    #[must_use]
    pub fn refunds(&self) -> Vec<Refund> {
        self.lock().refunds.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockLedger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{prefix}_mock_{n:06}")
    }

    fn new_intent(&self, amount: Money, currency: Currency, status: PaymentStatus) -> PaymentIntent {
        let id = self.next_id("pi");
        PaymentIntent {
            client_secret: Some(format!("{id}_secret_mock")),
            id,
            amount,
            currency,
            status,
        }
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    fn name(&self) -> &'static str {
        "stripe"
    }

    async fn charge(&self, request: &ChargeRequest) -> ProviderResult<PaymentIntent> {
        let delay = self.charge_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if let Some(key) = &request.idempotency_key {
            let ledger = self.lock();
            if let Some(intent) = ledger
                .by_idempotency_key
                .get(key)
                .and_then(|id| ledger.intents.get(id))
            {
                return Ok(intent.clone());
            }
        }

        let method = request.payment_method_id.to_ascii_lowercase();
        if method.contains("declined") {
            tracing::info!(payment_method = %request.payment_method_id, "Mock charge declined");
            return Err(ProviderError::Declined("Your card was declined.".to_string()));
        }
        if method.contains("unreachable") {
            return Err(ProviderError::Transport("connection refused (simulated)".to_string()));
        }

        let status = if method.contains("authentication") || method.contains("3ds") {
            PaymentStatus::RequiresAction
        } else {
            PaymentStatus::Succeeded
        };
        let intent = self.new_intent(request.amount, request.currency, status);

        let mut ledger = self.lock();
        if let Some(key) = &request.idempotency_key {
            ledger.by_idempotency_key.insert(key.clone(), intent.id.clone());
        }
        ledger.intents.insert(intent.id.clone(), intent.clone());

        tracing::info!(
            payment_intent = %intent.id,
            amount = intent.amount.minor(),
            status = %intent.status,
            "Mock charge processed"
        );
        Ok(intent)
    }

    async fn create_intent(&self, amount: Money, currency: Currency) -> ProviderResult<PaymentIntent> {
        let intent = self.new_intent(amount, currency, PaymentStatus::RequiresPaymentMethod);
        self.lock().intents.insert(intent.id.clone(), intent.clone());
        Ok(intent)
    }

    async fn refund(
        &self,
        payment_intent_id: &str,
        _idempotency_key: Option<&str>,
    ) -> ProviderResult<Refund> {
        if self.fail_refunds.load(Ordering::SeqCst) {
            return Err(ProviderError::Transport("connection reset (simulated)".to_string()));
        }

        let (amount, currency) = match self.lock().intents.get(payment_intent_id) {
            Some(intent) if !intent.status.is_captured() => {
                return Err(ProviderError::InvalidRequest(format!(
                    "PaymentIntent {payment_intent_id} has no captured charge to refund"
                )));
            },
            Some(intent) => (intent.amount, intent.currency),
            // Intents created before a restart are unknown to the mock
            None => (Money::default(), Currency::default()),
        };

        let refund = Refund {
            id: self.next_id("re"),
            payment_intent_id: payment_intent_id.to_string(),
            amount,
            currency,
            status: "succeeded".to_string(),
        };
        self.lock().refunds.push(refund.clone());
        Ok(refund)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn charge(method: &str, key: Option<&str>) -> ChargeRequest {
        ChargeRequest {
            amount: Money::from_minor(36_000),
            currency: Currency::Usd,
            payment_method_id: method.to_string(),
            idempotency_key: key.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_mock_succeeds_by_default() {
        let provider = MockPaymentProvider::new();
        let intent = provider.charge(&charge("pm_card_visa", None)).await.unwrap();

        assert_eq!(intent.status, PaymentStatus::Succeeded);
        assert_eq!(intent.amount.minor(), 36_000);
        assert!(intent.id.starts_with("pi_mock_"));
        assert!(intent.client_secret.unwrap().ends_with("_secret_mock"));
    }

    #[tokio::test]
    async fn test_mock_declines_and_requires_action() {
        let provider = MockPaymentProvider::new();

        let err = provider.charge(&charge("pm_card_chargeDeclined", None)).await.unwrap_err();
        assert!(err.is_decline());

        let intent = provider
            .charge(&charge("pm_card_authenticationRequired", None))
            .await
            .unwrap();
        assert_eq!(intent.status, PaymentStatus::RequiresAction);

        let err = provider.charge(&charge("pm_unreachable", None)).await.unwrap_err();
        assert_eq!(err.kind(), "transport");
    }

    #[tokio::test]
    async fn test_mock_replays_idempotent_charges() {
        let provider = MockPaymentProvider::new();
        let first = provider.charge(&charge("pm_card_visa", Some("key-1"))).await.unwrap();
        let again = provider.charge(&charge("pm_card_visa", Some("key-1"))).await.unwrap();
        let other = provider.charge(&charge("pm_card_visa", Some("key-2"))).await.unwrap();

        assert_eq!(first, again);
        assert_ne!(first.id, other.id);
        assert_eq!(provider.intent_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_refunds_captured_intents_only() {
        let provider = MockPaymentProvider::new();
        let captured = provider.charge(&charge("pm_card_visa", None)).await.unwrap();
        let pending = provider.charge(&charge("pm_card_3ds", None)).await.unwrap();

        let refund = provider.refund(&captured.id, None).await.unwrap();
        assert_eq!(refund.payment_intent_id, captured.id);
        assert_eq!(refund.amount.minor(), 36_000);

        let err = provider.refund(&pending.id, None).await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidRequest(_)));

        provider.fail_refunds(true);
        assert!(provider.refund(&captured.id, None).await.is_err());
        assert_eq!(provider.refunds().len(), 1);
    }

    #[test]
    fn test_provider_errors_map_to_http() {
        use axum::http::StatusCode;

        let declined: AppError = ProviderError::Declined("no".to_string()).into();
        assert_eq!(declined.status(), StatusCode::PAYMENT_REQUIRED);

        let invalid: AppError = ProviderError::InvalidRequest("bad pm".to_string()).into();
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        let timeout: AppError = ProviderError::Timeout.into();
        assert_eq!(timeout.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(timeout.code(), "PAYMENT_PROVIDER_ERROR");
    }
}
