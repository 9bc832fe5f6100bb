//! Stripe implementation of [`PaymentProvider`].
//!
//! Talks to the Stripe REST API with form-encoded requests and a bearer
//! secret key. Amounts go out in minor units. Stripe error envelopes are
//! decoded into [`ProviderError`] so callers can tell a declined card from a
//! provider outage.

use crate::payment_provider::{
    ChargeRequest, PaymentIntent, PaymentProvider, ProviderError, ProviderResult, Refund,
};
use async_trait::async_trait;
use hotel_booking_core::{Currency, Money, PaymentStatus};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::{Duration, Instant};

#[derive(Debug, Deserialize)]
struct StripeIntent {
    id: String,
    amount: i64,
    currency: String,
    status: String,
    client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeRefund {
    id: String,
    amount: i64,
    currency: String,
    status: Option<String>,
    payment_intent: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    #[serde(rename = "type")]
    kind: Option<String>,
    code: Option<String>,
    message: Option<String>,
}

/// Stripe API client
#[derive(Clone)]
pub struct StripeProvider {
    client: Client,
    secret_key: String,
    api_base: String,
    return_url: Option<String>,
}

impl fmt::Debug for StripeProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StripeProvider")
            .field("api_base", &self.api_base)
            .field("return_url", &self.return_url)
            .finish_non_exhaustive()
    }
}

impl StripeProvider {
    /// Create a client for `api_base` (normally `https://api.stripe.com`).
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Transport`] if the HTTP client cannot be built.
    pub fn new(
        secret_key: impl Into<String>,
        api_base: impl Into<String>,
        timeout: Duration,
    ) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            secret_key: secret_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            return_url: None,
        })
    }

    /// Send customers back to `url` after a redirect-based confirmation
    #[must_use]
    pub fn with_return_url(mut self, url: Option<String>) -> Self {
        self.return_url = url;
        self
    }

    async fn post<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &str,
        form: &[(&str, String)],
        idempotency_key: Option<&str>,
    ) -> ProviderResult<T> {
        let mut request = self
            .client
            .post(format!("{}{path}", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(form);
        if let Some(key) = idempotency_key {
            request = request.header("Idempotency-Key", key);
        }

        let started = Instant::now();
        let result = request.send().await;
        crate::metrics::record_provider_request(operation, started.elapsed().as_secs_f64());

        let response = result.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout
            } else {
                ProviderError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout
            } else {
                ProviderError::Transport(e.to_string())
            }
        })?;

        if !status.is_success() {
            let err = classify(status, &body);
            tracing::warn!(operation, status = status.as_u16(), error = %err, "Stripe request failed");
            return Err(err);
        }

        serde_json::from_str(&body).map_err(|e| ProviderError::UnexpectedResponse {
            status: status.as_u16(),
            message: format!("could not decode {operation} response: {e}"),
        })
    }
}

/// Map a Stripe error response onto [`ProviderError`].
fn classify(status: StatusCode, body: &str) -> ProviderError {
    let error = serde_json::from_str::<ErrorEnvelope>(body).ok().map(|e| e.error);
    let message = error
        .as_ref()
        .and_then(|e| e.message.clone())
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
    let kind = error.as_ref().and_then(|e| e.kind.as_deref());
    let code = error.as_ref().and_then(|e| e.code.as_deref());

    match (status, kind) {
        (StatusCode::PAYMENT_REQUIRED, _) | (_, Some("card_error")) => ProviderError::Declined(message),
        (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _) | (_, Some("authentication_error")) => {
            ProviderError::Authentication(message)
        },
        (StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND, _) | (_, Some("invalid_request_error")) => {
            ProviderError::InvalidRequest(code.map_or(message.clone(), |code| format!("{message} ({code})")))
        },
        _ => ProviderError::UnexpectedResponse {
            status: status.as_u16(),
            message,
        },
    }
}

fn decode_intent(intent: StripeIntent) -> ProviderResult<PaymentIntent> {
    let status = intent
        .status
        .parse::<PaymentStatus>()
        .map_err(|e| unexpected(e.to_string()))?;
    let currency = intent
        .currency
        .parse::<Currency>()
        .map_err(|e| unexpected(e.to_string()))?;
    Ok(PaymentIntent {
        id: intent.id,
        amount: Money::from_minor(intent.amount),
        currency,
        status,
        client_secret: intent.client_secret,
    })
}

fn unexpected(message: String) -> ProviderError {
    ProviderError::UnexpectedResponse {
        status: StatusCode::OK.as_u16(),
        message,
    }
}

#[async_trait]
impl PaymentProvider for StripeProvider {
    fn name(&self) -> &'static str {
        "stripe"
    }

    async fn charge(&self, request: &ChargeRequest) -> ProviderResult<PaymentIntent> {
        let mut form = vec![
            ("amount", request.amount.minor().to_string()),
            ("currency", request.currency.code().to_string()),
            ("payment_method", request.payment_method_id.clone()),
            ("confirm", "true".to_string()),
        ];
        if let Some(url) = &self.return_url {
            form.push(("return_url", url.clone()));
        }

        let intent: StripeIntent = self
            .post(
                "charge",
                "/v1/payment_intents",
                &form,
                request.idempotency_key.as_deref(),
            )
            .await?;
        decode_intent(intent)
    }

    async fn create_intent(&self, amount: Money, currency: Currency) -> ProviderResult<PaymentIntent> {
        let form = [
            ("amount", amount.minor().to_string()),
            ("currency", currency.code().to_string()),
        ];
        let intent: StripeIntent = self
            .post("create_intent", "/v1/payment_intents", &form, None)
            .await?;
        decode_intent(intent)
    }

    async fn refund(
        &self,
        payment_intent_id: &str,
        idempotency_key: Option<&str>,
    ) -> ProviderResult<Refund> {
        let form = [("payment_intent", payment_intent_id.to_string())];
        let refund: StripeRefund = self
            .post("refund", "/v1/refunds", &form, idempotency_key)
            .await?;

        let currency = refund
            .currency
            .parse::<Currency>()
            .map_err(|e| unexpected(e.to_string()))?;
        Ok(Refund {
            id: refund.id,
            payment_intent_id: refund
                .payment_intent
                .unwrap_or_else(|| payment_intent_id.to_string()),
            amount: Money::from_minor(refund.amount),
            currency,
            status: refund.status.unwrap_or_else(|| "pending".to_string()),
        })
    }
}
