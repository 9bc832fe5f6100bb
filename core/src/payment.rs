//! Payment records mirrored from the card processor.

use crate::types::{BookingId, Currency, Money, PaymentId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Payment method recorded for charges created through the provider adapter.
pub const PAYMENT_METHOD_STRIPE: &str = "stripe";

/// Payment status.
///
/// Every variant except `Refunded` mirrors a provider payment-intent status;
/// `Refunded` is set locally after a successful refund.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Waiting for a payment method
    RequiresPaymentMethod,
    /// Waiting for confirmation
    RequiresConfirmation,
    /// Customer must complete an extra step (e.g. 3-D Secure)
    RequiresAction,
    /// Provider is still processing
    Processing,
    /// Authorized, waiting for capture
    RequiresCapture,
    /// Cancelled at the provider
    Canceled,
    /// Funds captured
    Succeeded,
    /// Refunded through this service
    Refunded,
}

impl PaymentStatus {
    /// Every status.
    pub const ALL: [Self; 8] = [
        Self::RequiresPaymentMethod,
        Self::RequiresConfirmation,
        Self::RequiresAction,
        Self::Processing,
        Self::RequiresCapture,
        Self::Canceled,
        Self::Succeeded,
        Self::Refunded,
    ];

    /// Wire and column representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RequiresPaymentMethod => "requires_payment_method",
            Self::RequiresConfirmation => "requires_confirmation",
            Self::RequiresAction => "requires_action",
            Self::Processing => "processing",
            Self::RequiresCapture => "requires_capture",
            Self::Canceled => "canceled",
            Self::Succeeded => "succeeded",
            Self::Refunded => "refunded",
        }
    }

    /// Whether funds have been captured
    #[must_use]
    pub const fn is_captured(self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown payment status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown payment status: {0}")]
pub struct UnknownPaymentStatus(pub String);

impl FromStr for PaymentStatus {
    type Err = UnknownPaymentStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownPaymentStatus(s.to_string()))
    }
}

/// A locally persisted payment
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    /// Payment ID
    pub id: PaymentId,
    /// Charged amount
    pub amount: Money,
    /// Charge currency
    pub currency: Currency,
    /// Status mirrored from the provider
    pub status: PaymentStatus,
    /// Provider charge reference (payment intent id)
    pub provider_payment_id: String,
    /// Booking the charge was made for; not checked against the ledger
    pub booking_id: BookingId,
    /// Paying user
    pub user_id: UserId,
    /// Payment method label
    pub payment_method: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

/// Fields required to persist a payment
#[derive(Clone, Debug, PartialEq)]
pub struct NewPayment {
    /// Charged amount
    pub amount: Money,
    /// Charge currency
    pub currency: Currency,
    /// Provider status at creation
    pub status: PaymentStatus,
    /// Provider charge reference
    pub provider_payment_id: String,
    /// Linked booking
    pub booking_id: BookingId,
    /// Paying user
    pub user_id: UserId,
    /// Payment method label
    pub payment_method: String,
}

impl NewPayment {
    /// Materialize the record once the store has assigned an id
    #[must_use]
    pub fn into_payment(self, id: PaymentId, now: DateTime<Utc>) -> Payment {
        Payment {
            id,
            amount: self.amount,
            currency: self.currency,
            status: self.status,
            provider_payment_id: self.provider_payment_id,
            booking_id: self.booking_id,
            user_id: self.user_id,
            payment_method: self.payment_method,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_provider_strings() {
        for status in PaymentStatus::ALL {
            assert_eq!(status.as_str().parse::<PaymentStatus>().unwrap(), status);
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        assert!("partially_refunded".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn test_only_succeeded_counts_as_captured() {
        assert!(PaymentStatus::Succeeded.is_captured());
        assert!(!PaymentStatus::RequiresAction.is_captured());
        assert!(!PaymentStatus::Refunded.is_captured());
    }
}
