//! Checkout coordinator: the imperative shell around [`CheckoutSaga`].
//!
//! The saga decides, the coordinator acts. Each [`CheckoutCommand`] the
//! reducer emits is executed against the stores or the payment provider,
//! its outcome is turned into a [`CheckoutAction`] and fed back, until the
//! saga reaches a terminal state.

use crate::metrics;
use crate::payment_provider::{ChargeRequest, ProviderError, SharedPaymentProvider};
use crate::server::state::AppState;
use hotel_booking_core::checkout::{
    ChargeReceipt, CheckoutAction, CheckoutCommand, CheckoutOrder, CheckoutSaga, CheckoutState,
};
use hotel_booking_core::{
    Booking, BookingRepository, BookingStatus, Clock, NewPayment, Payment, PaymentRepository,
    PaymentStatus, Reducer, StoreError,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

/// Final saga state plus the records the attempt touched last.
#[derive(Clone, Debug)]
pub struct CheckoutReport {
    /// Terminal saga state
    pub state: CheckoutState,
    /// Latest version of the booking, if one was created
    pub booking: Option<Booking>,
    /// Latest version of the payment record, if one was stored
    pub payment: Option<Payment>,
}

impl CheckoutReport {
    /// Metric label for the outcome
    #[must_use]
    pub const fn outcome(&self) -> &'static str {
        match &self.state {
            CheckoutState::Completed { .. } => "confirmed",
            CheckoutState::AwaitingCustomerAction { .. } => "requires_action",
            _ => "failed",
        }
    }

    /// Failed compensations, if any
    #[must_use]
    pub fn compensation_errors(&self) -> &[String] {
        match &self.state {
            CheckoutState::Failed { errors, .. } | CheckoutState::Compensating { errors, .. } => {
                errors
            },
            _ => &[],
        }
    }
}

/// Runs checkout attempts.
#[derive(Clone)]
pub struct CheckoutCoordinator {
    bookings: Arc<dyn BookingRepository>,
    payments: Arc<dyn PaymentRepository>,
    provider: SharedPaymentProvider,
    clock: Arc<dyn Clock>,
}

/// Records touched while executing commands
#[derive(Default)]
struct Touched {
    booking: Option<Booking>,
    payment: Option<Payment>,
}

impl CheckoutCoordinator {
    /// Creates a coordinator over the given stores and provider
    #[must_use]
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        payments: Arc<dyn PaymentRepository>,
        provider: SharedPaymentProvider,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            bookings,
            payments,
            provider,
            clock,
        }
    }

    /// Coordinator sharing the application's stores
    #[must_use]
    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            state.bookings.clone(),
            state.payments.clone(),
            state.provider.clone(),
            state.clock.clone(),
        )
    }

    /// Drive one checkout attempt to a terminal state.
    ///
    /// Never fails: every failure is an outcome recorded in the report.
    pub async fn run(&self, order: CheckoutOrder) -> CheckoutReport {
        let started = Instant::now();
        let idempotency_key = order.idempotency_key.clone();
        let saga = CheckoutSaga;
        let mut state = CheckoutState::default();
        let mut touched = Touched::default();

        let mut queue: VecDeque<CheckoutCommand> = saga
            .reduce(&mut state, CheckoutAction::Start { order }, &())
            .into_iter()
            .collect();

        while let Some(command) = queue.pop_front() {
            let action = self.execute(command, &idempotency_key, &mut touched).await;
            tracing::debug!(?action, "Checkout step finished");
            queue.extend(saga.reduce(&mut state, action, &()));
        }

        let report = CheckoutReport {
            state,
            booking: touched.booking,
            payment: touched.payment,
        };

        metrics::record_checkout(report.outcome(), started.elapsed().as_secs_f64());
        metrics::record_compensation_failures(report.compensation_errors().len());
        report
    }

    async fn execute(
        &self,
        command: CheckoutCommand,
        idempotency_key: &str,
        touched: &mut Touched,
    ) -> CheckoutAction {
        match command {
            CheckoutCommand::ReserveBooking { booking } => {
                match self.bookings.create(booking, self.clock.now()).await {
                    Ok(booking) => {
                        metrics::record_booking("created");
                        let booking_id = booking.id;
                        touched.booking = Some(booking);
                        CheckoutAction::BookingReserved { booking_id }
                    },
                    Err(err) => CheckoutAction::ReservationFailed {
                        reason: err.to_string(),
                    },
                }
            },

            CheckoutCommand::ChargePayment {
                booking_id,
                user_id,
                amount,
                currency,
                payment_method_id,
                idempotency_key,
            } => {
                let request = ChargeRequest {
                    amount,
                    currency,
                    payment_method_id,
                    idempotency_key: Some(idempotency_key),
                };
                let intent = match self.provider.charge(&request).await {
                    Ok(intent) => intent,
                    Err(err) => {
                        metrics::record_payment(err.kind());
                        return match err {
                            ProviderError::Declined(reason) | ProviderError::InvalidRequest(reason) => {
                                CheckoutAction::PaymentDeclined { reason }
                            },
                            other => CheckoutAction::PaymentFailed {
                                reason: other.to_string(),
                            },
                        };
                    },
                };
                metrics::record_payment(intent.status.as_str());

                let payment = NewPayment {
                    amount,
                    currency,
                    status: intent.status,
                    provider_payment_id: intent.id.clone(),
                    booking_id,
                    user_id,
                    payment_method: self.provider.name().to_string(),
                };
                let payment = match self.payments.create(payment, self.clock.now()).await {
                    Ok(payment) => payment,
                    Err(err) => {
                        return CheckoutAction::PaymentNotRecorded {
                            provider_payment_id: intent.id,
                            reason: err.to_string(),
                        };
                    },
                };

                let receipt = ChargeReceipt {
                    payment_id: payment.id,
                    provider_payment_id: intent.id,
                    client_secret: intent.client_secret,
                };
                touched.payment = Some(payment);

                match intent.status {
                    PaymentStatus::Succeeded => {
                        metrics::record_payment_captured(amount.minor(), currency.code());
                        CheckoutAction::PaymentSucceeded { receipt }
                    },
                    PaymentStatus::RequiresAction
                    | PaymentStatus::RequiresConfirmation
                    | PaymentStatus::RequiresCapture
                    | PaymentStatus::Processing => CheckoutAction::PaymentRequiresAction { receipt },
                    status @ (PaymentStatus::RequiresPaymentMethod | PaymentStatus::Canceled) => {
                        CheckoutAction::PaymentDeclined {
                            reason: format!("payment intent ended in {status}"),
                        }
                    },
                    PaymentStatus::Refunded => CheckoutAction::PaymentFailed {
                        reason: "payment intent already refunded".to_string(),
                    },
                }
            },

            CheckoutCommand::ConfirmBooking { booking_id } => {
                let result = self
                    .bookings
                    .transition_status(
                        booking_id,
                        BookingStatus::Pending,
                        BookingStatus::Confirmed,
                        self.clock.now(),
                    )
                    .await;
                match result {
                    Ok(booking) => {
                        metrics::record_booking("confirmed");
                        touched.booking = Some(booking);
                        CheckoutAction::BookingConfirmed { booking_id }
                    },
                    Err(err) => CheckoutAction::ConfirmationFailed {
                        conflict: matches!(err, StoreError::Conflict(_)),
                        reason: err.to_string(),
                    },
                }
            },

            CheckoutCommand::RefundPayment {
                payment_id,
                provider_payment_id,
            } => {
                let refund_key = format!("{idempotency_key}-refund");
                if let Err(err) = self
                    .provider
                    .refund(&provider_payment_id, Some(&refund_key))
                    .await
                {
                    return CheckoutAction::RefundFailed {
                        provider_payment_id,
                        reason: err.to_string(),
                    };
                }
                metrics::record_refund();

                if let Some(payment_id) = payment_id {
                    match self
                        .payments
                        .set_status(payment_id, PaymentStatus::Refunded, self.clock.now())
                        .await
                    {
                        Ok(payment) => touched.payment = Some(payment),
                        Err(err) => {
                            return CheckoutAction::RefundFailed {
                                provider_payment_id,
                                reason: format!("refunded but not marked refunded: {err}"),
                            };
                        },
                    }
                }
                CheckoutAction::PaymentRefunded {
                    provider_payment_id,
                }
            },

            CheckoutCommand::ReleaseBooking { booking_id } => {
                match self
                    .bookings
                    .set_status(booking_id, BookingStatus::Cancelled, self.clock.now())
                    .await
                {
                    Ok(booking) => {
                        metrics::record_booking("cancelled");
                        touched.booking = Some(booking);
                        CheckoutAction::BookingReleased { booking_id }
                    },
                    Err(err) => CheckoutAction::ReleaseFailed {
                        booking_id,
                        reason: err.to_string(),
                    },
                }
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::payment_provider::MockPaymentProvider;
    use hotel_booking_core::checkout::CheckoutFailure;
    use hotel_booking_testing::{
        FixedClock, InMemoryBookingRepository, InMemoryPaymentRepository, fixtures,
    };

    struct Harness {
        bookings: Arc<InMemoryBookingRepository>,
        payments: Arc<InMemoryPaymentRepository>,
        provider: MockPaymentProvider,
        coordinator: CheckoutCoordinator,
    }

    fn harness() -> Harness {
        let bookings = Arc::new(InMemoryBookingRepository::new());
        let payments = Arc::new(InMemoryPaymentRepository::new());
        let provider = MockPaymentProvider::new();
        let coordinator = CheckoutCoordinator::new(
            bookings.clone(),
            payments.clone(),
            Arc::new(provider.clone()),
            Arc::new(FixedClock::default()),
        );
        Harness {
            bookings,
            payments,
            provider,
            coordinator,
        }
    }

    fn order(payment_method: &str) -> CheckoutOrder {
        fixtures::checkout_order(7, 3, payment_method, "checkout-attempt-0001")
    }

    #[tokio::test]
    async fn test_successful_checkout_confirms_booking() {
        let h = harness();

        let report = h.coordinator.run(order("pm_card_visa")).await;

        assert!(matches!(report.state, CheckoutState::Completed { .. }));
        assert_eq!(report.outcome(), "confirmed");
        let booking = report.booking.as_ref().unwrap();
        assert_eq!(booking.status, BookingStatus::Confirmed);
        let payment = report.payment.as_ref().unwrap();
        assert_eq!(payment.status, PaymentStatus::Succeeded);
        assert_eq!(payment.booking_id, booking.id);
        assert!(report.compensation_errors().is_empty());
    }

    #[tokio::test]
    async fn test_declined_card_releases_booking() {
        let h = harness();

        let report = h.coordinator.run(order("pm_card_declined")).await;

        let CheckoutState::Failed {
            failure,
            booking_id,
            receipt,
            errors,
        } = &report.state
        else {
            panic!("expected failure, got {:?}", report.state);
        };
        assert!(matches!(failure, CheckoutFailure::PaymentDeclined(_)));
        assert!(receipt.is_none());
        assert!(errors.is_empty());

        let stored = h.bookings.get(booking_id.unwrap()).await.unwrap().unwrap();
        assert_eq!(stored.status, BookingStatus::Cancelled);
        assert_eq!(h.provider.intent_count(), 0);
    }

    #[tokio::test]
    async fn test_customer_action_leaves_booking_pending() {
        let h = harness();

        let report = h.coordinator.run(order("pm_card_authenticationRequired")).await;

        assert!(matches!(
            report.state,
            CheckoutState::AwaitingCustomerAction { .. }
        ));
        assert_eq!(report.booking.unwrap().status, BookingStatus::Pending);
        assert_eq!(report.payment.unwrap().status, PaymentStatus::RequiresAction);
    }

    #[tokio::test]
    async fn test_failed_confirmation_refunds_and_releases() {
        let h = harness();
        h.bookings.faults.fail_on("transition_status");

        let report = h.coordinator.run(order("pm_card_visa")).await;

        let CheckoutState::Failed {
            failure, errors, ..
        } = &report.state
        else {
            panic!("expected failure, got {:?}", report.state);
        };
        assert!(matches!(failure, CheckoutFailure::ConfirmationFailed(_)));
        assert!(errors.is_empty());

        assert_eq!(h.provider.refunds().len(), 1);
        let payment = report.payment.unwrap();
        assert_eq!(payment.status, PaymentStatus::Refunded);
        assert_eq!(
            h.payments.get(payment.id).await.unwrap().unwrap().status,
            PaymentStatus::Refunded
        );
        assert_eq!(report.booking.unwrap().status, BookingStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_failed_refund_is_reported() {
        let h = harness();
        h.bookings.faults.fail_on("transition_status");
        h.provider.fail_refunds(true);

        let report = h.coordinator.run(order("pm_card_visa")).await;

        assert_eq!(report.compensation_errors().len(), 1);
        assert!(report.compensation_errors()[0].contains("refund"));
        // The booking is still released
        assert_eq!(report.booking.unwrap().status, BookingStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_unreachable_provider_fails_without_payment_record() {
        let h = harness();

        let report = h.coordinator.run(order("pm_unreachable")).await;

        let CheckoutState::Failed { failure, .. } = &report.state else {
            panic!("expected failure, got {:?}", report.state);
        };
        assert!(matches!(failure, CheckoutFailure::PaymentProviderFailed(_)));
        assert!(report.payment.is_none());
        assert_eq!(report.booking.unwrap().status, BookingStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_reservation_failure_has_no_side_effects() {
        let h = harness();
        h.bookings.faults.fail_on("create");

        let report = h.coordinator.run(order("pm_card_visa")).await;

        let CheckoutState::Failed {
            failure,
            booking_id,
            ..
        } = &report.state
        else {
            panic!("expected failure, got {:?}", report.state);
        };
        assert!(matches!(failure, CheckoutFailure::ReservationFailed(_)));
        assert!(booking_id.is_none());
        assert_eq!(h.provider.intent_count(), 0);
        assert_eq!(h.bookings.booking_count().unwrap(), 0);
    }
}
