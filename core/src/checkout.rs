//! Checkout saga: reserve a room, charge the card, confirm the booking.
//!
//! ```text
//! Start ─► ReserveBooking ─► BookingReserved
//!                               │
//!                               ▼
//!                         ChargePayment ─► PaymentSucceeded ─► ConfirmBooking ─► BookingConfirmed ─► Completed
//!                               │                                   │
//!                               ├─► PaymentRequiresAction ─► AwaitingCustomerAction
//!                               │                                   │
//!                               └─► PaymentDeclined/Failed          └─► ConfirmationFailed
//!                                        │                                   │
//!                                        ▼                                   ▼
//!                                  ReleaseBooking                RefundPayment, ReleaseBooking
//!                                        └──────────────► Failed ◄───────────┘
//! ```
//!
//! The reducer only decides. The coordinator in the service crate executes
//! each [`CheckoutCommand`], turns the outcome into a [`CheckoutAction`] and
//! feeds it back until the state is terminal. Compensations run one at a
//! time, in the order they were planned, and a failed compensation is
//! recorded rather than retried.

use crate::booking::NewBooking;
use crate::reducer::{Effects, Reducer};
use crate::types::{BookingId, Currency, HotelId, Money, PaymentId, UserId};
use chrono::{DateTime, Utc};
use smallvec::{SmallVec, smallvec};

/// Everything a checkout attempt needs, fixed when the attempt starts
#[derive(Clone, Debug, PartialEq)]
pub struct CheckoutOrder {
    /// Booking user
    pub user_id: UserId,
    /// Booked hotel
    pub hotel_id: HotelId,
    /// Arrival
    pub check_in: DateTime<Utc>,
    /// Departure
    pub check_out: DateTime<Utc>,
    /// Number of guests
    pub guests: i32,
    /// Booking total in major units, as stored on the booking
    pub total_price: f64,
    /// Amount to charge
    pub amount: Money,
    /// Charge currency
    pub currency: Currency,
    /// Provider payment method reference
    pub payment_method_id: String,
    /// Client idempotency key, forwarded to the provider
    pub idempotency_key: String,
}

impl CheckoutOrder {
    /// The booking to reserve for this order
    #[must_use]
    pub fn new_booking(&self) -> NewBooking {
        NewBooking {
            user_id: self.user_id,
            hotel_id: self.hotel_id,
            check_in: self.check_in,
            check_out: self.check_out,
            guests: self.guests,
            total_price: self.total_price,
        }
    }
}

/// Reference to a charge the provider accepted
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChargeReceipt {
    /// Local payment record
    pub payment_id: PaymentId,
    /// Provider charge reference
    pub provider_payment_id: String,
    /// Secret the client needs to finish a pending confirmation
    pub client_secret: Option<String>,
}

/// Why a checkout did not complete
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckoutFailure {
    /// The booking could not be created
    ReservationFailed(String),
    /// The card was declined
    PaymentDeclined(String),
    /// The provider failed or could not be reached
    PaymentProviderFailed(String),
    /// The provider charged the card but the local record was not written
    PaymentNotRecorded(String),
    /// The booking left `pending` before it could be confirmed
    ConfirmationConflict(String),
    /// The booking could not be confirmed
    ConfirmationFailed(String),
}

impl CheckoutFailure {
    /// Human readable reason
    #[must_use]
    pub fn reason(&self) -> &str {
        match self {
            Self::ReservationFailed(r)
            | Self::PaymentDeclined(r)
            | Self::PaymentProviderFailed(r)
            | Self::PaymentNotRecorded(r)
            | Self::ConfirmationConflict(r)
            | Self::ConfirmationFailed(r) => r,
        }
    }
}

/// A compensating step
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Compensation {
    /// Refund a captured charge
    Refund {
        /// Local record to mark refunded, if one was written
        payment_id: Option<PaymentId>,
        /// Provider charge to refund
        provider_payment_id: String,
    },
    /// Cancel the reserved booking
    Release(BookingId),
}

impl Compensation {
    fn command(&self) -> CheckoutCommand {
        match self {
            Self::Refund {
                payment_id,
                provider_payment_id,
            } => CheckoutCommand::RefundPayment {
                payment_id: *payment_id,
                provider_payment_id: provider_payment_id.clone(),
            },
            Self::Release(booking_id) => CheckoutCommand::ReleaseBooking {
                booking_id: *booking_id,
            },
        }
    }
}

/// Checkout saga state machine
#[derive(Clone, Debug, Default, PartialEq)]
pub enum CheckoutState {
    /// Not started
    #[default]
    Idle,
    /// Creating the booking
    Reserving {
        /// The order being checked out
        order: CheckoutOrder,
    },
    /// Charging the card
    Charging {
        /// The order being checked out
        order: CheckoutOrder,
        /// Reserved booking
        booking_id: BookingId,
    },
    /// Moving the booking to `confirmed`
    Confirming {
        /// Reserved booking
        booking_id: BookingId,
        /// Accepted charge
        receipt: ChargeReceipt,
    },
    /// The customer must finish the payment; the booking stays `pending`
    AwaitingCustomerAction {
        /// Reserved booking
        booking_id: BookingId,
        /// Charge waiting for the customer
        receipt: ChargeReceipt,
    },
    /// Paid and confirmed
    Completed {
        /// Confirmed booking
        booking_id: BookingId,
        /// Captured charge
        receipt: ChargeReceipt,
    },
    /// Undoing the steps that succeeded
    Compensating {
        /// What went wrong
        failure: CheckoutFailure,
        /// Booking created, if any
        booking_id: Option<BookingId>,
        /// Charge made, if any
        receipt: Option<ChargeReceipt>,
        /// Steps left to run; the first one is in flight
        pending: SmallVec<[Compensation; 2]>,
        /// Failed compensations
        errors: Vec<String>,
    },
    /// Ended without a confirmed booking
    Failed {
        /// What went wrong
        failure: CheckoutFailure,
        /// Booking created, if any
        booking_id: Option<BookingId>,
        /// Charge made, if any
        receipt: Option<ChargeReceipt>,
        /// Failed compensations
        errors: Vec<String>,
    },
}

impl CheckoutState {
    /// Whether the saga has nothing left to do
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed { .. } | Self::AwaitingCustomerAction { .. } | Self::Failed { .. }
        )
    }
}

/// Saga inputs: the start request and the outcome of every command
#[derive(Clone, Debug, PartialEq)]
pub enum CheckoutAction {
    /// Begin a checkout
    Start {
        /// The order to check out
        order: CheckoutOrder,
    },
    /// The booking was created in `pending`
    BookingReserved {
        /// New booking
        booking_id: BookingId,
    },
    /// The booking could not be created
    ReservationFailed {
        /// Failure reason
        reason: String,
    },
    /// The charge was captured
    PaymentSucceeded {
        /// Charge reference
        receipt: ChargeReceipt,
    },
    /// The charge needs customer action before capture
    PaymentRequiresAction {
        /// Charge reference
        receipt: ChargeReceipt,
    },
    /// The card was declined
    PaymentDeclined {
        /// Decline reason
        reason: String,
    },
    /// The provider failed
    PaymentFailed {
        /// Failure reason
        reason: String,
    },
    /// The provider captured the charge but it could not be stored locally
    PaymentNotRecorded {
        /// Provider charge reference
        provider_payment_id: String,
        /// Failure reason
        reason: String,
    },
    /// The booking is now `confirmed`
    BookingConfirmed {
        /// Confirmed booking
        booking_id: BookingId,
    },
    /// The booking could not be confirmed
    ConfirmationFailed {
        /// Whether the booking was no longer `pending`
        conflict: bool,
        /// Failure reason
        reason: String,
    },
    /// Compensation: the charge was refunded
    PaymentRefunded {
        /// Provider charge reference
        provider_payment_id: String,
    },
    /// Compensation: the refund failed
    RefundFailed {
        /// Provider charge reference
        provider_payment_id: String,
        /// Failure reason
        reason: String,
    },
    /// Compensation: the booking was cancelled
    BookingReleased {
        /// Released booking
        booking_id: BookingId,
    },
    /// Compensation: the booking could not be cancelled
    ReleaseFailed {
        /// Booking that stays reserved
        booking_id: BookingId,
        /// Failure reason
        reason: String,
    },
}

/// Work the coordinator must perform
#[derive(Clone, Debug, PartialEq)]
pub enum CheckoutCommand {
    /// Create the booking in `pending`
    ReserveBooking {
        /// Booking to create
        booking: NewBooking,
    },
    /// Create and confirm a charge linked to the booking
    ChargePayment {
        /// Linked booking
        booking_id: BookingId,
        /// Paying user
        user_id: UserId,
        /// Amount to charge
        amount: Money,
        /// Charge currency
        currency: Currency,
        /// Provider payment method reference
        payment_method_id: String,
        /// Forwarded to the provider
        idempotency_key: String,
    },
    /// Compare-and-set the booking from `pending` to `confirmed`
    ConfirmBooking {
        /// Booking to confirm
        booking_id: BookingId,
    },
    /// Refund a charge and mark the local record refunded
    RefundPayment {
        /// Local record, if one was written
        payment_id: Option<PaymentId>,
        /// Provider charge to refund
        provider_payment_id: String,
    },
    /// Cancel the booking
    ReleaseBooking {
        /// Booking to cancel
        booking_id: BookingId,
    },
}

/// Checkout saga reducer
#[derive(Clone, Copy, Debug, Default)]
pub struct CheckoutSaga;

impl CheckoutSaga {
    fn compensate(
        state: &mut CheckoutState,
        failure: CheckoutFailure,
        booking_id: Option<BookingId>,
        receipt: Option<ChargeReceipt>,
        pending: SmallVec<[Compensation; 2]>,
    ) -> Effects<CheckoutCommand> {
        match pending.first().map(Compensation::command) {
            Some(command) => {
                *state = CheckoutState::Compensating {
                    failure,
                    booking_id,
                    receipt,
                    pending,
                    errors: Vec::new(),
                };
                smallvec![command]
            },
            None => {
                *state = CheckoutState::Failed {
                    failure,
                    booking_id,
                    receipt,
                    errors: Vec::new(),
                };
                SmallVec::new()
            },
        }
    }

    /// Advance past the in-flight compensation, recording `error` if it failed
    fn next_compensation(state: &mut CheckoutState, error: Option<String>) -> Effects<CheckoutCommand> {
        let CheckoutState::Compensating {
            failure,
            booking_id,
            receipt,
            mut pending,
            mut errors,
        } = std::mem::take(state)
        else {
            return SmallVec::new();
        };

        if !pending.is_empty() {
            pending.remove(0);
        }
        errors.extend(error);

        match pending.first().map(Compensation::command) {
            Some(command) => {
                *state = CheckoutState::Compensating {
                    failure,
                    booking_id,
                    receipt,
                    pending,
                    errors,
                };
                smallvec![command]
            },
            None => {
                *state = CheckoutState::Failed {
                    failure,
                    booking_id,
                    receipt,
                    errors,
                };
                SmallVec::new()
            },
        }
    }

    fn in_flight(state: &CheckoutState) -> Option<&Compensation> {
        match state {
            CheckoutState::Compensating { pending, .. } => pending.first(),
            _ => None,
        }
    }

    fn is_refund_of(state: &CheckoutState, provider_id: &str) -> bool {
        matches!(
            Self::in_flight(state),
            Some(Compensation::Refund { provider_payment_id, .. }) if provider_payment_id == provider_id
        )
    }

    fn is_release_of(state: &CheckoutState, id: BookingId) -> bool {
        matches!(Self::in_flight(state), Some(Compensation::Release(b)) if *b == id)
    }
}

impl Reducer for CheckoutSaga {
    type State = CheckoutState;
    type Action = CheckoutAction;
    type Effect = CheckoutCommand;
    type Environment = ();

    #[allow(clippy::too_many_lines)] // one arm per saga transition
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        _env: &Self::Environment,
    ) -> Effects<Self::Effect> {
        match (state.clone(), action) {
            (CheckoutState::Idle, CheckoutAction::Start { order }) => {
                let booking = order.new_booking();
                *state = CheckoutState::Reserving { order };
                smallvec![CheckoutCommand::ReserveBooking { booking }]
            },

            (CheckoutState::Reserving { order }, CheckoutAction::BookingReserved { booking_id }) => {
                let command = CheckoutCommand::ChargePayment {
                    booking_id,
                    user_id: order.user_id,
                    amount: order.amount,
                    currency: order.currency,
                    payment_method_id: order.payment_method_id.clone(),
                    idempotency_key: order.idempotency_key.clone(),
                };
                *state = CheckoutState::Charging { order, booking_id };
                smallvec![command]
            },

            (CheckoutState::Reserving { .. }, CheckoutAction::ReservationFailed { reason }) => {
                // Nothing was created, so there is nothing to undo
                *state = CheckoutState::Failed {
                    failure: CheckoutFailure::ReservationFailed(reason),
                    booking_id: None,
                    receipt: None,
                    errors: Vec::new(),
                };
                SmallVec::new()
            },

            (CheckoutState::Charging { booking_id, .. }, CheckoutAction::PaymentSucceeded { receipt }) => {
                *state = CheckoutState::Confirming { booking_id, receipt };
                smallvec![CheckoutCommand::ConfirmBooking { booking_id }]
            },

            (
                CheckoutState::Charging { booking_id, .. },
                CheckoutAction::PaymentRequiresAction { receipt },
            ) => {
                *state = CheckoutState::AwaitingCustomerAction { booking_id, receipt };
                SmallVec::new()
            },

            (CheckoutState::Charging { booking_id, .. }, CheckoutAction::PaymentDeclined { reason }) => {
                Self::compensate(
                    state,
                    CheckoutFailure::PaymentDeclined(reason),
                    Some(booking_id),
                    None,
                    smallvec![Compensation::Release(booking_id)],
                )
            },

            (CheckoutState::Charging { booking_id, .. }, CheckoutAction::PaymentFailed { reason }) => {
                Self::compensate(
                    state,
                    CheckoutFailure::PaymentProviderFailed(reason),
                    Some(booking_id),
                    None,
                    smallvec![Compensation::Release(booking_id)],
                )
            },

            (
                CheckoutState::Charging { booking_id, .. },
                CheckoutAction::PaymentNotRecorded {
                    provider_payment_id,
                    reason,
                },
            ) => Self::compensate(
                state,
                CheckoutFailure::PaymentNotRecorded(reason),
                Some(booking_id),
                None,
                smallvec![
                    Compensation::Refund {
                        payment_id: None,
                        provider_payment_id,
                    },
                    Compensation::Release(booking_id),
                ],
            ),

            (
                CheckoutState::Confirming { booking_id, receipt },
                CheckoutAction::BookingConfirmed {
                    booking_id: confirmed,
                },
            ) if booking_id == confirmed => {
                *state = CheckoutState::Completed { booking_id, receipt };
                SmallVec::new()
            },

            (
                CheckoutState::Confirming { booking_id, receipt },
                CheckoutAction::ConfirmationFailed { conflict, reason },
            ) => {
                let failure = if conflict {
                    CheckoutFailure::ConfirmationConflict(reason)
                } else {
                    CheckoutFailure::ConfirmationFailed(reason)
                };
                let refund = Compensation::Refund {
                    payment_id: Some(receipt.payment_id),
                    provider_payment_id: receipt.provider_payment_id.clone(),
                };
                Self::compensate(
                    state,
                    failure,
                    Some(booking_id),
                    Some(receipt),
                    smallvec![refund, Compensation::Release(booking_id)],
                )
            },

            (
                CheckoutState::Compensating { .. },
                CheckoutAction::PaymentRefunded {
                    provider_payment_id,
                },
            ) if Self::is_refund_of(state, &provider_payment_id) => {
                Self::next_compensation(state, None)
            },

            (
                CheckoutState::Compensating { .. },
                CheckoutAction::RefundFailed {
                    provider_payment_id,
                    reason,
                },
            ) if Self::is_refund_of(state, &provider_payment_id) => Self::next_compensation(
                state,
                Some(format!("refund of {provider_payment_id} failed: {reason}")),
            ),

            (CheckoutState::Compensating { .. }, CheckoutAction::BookingReleased { booking_id })
                if Self::is_release_of(state, booking_id) =>
            {
                Self::next_compensation(state, None)
            },

            (CheckoutState::Compensating { .. }, CheckoutAction::ReleaseFailed { booking_id, reason })
                if Self::is_release_of(state, booking_id) =>
            {
                Self::next_compensation(
                    state,
                    Some(format!("release of booking {booking_id} failed: {reason}")),
                )
            },

            // Duplicate or out-of-order outcome: ignore
            _ => SmallVec::new(),
        }
    }
}
