//! Given-When-Then tests of the checkout saga as the coordinator drives it.

#![allow(clippy::unwrap_used)]

use hotel_booking_core::checkout::{
    ChargeReceipt, CheckoutAction, CheckoutCommand, CheckoutFailure, CheckoutSaga, CheckoutState,
};
use hotel_booking_core::{BookingId, PaymentId};
use hotel_booking_testing::reducer_test::assertions::{assert_no_effects, assert_single_effect};
use hotel_booking_testing::{ReducerTest, fixtures};

fn receipt() -> ChargeReceipt {
    ChargeReceipt {
        payment_id: PaymentId::new(11),
        provider_payment_id: "pi_mock_000001".to_string(),
        client_secret: Some("pi_mock_000001_secret_mock".to_string()),
    }
}

fn start() -> CheckoutAction {
    CheckoutAction::Start {
        order: fixtures::checkout_order(7, 3, "pm_card_visa", "checkout-attempt-0001"),
    }
}

#[test]
fn test_start_reserves_a_pending_booking() {
    ReducerTest::new(CheckoutSaga)
        .with_env(())
        .given_state(CheckoutState::Idle)
        .when_action(start())
        .then_state(|state| assert!(matches!(state, CheckoutState::Reserving { .. })))
        .then_effects(|effects| {
            assert!(matches!(effects, [CheckoutCommand::ReserveBooking { booking }] if booking.guests > 0));
        })
        .run();
}

#[test]
fn test_captured_charge_confirms_the_booking() {
    let booking_id = BookingId::new(5);

    ReducerTest::new(CheckoutSaga)
        .with_env(())
        .given_state(CheckoutState::Idle)
        .when_action(start())
        .when_action(CheckoutAction::BookingReserved { booking_id })
        .when_action(CheckoutAction::PaymentSucceeded { receipt: receipt() })
        .then_state(move |state| {
            assert_eq!(
                state,
                &CheckoutState::Confirming {
                    booking_id,
                    receipt: receipt(),
                }
            );
        })
        .then_effects(move |effects| {
            assert_single_effect(effects, &CheckoutCommand::ConfirmBooking { booking_id });
        })
        .run();
}

#[test]
fn test_customer_action_ends_without_confirming() {
    let booking_id = BookingId::new(5);

    ReducerTest::new(CheckoutSaga)
        .with_env(())
        .given_state(CheckoutState::Idle)
        .when_action(start())
        .when_action(CheckoutAction::BookingReserved { booking_id })
        .when_action(CheckoutAction::PaymentRequiresAction { receipt: receipt() })
        .then_state(|state| assert!(state.is_terminal()))
        .then_effects(assert_no_effects)
        .run();
}

#[test]
fn test_declined_charge_releases_the_booking() {
    let booking_id = BookingId::new(5);

    ReducerTest::new(CheckoutSaga)
        .with_env(())
        .given_state(CheckoutState::Idle)
        .when_action(start())
        .when_action(CheckoutAction::BookingReserved { booking_id })
        .when_action(CheckoutAction::PaymentDeclined {
            reason: "Your card was declined.".to_string(),
        })
        .when_action(CheckoutAction::BookingReleased { booking_id })
        .then_state(move |state| {
            assert!(matches!(
                state,
                CheckoutState::Failed {
                    failure: CheckoutFailure::PaymentDeclined(_),
                    booking_id: Some(id),
                    errors,
                    ..
                } if *id == booking_id && errors.is_empty()
            ));
        })
        .then_effects(assert_no_effects)
        .run();
}
