//! Checkout endpoint tests: the saga outcomes as seen over HTTP and the
//! idempotency contract of the `Idempotency-Key` header.

#![allow(clippy::unwrap_used)]

mod common;

use axum::http::{Method, StatusCode};
use common::{TestApp, TestResponse, error_paths, test_app};
use hotel_booking_core::{BookingId, BookingRepository, BookingStatus, PaymentStatus};
use serde_json::{Value, json};
use std::time::Duration;

const KEY: &str = "checkout-attempt-0001";

fn order(payment_method: &str) -> Value {
    json!({
        "userId": 7,
        "hotelId": 3,
        "checkIn": "2025-06-01T15:00:00Z",
        "checkOut": "2025-06-03T11:00:00Z",
        "guests": 2,
        "totalPrice": 320.0,
        "currency": "usd",
        "paymentMethodId": payment_method
    })
}

async fn checkout(app: &TestApp, key: &str, body: Value) -> TestResponse {
    app.request(
        Method::POST,
        "/api/checkout",
        Some(body),
        &[("idempotency-key", key)],
    )
    .await
}

async fn booking_status(app: &TestApp, id: &Value) -> BookingStatus {
    app.bookings
        .get(BookingId::new(id.as_i64().unwrap()))
        .await
        .unwrap()
        .unwrap()
        .status
}

#[tokio::test]
async fn test_checkout_confirms_and_pays() {
    let app = test_app();

    let response = checkout(&app, KEY, order("pm_card_visa")).await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["status"], "confirmed");
    assert_eq!(response.body["booking"]["status"], "confirmed");
    assert_eq!(response.body["payment"]["status"], "succeeded");
    assert_eq!(response.body["payment"]["amount"], 320.0);
    assert_eq!(response.body["payment"]["bookingId"], response.body["booking"]["id"]);
    assert!(response.body["clientSecret"].is_string());
    assert!(!response.headers.contains_key("idempotent-replayed"));
}

#[tokio::test]
async fn test_retry_replays_recorded_response() {
    let app = test_app();

    let first = checkout(&app, KEY, order("pm_card_visa")).await;
    let second = checkout(&app, KEY, order("pm_card_visa")).await;

    assert_eq!(second.status, first.status);
    assert_eq!(second.body, first.body);
    assert_eq!(second.headers["idempotent-replayed"], "true");
    assert_eq!(app.provider.intent_count(), 1);
    assert_eq!(app.bookings.booking_count().unwrap(), 1);
    assert_eq!(app.payments.all().unwrap().len(), 1);
}

#[tokio::test]
async fn test_key_reused_for_different_order_conflicts() {
    let app = test_app();
    checkout(&app, KEY, order("pm_card_visa")).await;

    let mut changed = order("pm_card_visa");
    changed["guests"] = json!(4);
    let response = checkout(&app, KEY, changed).await;

    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["code"], "CONFLICT");
    assert_eq!(app.bookings.booking_count().unwrap(), 1);
}

#[tokio::test]
async fn test_idempotency_key_is_required() {
    let app = test_app();

    let missing = app.post("/api/checkout", order("pm_card_visa")).await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(error_paths(&missing.body), vec!["Idempotency-Key"]);

    let short = checkout(&app, "too-short", order("pm_card_visa")).await;
    assert_eq!(short.status, StatusCode::BAD_REQUEST);
    assert_eq!(error_paths(&short.body), vec!["Idempotency-Key"]);

    assert_eq!(app.bookings.booking_count().unwrap(), 0);
}

#[tokio::test]
async fn test_invalid_order_is_rejected_before_any_work() {
    let app = test_app();

    let mut body = order("");
    body["guests"] = json!(0);
    let response = checkout(&app, KEY, body).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(error_paths(&response.body), vec!["guests", "paymentMethodId"]);
    assert_eq!(app.checkouts.response(KEY).unwrap(), None);
    assert_eq!(app.provider.intent_count(), 0);
}

#[tokio::test]
async fn test_declined_card_releases_booking() {
    let app = test_app();

    let response = checkout(&app, KEY, order("pm_card_chargeDeclined")).await;

    assert_eq!(response.status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(response.body["code"], "PAYMENT_DECLINED");
    assert_eq!(response.body["compensationErrors"], json!([]));
    assert_eq!(
        booking_status(&app, &response.body["bookingId"]).await,
        BookingStatus::Cancelled
    );
    assert!(app.payments.all().unwrap().is_empty());

    // The failure is recorded and replayed
    let again = checkout(&app, KEY, order("pm_card_chargeDeclined")).await;
    assert_eq!(again.status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(app.bookings.booking_count().unwrap(), 1);
}

#[tokio::test]
async fn test_customer_action_leaves_booking_pending() {
    let app = test_app();

    let response = checkout(&app, KEY, order("pm_card_authenticationRequired")).await;

    assert_eq!(response.status, StatusCode::ACCEPTED);
    assert_eq!(response.body["status"], "requires_action");
    assert_eq!(response.body["booking"]["status"], "pending");
    assert_eq!(response.body["payment"]["status"], "requires_action");
    assert!(response.body["clientSecret"].is_string());
}

#[tokio::test]
async fn test_failed_confirmation_refunds_and_releases() {
    let app = test_app();
    app.bookings.faults.fail_on("transition_status");

    let response = checkout(&app, KEY, order("pm_card_visa")).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["compensationErrors"], json!([]));
    assert_eq!(app.provider.refunds().len(), 1);
    assert_eq!(
        booking_status(&app, &response.body["bookingId"]).await,
        BookingStatus::Cancelled
    );

    let payments = app.payments.all().unwrap();
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0].status, PaymentStatus::Refunded);
}

#[tokio::test]
async fn test_failed_refund_is_reported() {
    let app = test_app();
    app.bookings.faults.fail_on("transition_status");
    app.provider.fail_refunds(true);

    let response = checkout(&app, KEY, order("pm_card_visa")).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["compensationErrors"].as_array().unwrap().len(), 1);
    assert!(app.provider.refunds().is_empty());
    // The release still ran
    assert_eq!(
        booking_status(&app, &response.body["bookingId"]).await,
        BookingStatus::Cancelled
    );
}

#[tokio::test]
async fn test_reservation_failure_frees_the_key() {
    let app = test_app();
    app.bookings.faults.fail_on("create");

    let failed = checkout(&app, KEY, order("pm_card_visa")).await;
    assert_eq!(failed.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(failed.body["code"], "SERVICE_UNAVAILABLE");
    assert_eq!(app.provider.intent_count(), 0);
    assert_eq!(app.checkouts.response(KEY).unwrap(), None);

    app.bookings.faults.clear();
    let retried = checkout(&app, KEY, order("pm_card_visa")).await;
    assert_eq!(retried.status, StatusCode::CREATED);
    assert!(!retried.headers.contains_key("idempotent-replayed"));
}

#[tokio::test]
async fn test_unreachable_provider_releases_booking() {
    let app = test_app();

    let response = checkout(&app, KEY, order("pm_unreachable")).await;

    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    assert_eq!(response.body["code"], "PAYMENT_PROVIDER_ERROR");
    assert_eq!(
        booking_status(&app, &response.body["bookingId"]).await,
        BookingStatus::Cancelled
    );
}

#[tokio::test]
async fn test_client_disconnect_does_not_stop_checkout() {
    let app = test_app();
    app.provider.delay_charges(Duration::from_millis(200));

    // The client gives up while the charge is in flight
    let dropped =
        tokio::time::timeout(Duration::from_millis(50), checkout(&app, KEY, order("pm_card_visa"))).await;
    assert!(dropped.is_err());

    let recorded = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Some(stored) = app.checkouts.response(KEY).unwrap() {
                return stored;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(recorded.status, 201);
    assert_eq!(
        booking_status(&app, &recorded.body["booking"]["id"]).await,
        BookingStatus::Confirmed
    );

    let retried = checkout(&app, KEY, order("pm_card_visa")).await;
    assert_eq!(retried.status, StatusCode::CREATED);
    assert_eq!(retried.headers["idempotent-replayed"], "true");
    assert_eq!(retried.body, recorded.body);
    assert_eq!(app.provider.intent_count(), 1);
}

#[tokio::test]
async fn test_unrecorded_attempt_is_retried_after_its_lease() {
    let app = test_app();
    app.checkouts.faults.fail_on("complete");

    let first = checkout(&app, KEY, order("pm_card_visa")).await;
    assert_eq!(first.status, StatusCode::CREATED);

    let blocked = checkout(&app, KEY, order("pm_card_visa")).await;
    assert_eq!(blocked.status, StatusCode::CONFLICT);

    app.checkouts.faults.clear();
    app.clock.advance(chrono::Duration::minutes(5));
    let retried = checkout(&app, KEY, order("pm_card_visa")).await;
    assert_eq!(retried.status, StatusCode::CREATED);
    assert!(!retried.headers.contains_key("idempotent-replayed"));
    // The provider saw the same idempotency key and did not charge twice
    assert_eq!(app.provider.intent_count(), 1);
    assert!(app.checkouts.response(KEY).unwrap().is_some());
}
