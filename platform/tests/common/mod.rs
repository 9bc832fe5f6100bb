//! Shared harness for the HTTP tests: the real router over in-memory stores
//! and the mock payment provider.

#![allow(dead_code)] // Each test binary uses a subset
#![allow(clippy::unwrap_used)]

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use chrono::Duration;
use hotel_booking::{AppState, MockPaymentProvider, RouterConfig, ServicesConfig, build_router};
use hotel_booking_auth::LocalIdentityProvider;
use hotel_booking_auth::mocks::{MockSessionStore, MockUserStore};
use hotel_booking_core::Currency;
use hotel_booking_testing::{
    FixedClock, InMemoryBookingRepository, InMemoryCheckoutLedger, InMemoryHotelRepository,
    InMemoryPaymentRepository, InMemoryReviewRepository, init_test_tracing,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

/// Router plus handles on everything behind it.
pub struct TestApp {
    pub router: Router,
    pub hotels: InMemoryHotelRepository,
    pub bookings: InMemoryBookingRepository,
    pub payments: InMemoryPaymentRepository,
    pub reviews: InMemoryReviewRepository,
    pub checkouts: InMemoryCheckoutLedger,
    pub provider: MockPaymentProvider,
    pub clock: FixedClock,
}

/// Response status, headers and JSON body (`Value::String` for text bodies)
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Every service enabled
pub fn test_app() -> TestApp {
    test_app_with(ServicesConfig::all())
}

pub fn test_app_with(services: ServicesConfig) -> TestApp {
    init_test_tracing();

    let hotels = InMemoryHotelRepository::new();
    let bookings = InMemoryBookingRepository::new();
    let payments = InMemoryPaymentRepository::new();
    let reviews = InMemoryReviewRepository::new();
    let checkouts = InMemoryCheckoutLedger::new();
    let provider = MockPaymentProvider::new();
    let clock = FixedClock::default();

    let identity = LocalIdentityProvider::new(
        Arc::new(MockUserStore::new()),
        Arc::new(MockSessionStore::new()),
        Arc::new(clock.clone()),
    );

    let state = AppState {
        hotels: Arc::new(hotels.clone()),
        bookings: Arc::new(bookings.clone()),
        payments: Arc::new(payments.clone()),
        reviews: Arc::new(reviews.clone()),
        checkouts: Arc::new(checkouts.clone()),
        provider: Arc::new(provider.clone()),
        identity: Arc::new(identity),
        clock: Arc::new(clock.clone()),
        default_currency: Currency::Usd,
        checkout_lease: Duration::minutes(5),
    };

    let router = build_router(
        state,
        RouterConfig {
            services,
            ..RouterConfig::default()
        },
    );

    TestApp {
        router,
        hotels,
        bookings,
        payments,
        reviews,
        checkouts,
        provider,
        clock,
    }
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            },
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(Method::GET, uri, None, &[]).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> TestResponse {
        self.request(Method::POST, uri, Some(body), &[]).await
    }

    pub async fn post_empty(&self, uri: &str) -> TestResponse {
        self.request(Method::POST, uri, None, &[]).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, Some(body), &[]).await
    }

    pub async fn delete(&self, uri: &str) -> TestResponse {
        self.request(Method::DELETE, uri, None, &[]).await
    }
}

/// Paths of the itemised validation errors in an error body
pub fn error_paths(body: &Value) -> Vec<String> {
    body["errors"]
        .as_array()
        .map(|errors| {
            errors
                .iter()
                .filter_map(|e| e["path"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
