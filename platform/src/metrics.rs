//! Business metrics for the hotel booking platform.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `hotel_booking_bookings_total{status}` - Bookings by lifecycle event (created, confirmed, cancelled)
//! - `hotel_booking_payments_total{status}` - Provider charges by outcome
//! - `hotel_booking_payment_amount_minor_total{currency}` - Captured amount in minor units
//! - `hotel_booking_refunds_total` - Refunds issued
//! - `hotel_booking_checkouts_total{outcome}` - Checkout attempts by final outcome
//! - `hotel_booking_checkout_compensation_failures_total` - Compensations that failed
//! - `payments_recorded_total{status}` - Payment rows written (storage layer)
//! - `db_errors_total{operation}` - Failed database operations (storage layer)
//!
//! ## Histograms
//! - `hotel_booking_checkout_duration_seconds` - Wall time of a checkout attempt
//! - `hotel_booking_provider_request_duration_seconds{operation}` - Payment provider latency

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and describe every metric.
///
/// Call once at startup. The handle renders the scrape body for `/metrics`.
///
/// # Errors
///
/// Returns [`BuildError`] if a global recorder is already installed.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    register_business_metrics();
    Ok(handle)
}

/// Register all business metric descriptions.
pub fn register_business_metrics() {
    describe_counter!(
        "hotel_booking_bookings_total",
        "Total number of bookings by lifecycle event (created, confirmed, cancelled)"
    );
    describe_counter!(
        "hotel_booking_payments_total",
        "Total number of provider charges by outcome"
    );
    describe_counter!(
        "hotel_booking_payment_amount_minor_total",
        "Total captured amount in minor units"
    );
    describe_counter!("hotel_booking_refunds_total", "Total number of refunds issued");
    describe_counter!(
        "hotel_booking_checkouts_total",
        "Total number of checkout attempts by outcome"
    );
    describe_counter!(
        "hotel_booking_checkout_compensation_failures_total",
        "Compensating steps that failed and need manual reconciliation"
    );
    describe_counter!("payments_recorded_total", "Payment rows written by status");
    describe_counter!("db_errors_total", "Failed database operations");

    describe_histogram!(
        "hotel_booking_checkout_duration_seconds",
        "Time taken by a checkout attempt, including compensation"
    );
    describe_histogram!(
        "hotel_booking_provider_request_duration_seconds",
        "Latency of payment provider requests"
    );

    tracing::info!("Business metrics registered");
}

// ============================================================================
// Metric Recording Functions
// ============================================================================

/// Record a booking lifecycle event (`created`, `confirmed`, `cancelled`).
pub fn record_booking(status: &'static str) {
    metrics::counter!("hotel_booking_bookings_total", "status" => status).increment(1);
}

/// Record a provider charge with its resulting status.
pub fn record_payment(status: &'static str) {
    metrics::counter!("hotel_booking_payments_total", "status" => status).increment(1);
}

/// Record a captured amount.
pub fn record_payment_captured(amount_minor: i64, currency: &'static str) {
    let amount = u64::try_from(amount_minor).unwrap_or_default();
    metrics::counter!("hotel_booking_payment_amount_minor_total", "currency" => currency)
        .increment(amount);
}

/// Record a refund.
pub fn record_refund() {
    metrics::counter!("hotel_booking_refunds_total").increment(1);
}

/// Record a finished checkout attempt.
pub fn record_checkout(outcome: &'static str, duration_secs: f64) {
    metrics::counter!("hotel_booking_checkouts_total", "outcome" => outcome).increment(1);
    metrics::histogram!("hotel_booking_checkout_duration_seconds").record(duration_secs);
}

/// Record compensations that failed.
pub fn record_compensation_failures(count: usize) {
    if count > 0 {
        metrics::counter!("hotel_booking_checkout_compensation_failures_total")
            .increment(u64::try_from(count).unwrap_or(u64::MAX));
    }
}

/// Record the latency of one provider request.
pub fn record_provider_request(operation: &'static str, duration_secs: f64) {
    metrics::histogram!("hotel_booking_provider_request_duration_seconds", "operation" => operation)
        .record(duration_secs);
}
