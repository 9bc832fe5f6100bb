//! Application state for the HTTP server.
//!
//! Every store is held as a trait object so the same handlers run against
//! `PostgreSQL` in production and in-memory stores in tests.

use crate::payment_provider::SharedPaymentProvider;
use hotel_booking_auth::SharedIdentityProvider;
use hotel_booking_core::{
    BookingRepository, CheckoutLedger, Clock, Currency, HotelRepository, PaymentRepository,
    ReviewRepository,
};
use chrono::Duration;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Cloned (cheaply via Arc) for each request.
#[derive(Clone)]
pub struct AppState {
    /// Hotel Directory
    pub hotels: Arc<dyn HotelRepository>,
    /// Booking Ledger
    pub bookings: Arc<dyn BookingRepository>,
    /// Local payment records
    pub payments: Arc<dyn PaymentRepository>,
    /// Review Store
    pub reviews: Arc<dyn ReviewRepository>,
    /// Checkout idempotency ledger
    pub checkouts: Arc<dyn CheckoutLedger>,
    /// Card processor
    pub provider: SharedPaymentProvider,
    /// Identity provider
    pub identity: SharedIdentityProvider,
    /// Time source for record timestamps
    pub clock: Arc<dyn Clock>,
    /// Currency used when a payment request omits one
    pub default_currency: Currency,
    /// How long an unfinished checkout holds its idempotency key
    pub checkout_lease: Duration,
}
