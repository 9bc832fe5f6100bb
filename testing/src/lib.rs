//! # Hotel Booking Testing
//!
//! Testing utilities for the hotel booking services.
//!
//! This crate provides:
//! - [`FixedClock`]: deterministic, manually advanced time
//! - In-memory implementations of every repository trait in
//!   `hotel-booking-core`, with failure injection
//! - Record fixtures
//! - [`ReducerTest`]: Given-When-Then harness for reducers
//!
//! ## Example
//!
//! ```ignore
//! use hotel_booking_testing::{fixtures, test_clock, InMemoryBookingRepository};
//!
//! #[tokio::test]
//! async fn test_cancel_is_idempotent() {
//!     let clock = test_clock();
//!     let bookings = InMemoryBookingRepository::new();
//!     let booking = bookings.create(fixtures::new_booking(1, 1), clock.now()).await?;
//!     // ...
//! }
//! ```

use chrono::{DateTime, Duration, Utc};
use hotel_booking_core::Clock;

pub mod fixtures;
pub mod reducer_test;
pub mod repositories;

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Duration, Utc};
    use std::sync::{Arc, RwLock};

    /// Fixed clock for deterministic tests
    ///
    /// Returns the same time until moved with [`FixedClock::advance`] or
    /// [`FixedClock::set`]. Clones share the same time.
    ///
    /// # Example
    ///
    /// ```
    /// use hotel_booking_testing::mocks::FixedClock;
    /// use hotel_booking_core::Clock;
    /// use chrono::Duration;
    ///
    /// let clock = FixedClock::default();
    /// let before = clock.now();
    /// assert_eq!(clock.now(), before);
    ///
    /// clock.advance(Duration::hours(1));
    /// assert_eq!(clock.now() - before, Duration::hours(1));
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: Arc<RwLock<DateTime<Utc>>>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(RwLock::new(time)),
            }
        }

        /// Move the clock forward
        pub fn advance(&self, by: Duration) {
            let mut time = self.time.write().unwrap_or_else(std::sync::PoisonError::into_inner);
            *time += by;
        }

        /// Jump to an absolute time
        pub fn set(&self, to: DateTime<Utc>) {
            *self.time.write().unwrap_or_else(std::sync::PoisonError::into_inner) = to;
        }
    }

    /// 2025-01-01 00:00:00 UTC
    impl Default for FixedClock {
        fn default() -> Self {
            Self::new(DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(EPOCH_2025))
        }
    }

    const EPOCH_2025: i64 = 1_735_689_600;

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.read().unwrap_or_else(std::sync::PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::default()
    }
}

/// Install a `tracing` subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs it.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{FixedClock, test_clock};
pub use reducer_test::ReducerTest;
pub use repositories::{
    InMemoryBookingRepository, InMemoryCheckoutLedger, InMemoryHotelRepository,
    InMemoryPaymentRepository, InMemoryReviewRepository,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
        assert_eq!(time1.to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_clones_share_time() {
        let clock = test_clock();
        let other = clock.clone();
        clock.advance(Duration::days(2));
        assert_eq!(other.now(), clock.now());
    }
}
