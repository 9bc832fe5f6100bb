//! Booking Ledger records and the reservation lifecycle.
//!
//! ```text
//! pending ──► confirmed ──► cancelled
//!    │                         ▲
//!    └─────────────────────────┘
//! ```
//!
//! `cancelled` is terminal. Creation always starts in `pending`.

use crate::types::{BookingId, HotelId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reservation status
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    /// Created, not yet paid for
    #[default]
    Pending,
    /// Paid and confirmed
    Confirmed,
    /// Cancelled (terminal)
    Cancelled,
}

impl BookingStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 3] = [Self::Pending, Self::Confirmed, Self::Cancelled];

    /// Whether the lifecycle allows moving from `self` to `next`.
    ///
    /// Staying in the same state is not a transition and returns `false`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Confirmed | Self::Cancelled) | (Self::Confirmed, Self::Cancelled)
        )
    }

    /// Whether no further transition is possible
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Wire and column representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown booking status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown booking status: {0}")]
pub struct UnknownBookingStatus(pub String);

impl FromStr for BookingStatus {
    type Err = UnknownBookingStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownBookingStatus(s.to_string()))
    }
}

/// A reservation of a hotel by a user.
///
/// `check_out` is not required to be after `check_in`; the ledger stores
/// whatever dates the caller supplied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    /// Booking ID
    pub id: BookingId,
    /// Owning user
    pub user_id: UserId,
    /// Reserved hotel
    pub hotel_id: HotelId,
    /// Arrival
    pub check_in: DateTime<Utc>,
    /// Departure
    pub check_out: DateTime<Utc>,
    /// Number of guests
    pub guests: i32,
    /// Total price in major units
    pub total_price: f64,
    /// Lifecycle status
    pub status: BookingStatus,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a booking. The status is always `pending`.
#[derive(Clone, Debug, PartialEq)]
pub struct NewBooking {
    /// Owning user
    pub user_id: UserId,
    /// Reserved hotel
    pub hotel_id: HotelId,
    /// Arrival
    pub check_in: DateTime<Utc>,
    /// Departure
    pub check_out: DateTime<Utc>,
    /// Number of guests
    pub guests: i32,
    /// Total price in major units
    pub total_price: f64,
}

impl NewBooking {
    /// Materialize the record once the store has assigned an id
    #[must_use]
    pub fn into_booking(self, id: BookingId, now: DateTime<Utc>) -> Booking {
        Booking {
            id,
            user_id: self.user_id,
            hotel_id: self.hotel_id,
            check_in: self.check_in,
            check_out: self.check_out,
            guests: self.guests,
            total_price: self.total_price,
            status: BookingStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of a booking. `None` leaves a field untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BookingPatch {
    /// New arrival
    pub check_in: Option<DateTime<Utc>>,
    /// New departure
    pub check_out: Option<DateTime<Utc>>,
    /// New guest count
    pub guests: Option<i32>,
    /// New total price
    pub total_price: Option<f64>,
    /// New status, applied without lifecycle checks
    pub status: Option<BookingStatus>,
}

impl BookingPatch {
    /// Whether the patch changes nothing
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.check_in.is_none()
            && self.check_out.is_none()
            && self.guests.is_none()
            && self.total_price.is_none()
            && self.status.is_none()
    }
}

impl Booking {
    /// Apply a patch in place and bump `updated_at`
    pub fn apply(&mut self, patch: BookingPatch, now: DateTime<Utc>) {
        if let Some(check_in) = patch.check_in {
            self.check_in = check_in;
        }
        if let Some(check_out) = patch.check_out {
            self.check_out = check_out;
        }
        if let Some(guests) = patch.guests {
            self.guests = guests;
        }
        if let Some(total_price) = patch.total_price {
            self.total_price = total_price;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        self.updated_at = now;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn sample(now: DateTime<Utc>) -> Booking {
        NewBooking {
            user_id: UserId::new(1),
            hotel_id: HotelId::new(2),
            check_in: Utc.with_ymd_and_hms(2025, 3, 1, 14, 0, 0).unwrap(),
            check_out: Utc.with_ymd_and_hms(2025, 3, 4, 11, 0, 0).unwrap(),
            guests: 2,
            total_price: 450.0,
        }
        .into_booking(BookingId::new(10), now)
    }

    #[test]
    fn test_allowed_transitions() {
        use BookingStatus::{Cancelled, Confirmed, Pending};
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Cancelled));
        assert!(!Confirmed.can_transition_to(Pending));
        assert!(!Cancelled.can_transition_to(Pending));
        assert!(!Cancelled.can_transition_to(Confirmed));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&BookingStatus::Confirmed).unwrap(),
            "\"confirmed\""
        );
        assert_eq!("cancelled".parse::<BookingStatus>().unwrap(), BookingStatus::Cancelled);
        assert!("Cancelled".parse::<BookingStatus>().is_err());
    }

    #[test]
    fn test_new_booking_starts_pending() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let booking = sample(now);
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.created_at, now);
        assert_eq!(booking.updated_at, now);
    }

    #[test]
    fn test_patch_only_touches_present_fields() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap();
        let mut booking = sample(now);
        let original = booking.clone();

        booking.apply(
            BookingPatch {
                guests: Some(4),
                ..BookingPatch::default()
            },
            later,
        );

        assert_eq!(booking.guests, 4);
        assert_eq!(booking.check_in, original.check_in);
        assert_eq!(booking.total_price, original.total_price);
        assert_eq!(booking.status, original.status);
        assert_eq!(booking.updated_at, later);
    }

    #[test]
    fn test_booking_json_is_camel_case() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let json = serde_json::to_value(sample(now)).unwrap();
        assert_eq!(json["userId"], 1);
        assert_eq!(json["hotelId"], 2);
        assert_eq!(json["status"], "pending");
        assert!(json.get("checkIn").is_some());
        assert!(json.get("totalPrice").is_some());
    }

    fn any_status() -> impl Strategy<Value = BookingStatus> {
        prop_oneof![
            Just(BookingStatus::Pending),
            Just(BookingStatus::Confirmed),
            Just(BookingStatus::Cancelled),
        ]
    }

    proptest! {
        #[test]
        fn prop_cancelled_is_never_left(requests in proptest::collection::vec(any_status(), 0..32)) {
            let mut status = BookingStatus::Pending;
            let mut seen_cancelled = false;
            for next in requests {
                if status.can_transition_to(next) {
                    status = next;
                }
                seen_cancelled |= status == BookingStatus::Cancelled;
                if seen_cancelled {
                    prop_assert_eq!(status, BookingStatus::Cancelled);
                }
            }
        }

        #[test]
        fn prop_confirmed_is_never_reentered_from_pending_after_leaving(
            requests in proptest::collection::vec(any_status(), 0..32)
        ) {
            let mut status = BookingStatus::Pending;
            let mut left_pending = false;
            for next in requests {
                if status.can_transition_to(next) {
                    status = next;
                }
                left_pending |= status != BookingStatus::Pending;
                if left_pending {
                    prop_assert_ne!(status, BookingStatus::Pending);
                }
            }
        }
    }
}
