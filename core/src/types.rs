//! Identifiers and value objects shared by every service.
//!
//! Identifiers are plain database sequence values wrapped in newtypes so a
//! hotel id can never be passed where a booking id is expected. Records only
//! ever reference each other by id; nothing here enforces that a referenced
//! record exists.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            #[doc = concat!("Wrap a raw sequence value as a `", stringify!($name), "`")]
            #[must_use]
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// Get the raw sequence value
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Unique identifier for a hotel
    HotelId
);
define_id!(
    /// Unique identifier for a booking
    BookingId
);
define_id!(
    /// Unique identifier for a locally mirrored payment
    PaymentId
);
define_id!(
    /// Unique identifier for a review
    ReviewId
);
define_id!(
    /// Unique identifier for a user account
    UserId
);

// ============================================================================
// Currency
// ============================================================================

/// Currencies accepted by the payment endpoints.
///
/// All supported currencies have two decimal places, so one major unit is
/// always 100 minor units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    /// US dollar
    #[default]
    Usd,
    /// Euro
    Eur,
    /// Pound sterling
    Gbp,
    /// Canadian dollar
    Cad,
    /// Australian dollar
    Aud,
}

impl Currency {
    /// Every supported currency, in display order.
    pub const ALL: [Self; 5] = [Self::Usd, Self::Eur, Self::Gbp, Self::Cad, Self::Aud];

    /// Lowercase ISO 4217 code, as the payment provider expects it
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Usd => "usd",
            Self::Eur => "eur",
            Self::Gbp => "gbp",
            Self::Cad => "cad",
            Self::Aud => "aud",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error returned when a currency code is not supported.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported currency: {0}")]
pub struct UnsupportedCurrency(pub String);

impl FromStr for Currency {
    type Err = UnsupportedCurrency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.code() == code)
            .ok_or_else(|| UnsupportedCurrency(s.to_string()))
    }
}

// ============================================================================
// Money Value Object (minor units to avoid floating point drift)
// ============================================================================

/// An amount of money held in minor units (cents).
///
/// The HTTP API speaks major units as JSON numbers (`12.5` means twelve and
/// a half dollars), the payment provider speaks minor units. `Money`
/// serializes to major units and converts with [`Money::minor`] for the
/// provider.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    /// Creates a `Money` value from minor units
    #[must_use]
    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Converts a major-unit amount, rounding to the nearest minor unit.
    ///
    /// Returns `None` for negative, non-finite or out-of-range amounts.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_major(major: f64) -> Option<Self> {
        if !major.is_finite() || major < 0.0 {
            return None;
        }
        let minor = (major * 100.0).round();
        // i64::MAX is not exactly representable; stay well inside it
        if minor >= 9.0e18 {
            return None;
        }
        Some(Self(minor as i64))
    }

    /// Amount in minor units
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    /// Amount in major units
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn major(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, (self.0 % 100).abs())
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.major())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let major = f64::deserialize(deserializer)?;
        Self::from_major(major)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid amount: {major}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_money_rounds_to_nearest_minor_unit() {
        assert_eq!(Money::from_major(19.99).unwrap().minor(), 1999);
        assert_eq!(Money::from_major(0.1 + 0.2).unwrap().minor(), 30);
        assert_eq!(Money::from_major(120.0).unwrap().minor(), 12_000);
    }

    #[test]
    fn test_money_rejects_negative_and_nan() {
        assert!(Money::from_major(-1.0).is_none());
        assert!(Money::from_major(f64::NAN).is_none());
        assert!(Money::from_major(f64::INFINITY).is_none());
    }

    #[test]
    fn test_money_serializes_as_major_units() {
        let json = serde_json::to_string(&Money::from_minor(12_550)).unwrap();
        assert_eq!(json, "125.5");
        let back: Money = serde_json::from_str("125.5").unwrap();
        assert_eq!(back.minor(), 12_550);
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_minor(1205).to_string(), "12.05");
    }

    #[test]
    fn test_currency_parse_is_case_insensitive() {
        assert_eq!("USD".parse::<Currency>().unwrap(), Currency::Usd);
        assert_eq!(" eur ".parse::<Currency>().unwrap(), Currency::Eur);
        assert!("xyz".parse::<Currency>().is_err());
    }

    #[test]
    fn test_ids_serialize_transparently() {
        assert_eq!(serde_json::to_string(&HotelId::new(7)).unwrap(), "7");
        let id: BookingId = serde_json::from_str("42").unwrap();
        assert_eq!(id.get(), 42);
    }
}
