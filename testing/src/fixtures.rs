//! Record fixtures with plausible defaults.

use chrono::{DateTime, Duration, Utc};
use hotel_booking_core::checkout::CheckoutOrder;
use hotel_booking_core::payment::PAYMENT_METHOD_STRIPE;
use hotel_booking_core::{
    BookingId, ContactInfo, Currency, HotelId, Money, NewBooking, NewHotel, NewPayment, NewReview,
    PaymentStatus, UserId,
};

/// 2025-03-01 15:00 UTC, a stay start after [`crate::test_clock`]
#[must_use]
pub fn check_in() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(1_740_841_200)
}

/// Three nights after [`check_in`]
#[must_use]
pub fn check_out() -> DateTime<Utc> {
    check_in() + Duration::days(3)
}

/// A hotel in `location`
#[must_use]
pub fn new_hotel(name: &str, location: &str) -> NewHotel {
    NewHotel {
        name: name.to_string(),
        description: Some(format!("{name} in {location}")),
        location: location.to_string(),
        address: format!("1 Main Street, {location}"),
        rating: Some(4.5),
        price_per_night: 120.0,
        amenities: vec!["wifi".to_string(), "pool".to_string()],
        images: vec!["https://images.example.com/lobby.jpg".to_string()],
        contact_info: Some(ContactInfo {
            phone: Some("+1 555 0100".to_string()),
            email: Some("frontdesk@example.com".to_string()),
        }),
    }
}

/// A two-guest, three-night booking
#[must_use]
pub fn new_booking(user_id: i64, hotel_id: i64) -> NewBooking {
    NewBooking {
        user_id: UserId::new(user_id),
        hotel_id: HotelId::new(hotel_id),
        check_in: check_in(),
        check_out: check_out(),
        guests: 2,
        total_price: 360.0,
    }
}

/// A succeeded Stripe payment for a booking
#[must_use]
pub fn new_payment(booking_id: i64, user_id: i64, provider_payment_id: &str) -> NewPayment {
    NewPayment {
        amount: Money::from_minor(36_000),
        currency: Currency::Usd,
        status: PaymentStatus::Succeeded,
        provider_payment_id: provider_payment_id.to_string(),
        booking_id: BookingId::new(booking_id),
        user_id: UserId::new(user_id),
        payment_method: PAYMENT_METHOD_STRIPE.to_string(),
    }
}

/// A review with the given rating
#[must_use]
pub fn new_review(hotel_id: i64, user_id: i64, rating: i32) -> NewReview {
    NewReview {
        hotel_id: HotelId::new(hotel_id),
        user_id: UserId::new(user_id),
        rating,
        comment: "Lovely stay, would come back.".to_string(),
    }
}

/// A checkout for [`new_booking`]`(user_id, hotel_id)` paid with `payment_method_id`
#[must_use]
pub fn checkout_order(user_id: i64, hotel_id: i64, payment_method_id: &str, key: &str) -> CheckoutOrder {
    CheckoutOrder {
        user_id: UserId::new(user_id),
        hotel_id: HotelId::new(hotel_id),
        check_in: check_in(),
        check_out: check_out(),
        guests: 2,
        total_price: 360.0,
        amount: Money::from_minor(36_000),
        currency: Currency::Usd,
        payment_method_id: payment_method_id.to_string(),
        idempotency_key: key.to_string(),
    }
}
