//! # Hotel Booking Core
//!
//! Domain types and business rules shared by every hotel booking service.
//!
//! This crate performs no I/O. It defines:
//!
//! - **Records**: hotels, bookings, payments and reviews, with their create
//!   and patch shapes
//! - **Booking lifecycle**: `pending → confirmed → cancelled`, with
//!   `cancelled` terminal
//! - **Stores**: object-safe repository traits implemented by the
//!   PostgreSQL and in-memory backends
//! - **Checkout saga**: a pure [`Reducer`](reducer::Reducer) coordinating
//!   reserve, charge and confirm, with compensation on failure
//!
//! ## Architecture Principles
//!
//! - Functional Core, Imperative Shell
//! - Explicit Effects (reducers return commands, never run them)
//! - Dependency Injection via Environment ([`environment::Clock`])

#![forbid(unsafe_code)]

pub mod booking;
pub mod checkout;
pub mod environment;
pub mod hotel;
pub mod payment;
pub mod reducer;
pub mod review;
pub mod stores;
pub mod types;
pub mod validation;

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use smallvec::{SmallVec, smallvec};

pub use booking::{Booking, BookingPatch, BookingStatus, NewBooking};
pub use environment::{Clock, SystemClock};
pub use hotel::{ContactInfo, Hotel, HotelPatch, NewHotel};
pub use payment::{NewPayment, Payment, PaymentStatus};
pub use reducer::{Effects, Reducer};
pub use review::{NewReview, RatingSummary, Review, ReviewPatch};
pub use stores::{
    BookingRepository, CheckoutLedger, HotelRepository, PaymentRepository, ReviewRepository,
    StoreError, StoreResult,
};
pub use types::{BookingId, Currency, HotelId, Money, PaymentId, ReviewId, UserId};
pub use validation::FieldError;
