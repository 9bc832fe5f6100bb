//! In-memory repositories for fast, deterministic tests.
//!
//! Every repository is cheap to clone; clones share the same records, so a
//! test can keep a handle for assertions after handing one to the router.
//! [`Faults`] lets a test make chosen operations fail with
//! [`StoreError::Unavailable`].

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use hotel_booking_core::stores::{BeginOutcome, StoredResponse};
use hotel_booking_core::{
    Booking, BookingId, BookingPatch, BookingRepository, BookingStatus, CheckoutLedger, Hotel,
    HotelId, HotelPatch, HotelRepository, NewBooking, NewHotel, NewPayment, NewReview, Payment,
    PaymentId, PaymentRepository, PaymentStatus, RatingSummary, Review, ReviewId, ReviewPatch,
    ReviewRepository, StoreError, StoreResult, UserId,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

fn read<T>(lock: &RwLock<T>) -> StoreResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
}

fn write<T>(lock: &RwLock<T>) -> StoreResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
}

/// Operations that should fail, by method name.
#[derive(Clone, Debug, Default)]
pub struct Faults {
    failing: Arc<RwLock<HashSet<&'static str>>>,
}

impl Faults {
    /// Make `operation` (e.g. `"transition_status"`) fail until cleared
    pub fn fail_on(&self, operation: &'static str) {
        if let Ok(mut failing) = self.failing.write() {
            failing.insert(operation);
        }
    }

    /// Make every operation succeed again
    pub fn clear(&self) {
        if let Ok(mut failing) = self.failing.write() {
            failing.clear();
        }
    }

    fn check(&self, operation: &'static str) -> StoreResult<()> {
        if read(&self.failing)?.contains(operation) {
            return Err(StoreError::Unavailable(format!("{operation} failed (injected)")));
        }
        Ok(())
    }
}

#[derive(Debug)]
struct Table<T> {
    rows: Vec<T>,
    next_id: i64,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            next_id: 1,
        }
    }
}

impl<T> Table<T> {
    fn allocate(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// Newest first; ids break ties between records created at the same instant.
fn newest_first<T, K: Ord>(mut rows: Vec<T>, key: impl Fn(&T) -> (DateTime<Utc>, K)) -> Vec<T> {
    rows.sort_by(|a, b| key(b).cmp(&key(a)));
    rows
}

/// In-memory [`HotelRepository`].
#[derive(Clone, Debug, Default)]
pub struct InMemoryHotelRepository {
    table: Arc<RwLock<Table<Hotel>>>,
    /// Failure injection
    pub faults: Faults,
}

impl InMemoryHotelRepository {
    /// Create an empty repository
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HotelRepository for InMemoryHotelRepository {
    async fn list(&self) -> StoreResult<Vec<Hotel>> {
        self.faults.check("list")?;
        Ok(read(&self.table)?.rows.clone())
    }

    async fn get(&self, id: HotelId) -> StoreResult<Option<Hotel>> {
        self.faults.check("get")?;
        Ok(read(&self.table)?.rows.iter().find(|h| h.id == id).cloned())
    }

    async fn create(&self, hotel: NewHotel, now: DateTime<Utc>) -> StoreResult<Hotel> {
        self.faults.check("create")?;
        let mut table = write(&self.table)?;
        let hotel = hotel.into_hotel(HotelId::new(table.allocate()), now);
        table.rows.push(hotel.clone());
        Ok(hotel)
    }

    async fn update(&self, id: HotelId, patch: HotelPatch, now: DateTime<Utc>) -> StoreResult<Hotel> {
        self.faults.check("update")?;
        let mut table = write(&self.table)?;
        let hotel = table
            .rows
            .iter_mut()
            .find(|h| h.id == id)
            .ok_or_else(|| StoreError::not_found("Hotel", id))?;
        hotel.apply(patch, now);
        Ok(hotel.clone())
    }

    async fn delete(&self, id: HotelId) -> StoreResult<()> {
        self.faults.check("delete")?;
        let mut table = write(&self.table)?;
        let before = table.rows.len();
        table.rows.retain(|h| h.id != id);
        if table.rows.len() == before {
            return Err(StoreError::not_found("Hotel", id));
        }
        Ok(())
    }

    async fn search(&self, location: &str) -> StoreResult<Vec<Hotel>> {
        self.faults.check("search")?;
        Ok(read(&self.table)?
            .rows
            .iter()
            .filter(|h| h.matches_location(location))
            .cloned()
            .collect())
    }
}

/// In-memory [`BookingRepository`].
#[derive(Clone, Debug, Default)]
pub struct InMemoryBookingRepository {
    table: Arc<RwLock<Table<Booking>>>,
    /// Failure injection
    pub faults: Faults,
}

impl InMemoryBookingRepository {
    /// Create an empty repository
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored bookings (for testing)
    ///
    /// # Errors
    ///
    /// Returns error if the lock is poisoned.
    pub fn booking_count(&self) -> StoreResult<usize> {
        Ok(read(&self.table)?.rows.len())
    }

    fn select(&self, filter: impl Fn(&Booking) -> bool) -> StoreResult<Vec<Booking>> {
        let rows = read(&self.table)?
            .rows
            .iter()
            .filter(|b| filter(b))
            .cloned()
            .collect();
        Ok(newest_first(rows, |b| (b.created_at, b.id.get())))
    }

    fn modify(
        &self,
        id: BookingId,
        change: impl FnOnce(&mut Booking) -> StoreResult<()>,
    ) -> StoreResult<Booking> {
        let mut table = write(&self.table)?;
        let booking = table
            .rows
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| StoreError::not_found("Booking", id))?;
        change(booking)?;
        Ok(booking.clone())
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn list(&self) -> StoreResult<Vec<Booking>> {
        self.faults.check("list")?;
        self.select(|_| true)
    }

    async fn get(&self, id: BookingId) -> StoreResult<Option<Booking>> {
        self.faults.check("get")?;
        Ok(read(&self.table)?.rows.iter().find(|b| b.id == id).cloned())
    }

    async fn create(&self, booking: NewBooking, now: DateTime<Utc>) -> StoreResult<Booking> {
        self.faults.check("create")?;
        let mut table = write(&self.table)?;
        let booking = booking.into_booking(BookingId::new(table.allocate()), now);
        table.rows.push(booking.clone());
        Ok(booking)
    }

    async fn update(
        &self,
        id: BookingId,
        patch: BookingPatch,
        now: DateTime<Utc>,
    ) -> StoreResult<Booking> {
        self.faults.check("update")?;
        self.modify(id, |booking| {
            booking.apply(patch, now);
            Ok(())
        })
    }

    async fn delete(&self, id: BookingId) -> StoreResult<()> {
        self.faults.check("delete")?;
        let mut table = write(&self.table)?;
        let before = table.rows.len();
        table.rows.retain(|b| b.id != id);
        if table.rows.len() == before {
            return Err(StoreError::not_found("Booking", id));
        }
        Ok(())
    }

    async fn list_by_user(&self, user_id: UserId) -> StoreResult<Vec<Booking>> {
        self.faults.check("list_by_user")?;
        self.select(|b| b.user_id == user_id)
    }

    async fn list_by_hotel(&self, hotel_id: HotelId) -> StoreResult<Vec<Booking>> {
        self.faults.check("list_by_hotel")?;
        self.select(|b| b.hotel_id == hotel_id)
    }

    async fn set_status(
        &self,
        id: BookingId,
        status: BookingStatus,
        now: DateTime<Utc>,
    ) -> StoreResult<Booking> {
        self.faults.check("set_status")?;
        self.modify(id, |booking| {
            booking.status = status;
            booking.updated_at = now;
            Ok(())
        })
    }

    async fn transition_status(
        &self,
        id: BookingId,
        from: BookingStatus,
        to: BookingStatus,
        now: DateTime<Utc>,
    ) -> StoreResult<Booking> {
        self.faults.check("transition_status")?;
        self.modify(id, |booking| {
            if booking.status != from {
                return Err(StoreError::Conflict(format!(
                    "booking {id} is {}, expected {}",
                    booking.status, from
                )));
            }
            booking.status = to;
            booking.updated_at = now;
            Ok(())
        })
    }
}

/// In-memory [`PaymentRepository`].
#[derive(Clone, Debug, Default)]
pub struct InMemoryPaymentRepository {
    table: Arc<RwLock<Table<Payment>>>,
    /// Failure injection
    pub faults: Faults,
}

impl InMemoryPaymentRepository {
    /// Create an empty repository
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored payments, oldest first (for testing)
    ///
    /// # Errors
    ///
    /// Returns error if the lock is poisoned.
    pub fn all(&self) -> StoreResult<Vec<Payment>> {
        Ok(read(&self.table)?.rows.clone())
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn create(&self, payment: NewPayment, now: DateTime<Utc>) -> StoreResult<Payment> {
        self.faults.check("create")?;
        let mut table = write(&self.table)?;
        let payment = payment.into_payment(PaymentId::new(table.allocate()), now);
        table.rows.push(payment.clone());
        Ok(payment)
    }

    async fn get(&self, id: PaymentId) -> StoreResult<Option<Payment>> {
        self.faults.check("get")?;
        Ok(read(&self.table)?.rows.iter().find(|p| p.id == id).cloned())
    }

    async fn list_by_user(&self, user_id: UserId) -> StoreResult<Vec<Payment>> {
        self.faults.check("list_by_user")?;
        let rows = read(&self.table)?
            .rows
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(rows, |p| (p.created_at, p.id.get())))
    }

    async fn set_status(
        &self,
        id: PaymentId,
        status: PaymentStatus,
        now: DateTime<Utc>,
    ) -> StoreResult<Payment> {
        self.faults.check("set_status")?;
        let mut table = write(&self.table)?;
        let payment = table
            .rows
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StoreError::not_found("Payment", id))?;
        payment.status = status;
        payment.updated_at = now;
        Ok(payment.clone())
    }
}

/// In-memory [`ReviewRepository`].
#[derive(Clone, Debug, Default)]
pub struct InMemoryReviewRepository {
    table: Arc<RwLock<Table<Review>>>,
    /// Failure injection
    pub faults: Faults,
}

impl InMemoryReviewRepository {
    /// Create an empty repository
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn select(&self, filter: impl Fn(&Review) -> bool) -> StoreResult<Vec<Review>> {
        let rows = read(&self.table)?
            .rows
            .iter()
            .filter(|r| filter(r))
            .cloned()
            .collect();
        Ok(newest_first(rows, |r| (r.created_at, r.id.get())))
    }
}

#[async_trait]
impl ReviewRepository for InMemoryReviewRepository {
    async fn list(&self) -> StoreResult<Vec<Review>> {
        self.faults.check("list")?;
        self.select(|_| true)
    }

    async fn get(&self, id: ReviewId) -> StoreResult<Option<Review>> {
        self.faults.check("get")?;
        Ok(read(&self.table)?.rows.iter().find(|r| r.id == id).cloned())
    }

    async fn create(&self, review: NewReview, now: DateTime<Utc>) -> StoreResult<Review> {
        self.faults.check("create")?;
        let mut table = write(&self.table)?;
        let review = review.into_review(ReviewId::new(table.allocate()), now);
        table.rows.push(review.clone());
        Ok(review)
    }

    async fn update(
        &self,
        id: ReviewId,
        patch: ReviewPatch,
        now: DateTime<Utc>,
    ) -> StoreResult<Review> {
        self.faults.check("update")?;
        let mut table = write(&self.table)?;
        let review = table
            .rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::not_found("Review", id))?;
        review.apply(patch, now);
        Ok(review.clone())
    }

    async fn delete(&self, id: ReviewId) -> StoreResult<()> {
        self.faults.check("delete")?;
        let mut table = write(&self.table)?;
        let before = table.rows.len();
        table.rows.retain(|r| r.id != id);
        if table.rows.len() == before {
            return Err(StoreError::not_found("Review", id));
        }
        Ok(())
    }

    async fn list_by_hotel(&self, hotel_id: HotelId) -> StoreResult<Vec<Review>> {
        self.faults.check("list_by_hotel")?;
        self.select(|r| r.hotel_id == hotel_id)
    }

    async fn list_by_user(&self, user_id: UserId) -> StoreResult<Vec<Review>> {
        self.faults.check("list_by_user")?;
        self.select(|r| r.user_id == user_id)
    }

    async fn rating_summary(&self, hotel_id: HotelId) -> StoreResult<RatingSummary> {
        self.faults.check("rating_summary")?;
        let table = read(&self.table)?;
        Ok(RatingSummary::from_ratings(
            table
                .rows
                .iter()
                .filter(|r| r.hotel_id == hotel_id)
                .map(|r| r.rating),
        ))
    }
}

#[derive(Clone, Debug)]
struct Attempt {
    user_id: UserId,
    fingerprint: String,
    claimed_at: DateTime<Utc>,
    response: Option<StoredResponse>,
}

/// In-memory [`CheckoutLedger`].
#[derive(Clone, Debug, Default)]
pub struct InMemoryCheckoutLedger {
    attempts: Arc<RwLock<HashMap<String, Attempt>>>,
    /// Failure injection
    pub faults: Faults,
}

impl InMemoryCheckoutLedger {
    /// Create an empty ledger
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The recorded response for `key`, if the attempt finished (for testing)
    ///
    /// # Errors
    ///
    /// Returns error if the lock is poisoned.
    pub fn response(&self, key: &str) -> StoreResult<Option<StoredResponse>> {
        Ok(read(&self.attempts)?
            .get(key)
            .and_then(|attempt| attempt.response.clone()))
    }
}

#[async_trait]
impl CheckoutLedger for InMemoryCheckoutLedger {
    async fn begin(
        &self,
        key: &str,
        user_id: UserId,
        fingerprint: &str,
        now: DateTime<Utc>,
        lease: Duration,
    ) -> StoreResult<BeginOutcome> {
        self.faults.check("begin")?;
        let mut attempts = write(&self.attempts)?;
        let Some(attempt) = attempts.get_mut(key) else {
            attempts.insert(
                key.to_string(),
                Attempt {
                    user_id,
                    fingerprint: fingerprint.to_string(),
                    claimed_at: now,
                    response: None,
                },
            );
            return Ok(BeginOutcome::Started);
        };

        if attempt.fingerprint != fingerprint || attempt.user_id != user_id {
            return Ok(BeginOutcome::Mismatch);
        }
        match &attempt.response {
            Some(response) => Ok(BeginOutcome::Completed(response.clone())),
            None if attempt.claimed_at + lease <= now => {
                attempt.claimed_at = now;
                Ok(BeginOutcome::Started)
            },
            None => Ok(BeginOutcome::InProgress),
        }
    }

    async fn complete(
        &self,
        key: &str,
        response: &StoredResponse,
        _now: DateTime<Utc>,
    ) -> StoreResult<()> {
        self.faults.check("complete")?;
        let mut attempts = write(&self.attempts)?;
        let attempt = attempts
            .get_mut(key)
            .ok_or_else(|| StoreError::not_found("Checkout attempt", key))?;
        attempt.response = Some(response.clone());
        Ok(())
    }

    async fn abandon(&self, key: &str) -> StoreResult<()> {
        self.faults.check("abandon")?;
        write(&self.attempts)?.remove(key);
        Ok(())
    }
}
