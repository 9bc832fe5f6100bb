//! `bookings` table.

use crate::error::{corrupt, store_error};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hotel_booking_core::{
    Booking, BookingId, BookingPatch, BookingRepository, BookingStatus, HotelId, NewBooking,
    StoreError, StoreResult, UserId,
};
use sqlx::PgPool;

const COLUMNS: &str =
    "id, user_id, hotel_id, check_in, check_out, guests, total_price, status, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: i64,
    user_id: i64,
    hotel_id: i64,
    check_in: DateTime<Utc>,
    check_out: DateTime<Utc>,
    guests: i32,
    total_price: f64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = StoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<BookingStatus>()
            .map_err(|_| corrupt("bookings.status", &row.status))?;

        Ok(Self {
            id: BookingId::new(row.id),
            user_id: UserId::new(row.user_id),
            hotel_id: HotelId::new(row.hotel_id),
            check_in: row.check_in,
            check_out: row.check_out,
            guests: row.guests,
            total_price: row.total_price,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_bookings(rows: Vec<BookingRow>) -> StoreResult<Vec<Booking>> {
    rows.into_iter().map(Booking::try_from).collect()
}

/// `PostgreSQL` booking ledger.
#[derive(Clone, Debug)]
pub struct PostgresBookingRepository {
    pool: PgPool,
}

impl PostgresBookingRepository {
    /// Create a repository over `pool`
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn list_where(
        &self,
        filter: &str,
        value: Option<i64>,
        operation: &'static str,
    ) -> StoreResult<Vec<Booking>> {
        let sql = format!("SELECT {COLUMNS} FROM bookings {filter} ORDER BY created_at DESC, id DESC");
        let mut query = sqlx::query_as::<_, BookingRow>(&sql);
        if let Some(value) = value {
            query = query.bind(value);
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(store_error(operation))?;
        into_bookings(rows)
    }
}

#[async_trait]
impl BookingRepository for PostgresBookingRepository {
    async fn list(&self) -> StoreResult<Vec<Booking>> {
        self.list_where("", None, "bookings.list").await
    }

    async fn get(&self, id: BookingId) -> StoreResult<Option<Booking>> {
        let row: Option<BookingRow> =
            sqlx::query_as(&format!("SELECT {COLUMNS} FROM bookings WHERE id = $1"))
                .bind(id.get())
                .fetch_optional(&self.pool)
                .await
                .map_err(store_error("bookings.get"))?;
        row.map(Booking::try_from).transpose()
    }

    async fn create(&self, booking: NewBooking, now: DateTime<Utc>) -> StoreResult<Booking> {
        let row: BookingRow = sqlx::query_as(&format!(
            r"
            INSERT INTO bookings (
                user_id, hotel_id, check_in, check_out, guests, total_price,
                status, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING {COLUMNS}
            "
        ))
        .bind(booking.user_id.get())
        .bind(booking.hotel_id.get())
        .bind(booking.check_in)
        .bind(booking.check_out)
        .bind(booking.guests)
        .bind(booking.total_price)
        .bind(BookingStatus::Pending.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error("bookings.create"))?;

        row.try_into()
    }

    async fn update(
        &self,
        id: BookingId,
        patch: BookingPatch,
        now: DateTime<Utc>,
    ) -> StoreResult<Booking> {
        let row: Option<BookingRow> = sqlx::query_as(&format!(
            r"
            UPDATE bookings SET
                check_in = COALESCE($2, check_in),
                check_out = COALESCE($3, check_out),
                guests = COALESCE($4, guests),
                total_price = COALESCE($5, total_price),
                status = COALESCE($6, status),
                updated_at = $7
            WHERE id = $1
            RETURNING {COLUMNS}
            "
        ))
        .bind(id.get())
        .bind(patch.check_in)
        .bind(patch.check_out)
        .bind(patch.guests)
        .bind(patch.total_price)
        .bind(patch.status.map(BookingStatus::as_str))
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error("bookings.update"))?;

        row.ok_or_else(|| StoreError::not_found("Booking", id))?
            .try_into()
    }

    async fn delete(&self, id: BookingId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(store_error("bookings.delete"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Booking", id));
        }
        Ok(())
    }

    async fn list_by_user(&self, user_id: UserId) -> StoreResult<Vec<Booking>> {
        self.list_where("WHERE user_id = $1", Some(user_id.get()), "bookings.list_by_user")
            .await
    }

    async fn list_by_hotel(&self, hotel_id: HotelId) -> StoreResult<Vec<Booking>> {
        self.list_where("WHERE hotel_id = $1", Some(hotel_id.get()), "bookings.list_by_hotel")
            .await
    }

    async fn set_status(
        &self,
        id: BookingId,
        status: BookingStatus,
        now: DateTime<Utc>,
    ) -> StoreResult<Booking> {
        let row: Option<BookingRow> = sqlx::query_as(&format!(
            "UPDATE bookings SET status = $2, updated_at = $3 WHERE id = $1 RETURNING {COLUMNS}"
        ))
        .bind(id.get())
        .bind(status.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error("bookings.set_status"))?;

        row.ok_or_else(|| StoreError::not_found("Booking", id))?
            .try_into()
    }

    async fn transition_status(
        &self,
        id: BookingId,
        from: BookingStatus,
        to: BookingStatus,
        now: DateTime<Utc>,
    ) -> StoreResult<Booking> {
        let row: Option<BookingRow> = sqlx::query_as(&format!(
            r"
            UPDATE bookings SET status = $3, updated_at = $4
            WHERE id = $1 AND status = $2
            RETURNING {COLUMNS}
            "
        ))
        .bind(id.get())
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error("bookings.transition_status"))?;

        if let Some(row) = row {
            return row.try_into();
        }

        // Nothing updated: either the booking is gone or its status moved on
        match self.get(id).await? {
            Some(current) => Err(StoreError::Conflict(format!(
                "booking {id} is {}, expected {from}",
                current.status
            ))),
            None => Err(StoreError::not_found("Booking", id)),
        }
    }
}
