//! `payments` table. Amounts are stored in minor units.

use crate::error::{corrupt, store_error};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hotel_booking_core::{
    BookingId, Currency, Money, NewPayment, Payment, PaymentId, PaymentRepository, PaymentStatus,
    StoreError, StoreResult, UserId,
};
use sqlx::PgPool;

const COLUMNS: &str = "id, amount_minor, currency, status, provider_payment_id, booking_id, \
                       user_id, payment_method, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: i64,
    amount_minor: i64,
    currency: String,
    status: String,
    provider_payment_id: String,
    booking_id: i64,
    user_id: i64,
    payment_method: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = StoreError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let currency = row
            .currency
            .parse::<Currency>()
            .map_err(|_| corrupt("payments.currency", &row.currency))?;
        let status = row
            .status
            .parse::<PaymentStatus>()
            .map_err(|_| corrupt("payments.status", &row.status))?;

        Ok(Self {
            id: PaymentId::new(row.id),
            amount: Money::from_minor(row.amount_minor),
            currency,
            status,
            provider_payment_id: row.provider_payment_id,
            booking_id: BookingId::new(row.booking_id),
            user_id: UserId::new(row.user_id),
            payment_method: row.payment_method,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// `PostgreSQL` payment records.
#[derive(Clone, Debug)]
pub struct PostgresPaymentRepository {
    pool: PgPool,
}

impl PostgresPaymentRepository {
    /// Create a repository over `pool`
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentRepository for PostgresPaymentRepository {
    async fn create(&self, payment: NewPayment, now: DateTime<Utc>) -> StoreResult<Payment> {
        let row: PaymentRow = sqlx::query_as(&format!(
            r"
            INSERT INTO payments (
                amount_minor, currency, status, provider_payment_id, booking_id,
                user_id, payment_method, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
            RETURNING {COLUMNS}
            "
        ))
        .bind(payment.amount.minor())
        .bind(payment.currency.code())
        .bind(payment.status.as_str())
        .bind(&payment.provider_payment_id)
        .bind(payment.booking_id.get())
        .bind(payment.user_id.get())
        .bind(&payment.payment_method)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error("payments.create"))?;

        let payment = Payment::try_from(row)?;
        metrics::counter!("payments_recorded_total", "status" => payment.status.as_str()).increment(1);
        Ok(payment)
    }

    async fn get(&self, id: PaymentId) -> StoreResult<Option<Payment>> {
        let row: Option<PaymentRow> =
            sqlx::query_as(&format!("SELECT {COLUMNS} FROM payments WHERE id = $1"))
                .bind(id.get())
                .fetch_optional(&self.pool)
                .await
                .map_err(store_error("payments.get"))?;
        row.map(Payment::try_from).transpose()
    }

    async fn list_by_user(&self, user_id: UserId) -> StoreResult<Vec<Payment>> {
        let rows: Vec<PaymentRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM payments WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id.get())
        .fetch_all(&self.pool)
        .await
        .map_err(store_error("payments.list_by_user"))?;
        rows.into_iter().map(Payment::try_from).collect()
    }

    async fn set_status(
        &self,
        id: PaymentId,
        status: PaymentStatus,
        now: DateTime<Utc>,
    ) -> StoreResult<Payment> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!(
            "UPDATE payments SET status = $2, updated_at = $3 WHERE id = $1 RETURNING {COLUMNS}"
        ))
        .bind(id.get())
        .bind(status.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error("payments.set_status"))?;

        row.ok_or_else(|| StoreError::not_found("Payment", id))?
            .try_into()
    }
}
