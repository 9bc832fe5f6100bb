//! `checkout_attempts` table: the idempotency ledger.

use crate::error::store_error;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use hotel_booking_core::stores::{BeginOutcome, StoredResponse};
use hotel_booking_core::{CheckoutLedger, StoreError, StoreResult, UserId};
use sqlx::PgPool;

#[derive(sqlx::FromRow)]
struct AttemptRow {
    user_id: i64,
    fingerprint: String,
    response_status: Option<i32>,
    response_body: Option<serde_json::Value>,
}

/// `PostgreSQL` checkout ledger.
///
/// The primary key on `idempotency_key` makes [`CheckoutLedger::begin`]
/// race-free across service instances: exactly one insert wins, and an
/// expired claim is taken over by a single conditional upsert.
#[derive(Clone, Debug)]
pub struct PostgresCheckoutLedger {
    pool: PgPool,
}

impl PostgresCheckoutLedger {
    /// Create a ledger over `pool`
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CheckoutLedger for PostgresCheckoutLedger {
    async fn begin(
        &self,
        key: &str,
        user_id: UserId,
        fingerprint: &str,
        now: DateTime<Utc>,
        lease: Duration,
    ) -> StoreResult<BeginOutcome> {
        let claimed: Option<String> = sqlx::query_scalar(
            r"
            INSERT INTO checkout_attempts (idempotency_key, user_id, fingerprint, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (idempotency_key) DO UPDATE SET created_at = EXCLUDED.created_at
            WHERE checkout_attempts.response_status IS NULL
              AND checkout_attempts.user_id = EXCLUDED.user_id
              AND checkout_attempts.fingerprint = EXCLUDED.fingerprint
              AND checkout_attempts.created_at <= $5
            RETURNING idempotency_key
            ",
        )
        .bind(key)
        .bind(user_id.get())
        .bind(fingerprint)
        .bind(now)
        .bind(now - lease)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error("checkout_attempts.begin"))?;

        if claimed.is_some() {
            return Ok(BeginOutcome::Started);
        }

        let existing: Option<AttemptRow> = sqlx::query_as(
            r"
            SELECT user_id, fingerprint, response_status, response_body
            FROM checkout_attempts
            WHERE idempotency_key = $1
            ",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error("checkout_attempts.begin"))?;

        // Abandoned between our insert and select
        let Some(existing) = existing else {
            return Ok(BeginOutcome::InProgress);
        };

        if existing.fingerprint != fingerprint || existing.user_id != user_id.get() {
            return Ok(BeginOutcome::Mismatch);
        }

        match (existing.response_status, existing.response_body) {
            (Some(status), Some(body)) => {
                let status = u16::try_from(status).map_err(|_| {
                    StoreError::Unavailable(format!("unreadable response status {status}"))
                })?;
                Ok(BeginOutcome::Completed(StoredResponse { status, body }))
            },
            _ => Ok(BeginOutcome::InProgress),
        }
    }

    async fn complete(
        &self,
        key: &str,
        response: &StoredResponse,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            r"
            UPDATE checkout_attempts
            SET response_status = $2, response_body = $3, completed_at = $4
            WHERE idempotency_key = $1
            ",
        )
        .bind(key)
        .bind(i32::from(response.status))
        .bind(&response.body)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(store_error("checkout_attempts.complete"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Checkout attempt", key));
        }
        Ok(())
    }

    async fn abandon(&self, key: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM checkout_attempts WHERE idempotency_key = $1 AND response_status IS NULL")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(store_error("checkout_attempts.abandon"))?;
        Ok(())
    }
}
