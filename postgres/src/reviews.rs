//! `reviews` table.

use crate::error::store_error;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hotel_booking_core::{
    HotelId, NewReview, RatingSummary, Review, ReviewId, ReviewPatch, ReviewRepository,
    StoreError, StoreResult, UserId,
};
use sqlx::PgPool;

const COLUMNS: &str = "id, hotel_id, user_id, rating, comment, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: i64,
    hotel_id: i64,
    user_id: i64,
    rating: i32,
    comment: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: ReviewId::new(row.id),
            hotel_id: HotelId::new(row.hotel_id),
            user_id: UserId::new(row.user_id),
            rating: row.rating,
            comment: row.comment,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// `PostgreSQL` review store.
#[derive(Clone, Debug)]
pub struct PostgresReviewRepository {
    pool: PgPool,
}

impl PostgresReviewRepository {
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
    ) -> StoreResult<Vec<Review>> {
        let sql = format!("SELECT {COLUMNS} FROM reviews {filter} ORDER BY created_at DESC, id DESC");
        let mut query = sqlx::query_as::<_, ReviewRow>(&sql);
        if let Some(value) = value {
            query = query.bind(value);
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(store_error(operation))?;
        Ok(rows.into_iter().map(Review::from).collect())
    }
}

#[async_trait]
impl ReviewRepository for PostgresReviewRepository {
    async fn list(&self) -> StoreResult<Vec<Review>> {
        self.list_where("", None, "reviews.list").await
    }

    async fn get(&self, id: ReviewId) -> StoreResult<Option<Review>> {
        let row: Option<ReviewRow> =
            sqlx::query_as(&format!("SELECT {COLUMNS} FROM reviews WHERE id = $1"))
                .bind(id.get())
                .fetch_optional(&self.pool)
                .await
                .map_err(store_error("reviews.get"))?;
        Ok(row.map(Review::from))
    }

    async fn create(&self, review: NewReview, now: DateTime<Utc>) -> StoreResult<Review> {
        let row: ReviewRow = sqlx::query_as(&format!(
            r"
            INSERT INTO reviews (hotel_id, user_id, rating, comment, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING {COLUMNS}
            "
        ))
        .bind(review.hotel_id.get())
        .bind(review.user_id.get())
        .bind(review.rating)
        .bind(&review.comment)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error("reviews.create"))?;

        Ok(row.into())
    }

    async fn update(
        &self,
        id: ReviewId,
        patch: ReviewPatch,
        now: DateTime<Utc>,
    ) -> StoreResult<Review> {
        let row: Option<ReviewRow> = sqlx::query_as(&format!(
            r"
            UPDATE reviews SET
                rating = COALESCE($2, rating),
                comment = COALESCE($3, comment),
                updated_at = $4
            WHERE id = $1
            RETURNING {COLUMNS}
            "
        ))
        .bind(id.get())
        .bind(patch.rating)
        .bind(patch.comment)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error("reviews.update"))?;

        row.map(Review::from)
            .ok_or_else(|| StoreError::not_found("Review", id))
    }

    async fn delete(&self, id: ReviewId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(store_error("reviews.delete"))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Review", id));
        }
        Ok(())
    }

    async fn list_by_hotel(&self, hotel_id: HotelId) -> StoreResult<Vec<Review>> {
        self.list_where("WHERE hotel_id = $1", Some(hotel_id.get()), "reviews.list_by_hotel")
            .await
    }

    async fn list_by_user(&self, user_id: UserId) -> StoreResult<Vec<Review>> {
        self.list_where("WHERE user_id = $1", Some(user_id.get()), "reviews.list_by_user")
            .await
    }

    async fn rating_summary(&self, hotel_id: HotelId) -> StoreResult<RatingSummary> {
        let (average_rating, total_reviews): (f64, i64) = sqlx::query_as(
            r"
            SELECT COALESCE(AVG(rating), 0)::float8, COUNT(*)
            FROM reviews
            WHERE hotel_id = $1
            ",
        )
        .bind(hotel_id.get())
        .fetch_one(&self.pool)
        .await
        .map_err(store_error("reviews.rating_summary"))?;

        Ok(RatingSummary {
            average_rating,
            total_reviews,
        })
    }
}
