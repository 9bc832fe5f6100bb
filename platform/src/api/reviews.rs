//! Review Store endpoints.
//!
//! - GET /api/reviews - All reviews
//! - GET /api/reviews/:id - Review details
//! - POST /api/reviews - Create a review
//! - PUT /api/reviews/:id - Update rating or comment
//! - DELETE /api/reviews/:id - Delete a review
//! - GET /api/reviews/hotel/:hotelId - Reviews of a hotel
//! - GET /api/reviews/user/:userId - Reviews by a user
//! - GET /api/reviews/hotel/:hotelId/average - Rating summary of a hotel

use super::write_failed;
use crate::server::state::AppState;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use hotel_booking_core::{
    HotelId, NewReview, RatingSummary, Review, ReviewId, ReviewPatch, UserId,
};
use hotel_booking_web::{AppError, ValidatedJson};
use serde::Deserialize;
use validator::Validate;

/// Request to create a review.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    /// Reviewed hotel
    #[validate(range(min = 1, message = "Hotel id must be positive"))]
    pub hotel_id: i64,
    /// Author
    #[validate(range(min = 1, message = "User id must be positive"))]
    pub user_id: i64,
    /// Score from 1 to 5
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,
    /// Review text
    #[validate(length(min = 1, max = 1000, message = "Comment must be 1 to 1000 characters"))]
    pub comment: String,
}

/// Partial review update.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReviewRequest {
    /// Score from 1 to 5
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: Option<i32>,
    /// Review text
    #[validate(length(min = 1, max = 1000, message = "Comment must be 1 to 1000 characters"))]
    pub comment: Option<String>,
}

/// Routes mounted at `/api/reviews`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_reviews).post(create_review))
        .route(
            "/:id",
            get(get_review).put(update_review).delete(delete_review),
        )
        .route("/hotel/:hotel_id", get(list_hotel_reviews))
        .route("/hotel/:hotel_id/average", get(hotel_rating))
        .route("/user/:user_id", get(list_user_reviews))
}

/// All reviews, newest first.
pub async fn list_reviews(State(state): State<AppState>) -> Result<Json<Vec<Review>>, AppError> {
    Ok(Json(state.reviews.list().await?))
}

/// Review details.
pub async fn get_review(
    Path(id): Path<ReviewId>,
    State(state): State<AppState>,
) -> Result<Json<Review>, AppError> {
    state
        .reviews
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Review", id))
}

/// Create a review. The hotel is not required to exist.
pub async fn create_review(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Review>), AppError> {
    let review = NewReview {
        hotel_id: HotelId::new(request.hotel_id),
        user_id: UserId::new(request.user_id),
        rating: request.rating,
        comment: request.comment,
    };
    let review = state.reviews.create(review, state.clock.now()).await?;

    tracing::info!(review_id = %review.id, hotel_id = %review.hotel_id, rating = review.rating, "Review created");
    Ok((StatusCode::CREATED, Json(review)))
}

/// Update rating or comment.
pub async fn update_review(
    Path(id): Path<ReviewId>,
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<UpdateReviewRequest>,
) -> Result<Json<Review>, AppError> {
    let patch = ReviewPatch {
        rating: request.rating,
        comment: request.comment,
    };
    let review = state
        .reviews
        .update(id, patch, state.clock.now())
        .await
        .map_err(write_failed("Failed to update review"))?;
    Ok(Json(review))
}

/// Delete a review.
pub async fn delete_review(
    Path(id): Path<ReviewId>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    state
        .reviews
        .delete(id)
        .await
        .map_err(write_failed("Failed to delete review"))?;
    Ok(StatusCode::NO_CONTENT)
}

/// Reviews of a hotel.
pub async fn list_hotel_reviews(
    Path(hotel_id): Path<HotelId>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Review>>, AppError> {
    Ok(Json(state.reviews.list_by_hotel(hotel_id).await?))
}

/// Reviews written by a user.
pub async fn list_user_reviews(
    Path(user_id): Path<UserId>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Review>>, AppError> {
    Ok(Json(state.reviews.list_by_user(user_id).await?))
}

/// Average rating and review count; both zero for an unreviewed hotel.
pub async fn hotel_rating(
    Path(hotel_id): Path<HotelId>,
    State(state): State<AppState>,
) -> Result<Json<RatingSummary>, AppError> {
    Ok(Json(state.reviews.rating_summary(hotel_id).await?))
}
