//! Review Store records and the rating aggregate.

use crate::types::{HotelId, ReviewId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lowest accepted rating
pub const MIN_RATING: i32 = 1;
/// Highest accepted rating
pub const MAX_RATING: i32 = 5;

/// A user review of a hotel
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    /// Review ID
    pub id: ReviewId,
    /// Reviewed hotel
    pub hotel_id: HotelId,
    /// Author
    pub user_id: UserId,
    /// Rating, 1 to 5
    pub rating: i32,
    /// Review text
    pub comment: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

impl Review {
    /// Apply a patch in place and bump `updated_at`
    pub fn apply(&mut self, patch: ReviewPatch, now: DateTime<Utc>) {
        if let Some(rating) = patch.rating {
            self.rating = rating;
        }
        if let Some(comment) = patch.comment {
            self.comment = comment;
        }
        self.updated_at = now;
    }
}

/// Fields required to post a review
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewReview {
    /// Reviewed hotel
    pub hotel_id: HotelId,
    /// Author
    pub user_id: UserId,
    /// Rating
    pub rating: i32,
    /// Review text
    pub comment: String,
}

impl NewReview {
    /// Materialize the record once the store has assigned an id
    #[must_use]
    pub fn into_review(self, id: ReviewId, now: DateTime<Utc>) -> Review {
        Review {
            id,
            hotel_id: self.hotel_id,
            user_id: self.user_id,
            rating: self.rating,
            comment: self.comment,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of a review
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReviewPatch {
    /// New rating
    pub rating: Option<i32>,
    /// New text
    pub comment: Option<String>,
}

/// Average rating of a hotel, computed on read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    /// Mean rating, `0` when there are no reviews
    pub average_rating: f64,
    /// Number of reviews
    pub total_reviews: i64,
}

impl RatingSummary {
    /// Summarize a set of ratings
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_ratings<I: IntoIterator<Item = i32>>(ratings: I) -> Self {
        let (sum, count) = ratings
            .into_iter()
            .fold((0_i64, 0_i64), |(sum, count), r| (sum + i64::from(r), count + 1));
        if count == 0 {
            return Self::default();
        }
        Self {
            average_rating: sum as f64 / count as f64,
            total_reviews: count,
        }
    }
}
