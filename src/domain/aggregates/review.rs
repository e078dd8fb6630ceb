//! Ratings and reviews

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use crate::domain::value_objects::{Stars, StarsError};

/// One per (product, user); the unique constraint is the arbiter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Rating {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub value: i16,
    pub created_at: DateTime<Utc>,
}

impl Rating {
    /// A review may only hang off the author's own rating.
    pub fn ensure_reviewable_by(&self, user_id: Uuid) -> Result<(), ReviewError> {
        if self.user_id != user_id {
            return Err(ReviewError::NotRatingOwner);
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Review {
    pub id: Uuid,
    pub rating_id: Uuid,
    pub title: String,
    pub comment: String,
    pub is_approved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Review joined with its rating and vote count.
#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
pub struct ReviewDetail {
    pub id: Uuid,
    pub rating_id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub rating: i16,
    pub title: String,
    pub comment: String,
    pub is_approved: bool,
    pub helpful_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReviewDetail {
    /// Unapproved reviews are only visible to their author and staff.
    pub fn visible_to(&self, viewer: Option<Uuid>, is_staff: bool) -> bool {
        self.is_approved || is_staff || viewer == Some(self.user_id)
    }
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct NewRating {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 5))]
    pub rating: i16,
}

impl NewRating {
    pub fn stars(&self) -> Result<Stars, StarsError> { Stars::new(self.rating) }
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct NewReview {
    pub rating: Uuid,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1))]
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReviewError {
    #[error("rating not found")]
    RatingNotFound,
    #[error("you can only create a review for your own rating")]
    NotRatingOwner,
    #[error("a review for this rating already exists")]
    AlreadyReviewed,
    #[error("you have already rated this product")]
    AlreadyRated,
    #[error(transparent)]
    Stars(#[from] StarsError),
}
