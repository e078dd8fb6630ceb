//! Ratings and reviews

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::auth::Caller;
use crate::domain::aggregates::{NewRating, NewReview, Rating, ReviewDetail, ReviewError};
use crate::domain::events::DomainEvent;
use crate::error::{EcommerceError, Result};
use crate::messaging::EventPublisher;
use crate::pagination::{Page, PaginatedResponse};
use crate::repository::{catalog, review};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReviewService: Send + Sync {
    /// One rating per (product, user); a second attempt is a conflict.
    async fn create_rating(&self, user_id: Uuid, rating: NewRating) -> Result<Rating>;
    async fn list_ratings(&self, product_id: Option<Uuid>, page: Page) -> Result<PaginatedResponse<Rating>>;
    async fn get_rating(&self, id: Uuid) -> Result<Rating>;
    async fn delete_rating(&self, caller: Caller, id: Uuid) -> Result<()>;

    /// Attaches a review to the caller's own rating, at most one per rating.
    async fn create_review(&self, user_id: Uuid, review: NewReview) -> Result<ReviewDetail>;
    async fn list_reviews(&self, product_id: Option<Uuid>, page: Page) -> Result<PaginatedResponse<ReviewDetail>>;
    async fn product_reviews(&self, slug: String, page: Page) -> Result<PaginatedResponse<ReviewDetail>>;
    async fn get_review(&self, viewer: Option<Caller>, id: Uuid) -> Result<ReviewDetail>;
    async fn delete_review(&self, caller: Caller, id: Uuid) -> Result<()>;
    async fn approve_review(&self, id: Uuid) -> Result<ReviewDetail>;
    async fn vote(&self, user_id: Uuid, id: Uuid, helpful: bool) -> Result<ReviewDetail>;
}

#[derive(Clone, Debug)]
pub struct PgReviewService {
    pool: PgPool,
    events: EventPublisher,
}

impl PgReviewService {
    pub fn new(pool: PgPool, events: EventPublisher) -> Self { Self { pool, events } }
}

/// A unique violation from `e` means `duplicate`.
fn duplicate_as(e: sqlx::Error, duplicate: ReviewError) -> EcommerceError {
    match EcommerceError::from(e) {
        EcommerceError::Conflict(_) => duplicate.into(),
        other => other,
    }
}

#[async_trait]
impl ReviewService for PgReviewService {
    async fn create_rating(&self, user_id: Uuid, new: NewRating) -> Result<Rating> {
        let stars = new.stars()?;
        let mut conn = self.pool.acquire().await?;
        catalog::find_product(&mut conn, new.product_id).await?.ok_or_else(|| EcommerceError::not_found("product"))?;
        let rating = review::insert_rating(&mut conn, new.product_id, user_id, stars).await
            .map_err(|e| duplicate_as(e, ReviewError::AlreadyRated))?;

        info!(rating_id = %rating.id, product_id = %rating.product_id, %user_id, value = rating.value, "rating created");
        self.events.publish(DomainEvent::RatingCreated {
            rating_id: rating.id,
            product_id: rating.product_id,
            user_id,
            value: rating.value,
        }).await;
        Ok(rating)
    }

    async fn list_ratings(&self, product_id: Option<Uuid>, page: Page) -> Result<PaginatedResponse<Rating>> {
        let mut conn = self.pool.acquire().await?;
        let (ratings, total) = review::list_ratings(&mut conn, product_id, page).await?;
        Ok(PaginatedResponse::new(ratings, total, page))
    }

    async fn get_rating(&self, id: Uuid) -> Result<Rating> {
        let mut conn = self.pool.acquire().await?;
        review::find_rating(&mut conn, id).await?.ok_or_else(|| EcommerceError::not_found("rating"))
    }

    async fn delete_rating(&self, caller: Caller, id: Uuid) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        let rating = review::find_rating(&mut conn, id).await?.ok_or_else(|| EcommerceError::not_found("rating"))?;
        if !caller.can_access(rating.user_id) {
            return Err(EcommerceError::Forbidden);
        }
        review::delete_rating(&mut conn, id).await?;
        Ok(())
    }

    async fn create_review(&self, user_id: Uuid, new: NewReview) -> Result<ReviewDetail> {
        let mut tx = self.pool.begin().await?;
        let rating = review::find_rating(&mut tx, new.rating).await?.ok_or(ReviewError::RatingNotFound)?;
        rating.ensure_reviewable_by(user_id)?;
        let created = review::insert_review(&mut tx, &new).await.map_err(|e| duplicate_as(e, ReviewError::AlreadyReviewed))?;
        let detail = review::find_review(&mut tx, created.id).await?.ok_or_else(|| EcommerceError::not_found("review"))?;
        tx.commit().await?;

        info!(review_id = %detail.id, rating_id = %rating.id, "review created");
        self.events.publish(DomainEvent::ReviewCreated { review_id: detail.id, rating_id: rating.id }).await;
        Ok(detail)
    }

    async fn list_reviews(&self, product_id: Option<Uuid>, page: Page) -> Result<PaginatedResponse<ReviewDetail>> {
        let mut conn = self.pool.acquire().await?;
        let (reviews, total) = review::list_approved_reviews(&mut conn, product_id, page).await?;
        Ok(PaginatedResponse::new(reviews, total, page))
    }

    async fn product_reviews(&self, slug: String, page: Page) -> Result<PaginatedResponse<ReviewDetail>> {
        let mut conn = self.pool.acquire().await?;
        let product = catalog::find_product_by_slug(&mut conn, &slug, false).await?.ok_or_else(|| EcommerceError::not_found("product"))?;
        let (reviews, total) = review::list_approved_reviews(&mut conn, Some(product.id), page).await?;
        Ok(PaginatedResponse::new(reviews, total, page))
    }

    async fn get_review(&self, viewer: Option<Caller>, id: Uuid) -> Result<ReviewDetail> {
        let mut conn = self.pool.acquire().await?;
        let (viewer_id, is_staff) = viewer.map_or((None, false), |c| (Some(c.user_id), c.is_staff));
        review::find_review(&mut conn, id).await?
            .filter(|r| r.visible_to(viewer_id, is_staff))
            .ok_or_else(|| EcommerceError::not_found("review"))
    }

    async fn delete_review(&self, caller: Caller, id: Uuid) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        let found = review::find_review(&mut conn, id).await?.ok_or_else(|| EcommerceError::not_found("review"))?;
        if !caller.can_access(found.user_id) {
            return Err(EcommerceError::Forbidden);
        }
        review::delete_review(&mut conn, id).await?;
        Ok(())
    }

    async fn approve_review(&self, id: Uuid) -> Result<ReviewDetail> {
        let mut conn = self.pool.acquire().await?;
        if review::approve_review(&mut conn, id).await? == 0 {
            return Err(EcommerceError::not_found("review"));
        }
        info!(review_id = %id, "review approved");
        review::find_review(&mut conn, id).await?.ok_or_else(|| EcommerceError::not_found("review"))
    }

    async fn vote(&self, user_id: Uuid, id: Uuid, helpful: bool) -> Result<ReviewDetail> {
        let mut tx = self.pool.begin().await?;
        review::find_review(&mut tx, id).await?
            .filter(|r| r.visible_to(Some(user_id), false))
            .ok_or_else(|| EcommerceError::not_found("review"))?;
        if helpful {
            review::add_helpful_vote(&mut tx, id, user_id).await?;
        } else {
            review::remove_helpful_vote(&mut tx, id, user_id).await?;
        }
        let detail = review::find_review(&mut tx, id).await?.ok_or_else(|| EcommerceError::not_found("review"))?;
        tx.commit().await?;
        Ok(detail)
    }
}
