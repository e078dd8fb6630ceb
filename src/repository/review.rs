//! Ratings, reviews and helpful votes

use sqlx::PgConnection;
use uuid::Uuid;

use crate::domain::aggregates::{NewReview, Rating, Review, ReviewDetail};
use crate::domain::value_objects::Stars;
use crate::pagination::Page;

const REVIEW_DETAIL_SELECT: &str = "SELECT rv.id, rv.rating_id, r.product_id, r.user_id, u.username, r.value AS rating, rv.title, rv.comment, rv.is_approved, (SELECT COUNT(*) FROM review_helpful_votes v WHERE v.review_id = rv.id) AS helpful_count, rv.created_at, rv.updated_at FROM reviews rv JOIN ratings r ON r.id = rv.rating_id JOIN users u ON u.id = r.user_id";

/// The `(product_id, user_id)` unique constraint rejects a second rating.
pub async fn insert_rating(conn: &mut PgConnection, product_id: Uuid, user_id: Uuid, stars: Stars) -> sqlx::Result<Rating> {
    sqlx::query_as::<_, Rating>("INSERT INTO ratings (id, product_id, user_id, value) VALUES ($1, $2, $3, $4) RETURNING id, product_id, user_id, value, created_at")
        .bind(Uuid::now_v7()).bind(product_id).bind(user_id).bind(stars.value()).fetch_one(conn).await
}

pub async fn list_ratings(conn: &mut PgConnection, product_id: Option<Uuid>, page: Page) -> sqlx::Result<(Vec<Rating>, i64)> {
    let ratings = sqlx::query_as::<_, Rating>("SELECT id, product_id, user_id, value, created_at FROM ratings WHERE ($1::uuid IS NULL OR product_id = $1) ORDER BY created_at DESC, id LIMIT $2 OFFSET $3")
        .bind(product_id).bind(page.limit()).bind(page.offset()).fetch_all(&mut *conn).await?;
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ratings WHERE ($1::uuid IS NULL OR product_id = $1)")
        .bind(product_id).fetch_one(&mut *conn).await?;
    Ok((ratings, total))
}

pub async fn find_rating(conn: &mut PgConnection, id: Uuid) -> sqlx::Result<Option<Rating>> {
    sqlx::query_as::<_, Rating>("SELECT id, product_id, user_id, value, created_at FROM ratings WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn delete_rating(conn: &mut PgConnection, id: Uuid) -> sqlx::Result<u64> {
    let result = sqlx::query("DELETE FROM ratings WHERE id = $1").bind(id).execute(conn).await?;
    Ok(result.rows_affected())
}

/// The `rating_id` unique constraint rejects a second review.
pub async fn insert_review(conn: &mut PgConnection, r: &NewReview) -> sqlx::Result<Review> {
    sqlx::query_as::<_, Review>("INSERT INTO reviews (id, rating_id, title, comment) VALUES ($1, $2, $3, $4) RETURNING id, rating_id, title, comment, is_approved, created_at, updated_at")
        .bind(Uuid::now_v7()).bind(r.rating).bind(&r.title).bind(&r.comment).fetch_one(conn).await
}

/// Approved reviews, optionally for one product.
pub async fn list_approved_reviews(conn: &mut PgConnection, product_id: Option<Uuid>, page: Page) -> sqlx::Result<(Vec<ReviewDetail>, i64)> {
    let reviews = sqlx::query_as::<_, ReviewDetail>(&format!("{REVIEW_DETAIL_SELECT} WHERE rv.is_approved AND ($1::uuid IS NULL OR r.product_id = $1) ORDER BY rv.created_at DESC, rv.id LIMIT $2 OFFSET $3"))
        .bind(product_id).bind(page.limit()).bind(page.offset()).fetch_all(&mut *conn).await?;
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews rv JOIN ratings r ON r.id = rv.rating_id WHERE rv.is_approved AND ($1::uuid IS NULL OR r.product_id = $1)")
        .bind(product_id).fetch_one(&mut *conn).await?;
    Ok((reviews, total))
}

pub async fn find_review(conn: &mut PgConnection, id: Uuid) -> sqlx::Result<Option<ReviewDetail>> {
    sqlx::query_as::<_, ReviewDetail>(&format!("{REVIEW_DETAIL_SELECT} WHERE rv.id = $1")).bind(id).fetch_optional(conn).await
}

pub async fn delete_review(conn: &mut PgConnection, id: Uuid) -> sqlx::Result<u64> {
    let result = sqlx::query("DELETE FROM reviews WHERE id = $1").bind(id).execute(conn).await?;
    Ok(result.rows_affected())
}

pub async fn approve_review(conn: &mut PgConnection, id: Uuid) -> sqlx::Result<u64> {
    let result = sqlx::query("UPDATE reviews SET is_approved = TRUE, updated_at = NOW() WHERE id = $1").bind(id).execute(conn).await?;
    Ok(result.rows_affected())
}

/// Idempotent: voting twice keeps one vote.
pub async fn add_helpful_vote(conn: &mut PgConnection, review_id: Uuid, user_id: Uuid) -> sqlx::Result<()> {
    sqlx::query("INSERT INTO review_helpful_votes (review_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
        .bind(review_id).bind(user_id).execute(conn).await?;
    Ok(())
}

pub async fn remove_helpful_vote(conn: &mut PgConnection, review_id: Uuid, user_id: Uuid) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM review_helpful_votes WHERE review_id = $1 AND user_id = $2")
        .bind(review_id).bind(user_id).execute(conn).await?;
    Ok(())
}
