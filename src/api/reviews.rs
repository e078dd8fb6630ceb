//! Ratings and written reviews

use axum::{extract::{Path, Query, State}, http::StatusCode, routing::{get, post}, Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use super::{extract::ValidatedJson, AppState};
use crate::auth::Caller;
use crate::domain::aggregates::{NewRating, NewReview, Rating, ReviewDetail};
use crate::error::Result;
use crate::pagination::{ListParams, Page, PaginatedResponse};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/ratings", get(list_ratings).post(create_rating))
        .route("/ratings/:id", get(get_rating).delete(delete_rating))
        .route("/reviews", get(list_reviews).post(create_review))
        .route("/reviews/:id", get(get_review).delete(delete_review))
        .route("/reviews/:id/approve", post(approve_review))
        .route("/reviews/:id/helpful", post(mark_helpful))
        .route("/reviews/:id/unhelpful", post(unmark_helpful))
}

#[derive(Debug, Default, Deserialize)]
struct ByProduct {
    product_id: Option<Uuid>,
    page: Option<u32>,
    per_page: Option<u32>,
}

impl ByProduct {
    fn page(&self) -> Page { ListParams { page: self.page, per_page: self.per_page }.into() }
}

async fn list_ratings(State(s): State<AppState>, Query(q): Query<ByProduct>) -> Result<Json<PaginatedResponse<Rating>>> {
    Ok(Json(s.reviews.list_ratings(q.product_id, q.page()).await?))
}

async fn create_rating(State(s): State<AppState>, caller: Caller, ValidatedJson(body): ValidatedJson<NewRating>) -> Result<(StatusCode, Json<Rating>)> {
    Ok((StatusCode::CREATED, Json(s.reviews.create_rating(caller.user_id, body).await?)))
}

async fn get_rating(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Rating>> {
    Ok(Json(s.reviews.get_rating(id).await?))
}

async fn delete_rating(State(s): State<AppState>, caller: Caller, Path(id): Path<Uuid>) -> Result<StatusCode> {
    s.reviews.delete_rating(caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_reviews(State(s): State<AppState>, Query(q): Query<ByProduct>) -> Result<Json<PaginatedResponse<ReviewDetail>>> {
    Ok(Json(s.reviews.list_reviews(q.product_id, q.page()).await?))
}

async fn create_review(State(s): State<AppState>, caller: Caller, ValidatedJson(body): ValidatedJson<NewReview>) -> Result<(StatusCode, Json<ReviewDetail>)> {
    Ok((StatusCode::CREATED, Json(s.reviews.create_review(caller.user_id, body).await?)))
}

async fn get_review(State(s): State<AppState>, caller: Option<Caller>, Path(id): Path<Uuid>) -> Result<Json<ReviewDetail>> {
    Ok(Json(s.reviews.get_review(caller, id).await?))
}

async fn delete_review(State(s): State<AppState>, caller: Caller, Path(id): Path<Uuid>) -> Result<StatusCode> {
    s.reviews.delete_review(caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn approve_review(State(s): State<AppState>, caller: Caller, Path(id): Path<Uuid>) -> Result<Json<ReviewDetail>> {
    caller.require_staff()?;
    Ok(Json(s.reviews.approve_review(id).await?))
}

async fn mark_helpful(State(s): State<AppState>, caller: Caller, Path(id): Path<Uuid>) -> Result<Json<ReviewDetail>> {
    Ok(Json(s.reviews.vote(caller.user_id, id, true).await?))
}

async fn unmark_helpful(State(s): State<AppState>, caller: Caller, Path(id): Path<Uuid>) -> Result<Json<ReviewDetail>> {
    Ok(Json(s.reviews.vote(caller.user_id, id, false).await?))
}
