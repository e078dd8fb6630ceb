//! Products, categories, brands and tags

use axum::{extract::{Path, Query, State}, http::StatusCode, routing::{get, post}, Json, Router};
use rust_decimal::Decimal;
use serde::Deserialize;

use super::{extract::ValidatedJson, AppState};
use crate::auth::Caller;
use crate::domain::aggregates::{
    Brand, Category, NewBrand, NewCategory, NewImage, NewProduct, NewTag, NewVariant, Product, ProductDetail,
    ProductFilter, ProductImage, ProductOrdering, ProductVariant, ReviewDetail, Tag,
};
use crate::error::{EcommerceError, Result};
use crate::pagination::{ListParams, Page, PaginatedResponse};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/featured", get(featured_products))
        .route("/products/:slug", get(get_product).put(update_product).delete(deactivate_product))
        .route("/products/:slug/similar", get(similar_products))
        .route("/products/:slug/reviews", get(product_reviews))
        .route("/products/:slug/variants", post(add_variant))
        .route("/products/:slug/images", post(add_image))
        .route("/categories", get(list_categories).post(create_category))
        .route("/categories/:slug", get(get_category).delete(delete_category))
        .route("/categories/:slug/products", get(category_products))
        .route("/brands", get(list_brands).post(create_brand))
        .route("/tags", get(list_tags).post(create_tag))
}

/// Listing query; pagination fields are inline so numbers survive query decoding.
#[derive(Debug, Default, Deserialize)]
struct ProductQuery {
    page: Option<u32>,
    per_page: Option<u32>,
    min_price: Option<Decimal>,
    max_price: Option<Decimal>,
    category: Option<String>,
    brand: Option<String>,
    tag: Option<String>,
    search: Option<String>,
    ordering: Option<String>,
}

impl ProductQuery {
    fn into_parts(self) -> Result<(ProductFilter, Page)> {
        let ordering = match self.ordering.as_deref().map(str::trim).filter(|o| !o.is_empty()) {
            Some(raw) => ProductOrdering::parse(raw)
                .ok_or_else(|| EcommerceError::InvalidInput(format!("unsupported ordering: {raw}")))?,
            None => ProductOrdering::default(),
        };
        let filter = ProductFilter {
            min_price: self.min_price,
            max_price: self.max_price,
            category: self.category,
            brand: self.brand,
            tag: self.tag,
            search: self.search.filter(|s| !s.trim().is_empty()),
            ordering,
        };
        Ok((filter, ListParams { page: self.page, per_page: self.per_page }.into()))
    }
}

async fn list_products(State(s): State<AppState>, Query(q): Query<ProductQuery>) -> Result<Json<PaginatedResponse<Product>>> {
    let (filter, page) = q.into_parts()?;
    Ok(Json(s.catalog.list_products(filter, page).await?))
}

async fn featured_products(State(s): State<AppState>) -> Result<Json<Vec<Product>>> {
    Ok(Json(s.catalog.featured_products().await?))
}

/// Staff may look at deactivated products.
async fn get_product(State(s): State<AppState>, caller: Option<Caller>, Path(slug): Path<String>) -> Result<Json<ProductDetail>> {
    let include_inactive = caller.is_some_and(|c| c.is_staff);
    Ok(Json(s.catalog.get_product(slug, include_inactive).await?))
}

async fn similar_products(State(s): State<AppState>, Path(slug): Path<String>) -> Result<Json<Vec<Product>>> {
    Ok(Json(s.catalog.similar_products(slug).await?))
}

async fn product_reviews(State(s): State<AppState>, Path(slug): Path<String>, Query(p): Query<ListParams>) -> Result<Json<PaginatedResponse<ReviewDetail>>> {
    Ok(Json(s.reviews.product_reviews(slug, p.into()).await?))
}

async fn create_product(State(s): State<AppState>, caller: Caller, ValidatedJson(body): ValidatedJson<NewProduct>) -> Result<(StatusCode, Json<ProductDetail>)> {
    caller.require_staff()?;
    Ok((StatusCode::CREATED, Json(s.catalog.create_product(body).await?)))
}

async fn update_product(State(s): State<AppState>, caller: Caller, Path(slug): Path<String>, ValidatedJson(body): ValidatedJson<NewProduct>) -> Result<Json<ProductDetail>> {
    caller.require_staff()?;
    Ok(Json(s.catalog.update_product(slug, body).await?))
}

async fn deactivate_product(State(s): State<AppState>, caller: Caller, Path(slug): Path<String>) -> Result<StatusCode> {
    caller.require_staff()?;
    s.catalog.deactivate_product(slug).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_variant(State(s): State<AppState>, caller: Caller, Path(slug): Path<String>, ValidatedJson(body): ValidatedJson<NewVariant>) -> Result<(StatusCode, Json<ProductVariant>)> {
    caller.require_staff()?;
    Ok((StatusCode::CREATED, Json(s.catalog.add_variant(slug, body).await?)))
}

async fn add_image(State(s): State<AppState>, caller: Caller, Path(slug): Path<String>, ValidatedJson(body): ValidatedJson<NewImage>) -> Result<(StatusCode, Json<ProductImage>)> {
    caller.require_staff()?;
    Ok((StatusCode::CREATED, Json(s.catalog.add_image(slug, body).await?)))
}

async fn list_categories(State(s): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(s.catalog.list_categories().await?))
}

async fn get_category(State(s): State<AppState>, Path(slug): Path<String>) -> Result<Json<Category>> {
    Ok(Json(s.catalog.get_category(slug).await?))
}

async fn category_products(State(s): State<AppState>, Path(slug): Path<String>, Query(p): Query<ListParams>) -> Result<Json<PaginatedResponse<Product>>> {
    Ok(Json(s.catalog.category_products(slug, p.into()).await?))
}

async fn create_category(State(s): State<AppState>, caller: Caller, ValidatedJson(body): ValidatedJson<NewCategory>) -> Result<(StatusCode, Json<Category>)> {
    caller.require_staff()?;
    Ok((StatusCode::CREATED, Json(s.catalog.create_category(body).await?)))
}

async fn delete_category(State(s): State<AppState>, caller: Caller, Path(slug): Path<String>) -> Result<StatusCode> {
    caller.require_staff()?;
    s.catalog.delete_category(slug).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_brands(State(s): State<AppState>) -> Result<Json<Vec<Brand>>> {
    Ok(Json(s.catalog.list_brands().await?))
}

async fn create_brand(State(s): State<AppState>, caller: Caller, ValidatedJson(body): ValidatedJson<NewBrand>) -> Result<(StatusCode, Json<Brand>)> {
    caller.require_staff()?;
    Ok((StatusCode::CREATED, Json(s.catalog.create_brand(body).await?)))
}

async fn list_tags(State(s): State<AppState>) -> Result<Json<Vec<Tag>>> {
    Ok(Json(s.catalog.list_tags().await?))
}

async fn create_tag(State(s): State<AppState>, caller: Caller, ValidatedJson(body): ValidatedJson<NewTag>) -> Result<(StatusCode, Json<Tag>)> {
    caller.require_staff()?;
    Ok((StatusCode::CREATED, Json(s.catalog.create_tag(body).await?)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{json_body, request, send, As, Mocks};
    use chrono::Utc;
    use mockall::predicate::{always, eq};
    use uuid::Uuid;

    fn product(slug: &str, price: Decimal) -> Product {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4(), name: slug.to_uppercase(), slug: slug.into(), description: String::new(), base_price: price,
            brand_id: Uuid::new_v4(), category_id: Uuid::new_v4(), is_active: true, created_at: now, updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_list_products_passes_filters() {
        let mut mocks = Mocks::default();
        mocks.catalog.expect_list_products()
            .withf(|filter, page| {
                filter.min_price == Some(Decimal::new(10, 0))
                    && filter.category.as_deref() == Some("shirts")
                    && filter.ordering == ProductOrdering::PriceDesc
                    && page.page == 2
                    && page.per_page == 5
            })
            .times(1)
            .returning(|_, page| Ok(PaginatedResponse::new(vec![product("tee", Decimal::new(1999, 2))], 6, page)));

        let response = send(mocks.app(), request("GET", "/api/v1/products?min_price=10&category=shirts&ordering=-price&page=2&per_page=5", As::Anonymous, None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["total"], 6);
        assert_eq!(body["page"], 2);
        assert_eq!(body["data"][0]["slug"], "tee");
    }

    #[tokio::test]
    async fn test_unknown_ordering_is_rejected() {
        let response = send(Mocks::default().app(), request("GET", "/api/v1/products?ordering=stock", As::Anonymous, None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_product_requires_staff() {
        let body = serde_json::json!({"name": "Tee", "base_price": "19.99", "brand_id": Uuid::new_v4(), "category_id": Uuid::new_v4()});
        let response = send(Mocks::default().app(), request("POST", "/api/v1/products", As::Customer(Uuid::new_v4()), Some(body))).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_body(response).await["code"], "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_negative_price_is_rejected() {
        let body = serde_json::json!({"name": "Tee", "base_price": "-1", "brand_id": Uuid::new_v4(), "category_id": Uuid::new_v4()});
        let response = send(Mocks::default().app(), request("POST", "/api/v1/products", As::Staff(Uuid::new_v4()), Some(body))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_staff_see_inactive_products() {
        let mut mocks = Mocks::default();
        mocks.catalog.expect_get_product()
            .with(eq("retired".to_string()), eq(true))
            .times(1)
            .returning(|_, _| Err(EcommerceError::not_found("product")));
        let response = send(mocks.app(), request("GET", "/api/v1/products/retired", As::Staff(Uuid::new_v4()), None)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_category_in_use_is_conflict() {
        let mut mocks = Mocks::default();
        mocks.catalog.expect_delete_category()
            .with(always())
            .returning(|_| Err(EcommerceError::Conflict("category still has products".into())));
        let response = send(mocks.app(), request("DELETE", "/api/v1/categories/shirts", As::Staff(Uuid::new_v4()), None)).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
