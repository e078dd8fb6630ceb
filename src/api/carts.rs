//! Cart, cart items and coupons

use axum::{extract::{Path, State}, http::StatusCode, routing::{get, patch, post}, Json, Router};
use uuid::Uuid;

use super::{extract::ValidatedJson, AppState};
use crate::auth::Caller;
use crate::domain::aggregates::{ApplyCoupon, CartItemUpdate, CartLine, CartView, CouponView, NewCartItem, NewCoupon};
use crate::error::Result;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/carts", get(my_cart))
        .route("/carts/my_cart", get(my_cart))
        .route("/carts/apply_coupon", post(apply_coupon))
        .route("/carts/remove_coupon", post(remove_coupon))
        .route("/carts/clear", post(clear_cart))
        .route("/cart-items", get(list_items).post(add_item))
        .route("/cart-items/:id", patch(update_item).delete(remove_item))
        .route("/coupons", get(list_coupons).post(create_coupon))
        .route("/coupons/:code", get(get_coupon))
}

async fn my_cart(State(s): State<AppState>, caller: Caller) -> Result<Json<CartView>> {
    Ok(Json(s.carts.my_cart(caller.user_id).await?))
}

async fn apply_coupon(State(s): State<AppState>, caller: Caller, ValidatedJson(body): ValidatedJson<ApplyCoupon>) -> Result<Json<CartView>> {
    Ok(Json(s.carts.apply_coupon(caller.user_id, body.coupon_code).await?))
}

async fn remove_coupon(State(s): State<AppState>, caller: Caller) -> Result<Json<CartView>> {
    Ok(Json(s.carts.remove_coupon(caller.user_id).await?))
}

async fn clear_cart(State(s): State<AppState>, caller: Caller) -> Result<Json<CartView>> {
    Ok(Json(s.carts.clear(caller.user_id).await?))
}

async fn list_items(State(s): State<AppState>, caller: Caller) -> Result<Json<Vec<CartLine>>> {
    Ok(Json(s.carts.list_items(caller.user_id).await?))
}

async fn add_item(State(s): State<AppState>, caller: Caller, ValidatedJson(body): ValidatedJson<NewCartItem>) -> Result<(StatusCode, Json<CartLine>)> {
    let line = s.carts.add_item(caller.user_id, body.product_id, body.quantity).await?;
    Ok((StatusCode::CREATED, Json(line)))
}

async fn update_item(State(s): State<AppState>, caller: Caller, Path(id): Path<Uuid>, ValidatedJson(body): ValidatedJson<CartItemUpdate>) -> Result<Json<CartLine>> {
    Ok(Json(s.carts.update_item(caller.user_id, id, body.quantity).await?))
}

async fn remove_item(State(s): State<AppState>, caller: Caller, Path(id): Path<Uuid>) -> Result<StatusCode> {
    s.carts.remove_item(caller.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_coupons(State(s): State<AppState>, _caller: Caller) -> Result<Json<Vec<CouponView>>> {
    Ok(Json(s.carts.list_coupons().await?))
}

async fn get_coupon(State(s): State<AppState>, _caller: Caller, Path(code): Path<String>) -> Result<Json<CouponView>> {
    Ok(Json(s.carts.get_coupon(code).await?))
}

async fn create_coupon(State(s): State<AppState>, caller: Caller, ValidatedJson(body): ValidatedJson<NewCoupon>) -> Result<(StatusCode, Json<CouponView>)> {
    caller.require_staff()?;
    Ok((StatusCode::CREATED, Json(s.carts.create_coupon(body).await?)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{json_body, request, send, As, Mocks};
    use crate::domain::aggregates::cart::tests::{line, record};
    use crate::domain::aggregates::coupon::tests::welcome10;
    use crate::domain::aggregates::Cart;
    use crate::error::EcommerceError;
    use chrono::Utc;
    use mockall::predicate::eq;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_apply_coupon_returns_discounted_cart() {
        let user = Uuid::new_v4();
        let now = Utc::now();
        let mut mocks = Mocks::default();
        mocks.carts.expect_apply_coupon()
            .with(eq(user), eq("WELCOME10".to_string()))
            .times(1)
            .returning(move |user_id, _| {
                let cart = Cart::new(record(user_id), Some(welcome10(now)), vec![line("Lamp", Decimal::new(5000, 2), 2)]);
                Ok(cart.into_view(now))
            });

        let body = serde_json::json!({"coupon_code": "WELCOME10"});
        let response = send(mocks.app(), request("POST", "/api/v1/carts/apply_coupon", As::Customer(user), Some(body))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["total_price"], "100.00");
        assert_eq!(body["discount_amount"], "10.00");
        assert_eq!(body["final_price"], "90.00");
        assert_eq!(body["coupon"], "WELCOME10");
    }

    #[tokio::test]
    async fn test_unknown_coupon_is_not_found() {
        let mut mocks = Mocks::default();
        mocks.carts.expect_apply_coupon().returning(|_, _| Err(EcommerceError::not_found("coupon")));
        let body = serde_json::json!({"coupon_code": "NOPE"});
        let response = send(mocks.app(), request("POST", "/api/v1/carts/apply_coupon", As::Customer(Uuid::new_v4()), Some(body))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_add_item_rejects_out_of_range_quantity() {
        for quantity in [0, 10_001, i32::MAX] {
            let body = serde_json::json!({"product_id": Uuid::new_v4(), "quantity": quantity});
            let response = send(Mocks::default().app(), request("POST", "/api/v1/cart-items", As::Customer(Uuid::new_v4()), Some(body))).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{quantity}");
        }
    }

    #[tokio::test]
    async fn test_add_item_defaults_quantity() {
        let user = Uuid::new_v4();
        let product_id = Uuid::new_v4();
        let mut mocks = Mocks::default();
        mocks.carts.expect_add_item()
            .with(eq(user), eq(product_id), eq(1))
            .times(1)
            .returning(|_, _, quantity| Ok(CartLine { quantity, ..line("Tee", Decimal::new(1999, 2), 1) }));
        let body = serde_json::json!({"product_id": product_id});
        let response = send(mocks.app(), request("POST", "/api/v1/cart-items", As::Customer(user), Some(body))).await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_cart_requires_identity() {
        let response = send(Mocks::default().app(), request("GET", "/api/v1/carts/my_cart", As::Anonymous, None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
