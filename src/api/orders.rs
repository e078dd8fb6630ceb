//! Checkout and order tracking

use axum::{body::Bytes, extract::{Path, Query, State}, http::StatusCode, routing::{get, post}, Json, Router};
use uuid::Uuid;

use super::{extract::{optional_json, ValidatedJson}, AppState};
use crate::auth::Caller;
use crate::domain::aggregates::{CheckoutRequest, OrderDetail, OrderSummary, OrderUpdate, ShippingMethod};
use crate::error::Result;
use crate::pagination::{ListParams, PaginatedResponse};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders).post(checkout))
        .route("/orders/:id", get(get_order).patch(update_order))
        .route("/orders/:id/cancel", post(cancel_order))
        .route("/shipping-methods", get(shipping_methods))
}

/// The body is optional; `{}` and nothing at all both check out without a shipping method.
async fn checkout(State(s): State<AppState>, caller: Caller, body: Bytes) -> Result<(StatusCode, Json<OrderDetail>)> {
    let request: CheckoutRequest = optional_json(&body)?;
    Ok((StatusCode::CREATED, Json(s.orders.checkout(caller.user_id, request).await?)))
}

async fn list_orders(State(s): State<AppState>, caller: Caller, Query(p): Query<ListParams>) -> Result<Json<PaginatedResponse<OrderSummary>>> {
    Ok(Json(s.orders.list_orders(caller, p.into()).await?))
}

async fn get_order(State(s): State<AppState>, caller: Caller, Path(id): Path<Uuid>) -> Result<Json<OrderDetail>> {
    Ok(Json(s.orders.get_order(caller, id).await?))
}

async fn update_order(State(s): State<AppState>, caller: Caller, Path(id): Path<Uuid>, ValidatedJson(body): ValidatedJson<OrderUpdate>) -> Result<Json<OrderDetail>> {
    caller.require_staff()?;
    Ok(Json(s.orders.update_order(id, body).await?))
}

async fn cancel_order(State(s): State<AppState>, caller: Caller, Path(id): Path<Uuid>) -> Result<Json<OrderDetail>> {
    Ok(Json(s.orders.cancel_order(caller, id).await?))
}

async fn shipping_methods(State(s): State<AppState>) -> Result<Json<Vec<ShippingMethod>>> {
    Ok(Json(s.orders.shipping_methods().await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{json_body, request, send, As, Mocks};
    use crate::domain::aggregates::{Order, OrderError, OrderItem, OrderStatus};
    use crate::error::EcommerceError;
    use chrono::Utc;
    use mockall::predicate::eq;
    use rust_decimal::Decimal;

    fn placed(user_id: Uuid, status: OrderStatus) -> OrderDetail {
        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4(), user_id, status, shipping_method_id: None, total_amount: Decimal::new(15000, 2),
            tracking_number: None, created_at: now, updated_at: now,
        };
        let item = OrderItem { id: Uuid::new_v4(), order_id: order.id, product_id: Uuid::new_v4(), quantity: 2, price_at_purchase: Decimal::new(7500, 2) };
        OrderDetail::new(order, vec![item])
    }

    #[tokio::test]
    async fn test_checkout_without_body() {
        let user = Uuid::new_v4();
        let mut mocks = Mocks::default();
        mocks.orders.expect_checkout()
            .withf(move |user_id, request| *user_id == user && request.shipping_method_id.is_none())
            .times(1)
            .returning(|user_id, _| Ok(placed(user_id, OrderStatus::Pending)));

        let response = send(mocks.app(), request("POST", "/api/v1/orders", As::Customer(user), None)).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["status"], "pending");
        assert_eq!(body["status_display"], "Pending");
        assert_eq!(body["total_amount"], "150.00");
        assert_eq!(body["items"][0]["price_at_purchase"], "75.00");
        assert_eq!(body["items"][0]["item_total"], "150.00");
    }

    #[tokio::test]
    async fn test_checkout_empty_cart_is_bad_request() {
        let mut mocks = Mocks::default();
        mocks.orders.expect_checkout().returning(|_, _| Err(OrderError::EmptyCart.into()));
        let response = send(mocks.app(), request("POST", "/api/v1/orders", As::Customer(Uuid::new_v4()), Some(serde_json::json!({})))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "cart is empty");
    }

    #[tokio::test]
    async fn test_cancel_shipped_order_is_refused() {
        let user = Uuid::new_v4();
        let order_id = Uuid::new_v4();
        let mut mocks = Mocks::default();
        mocks.orders.expect_cancel_order()
            .with(eq(crate::auth::Caller::customer(user)), eq(order_id))
            .returning(|_, _| Err(EcommerceError::from(OrderError::CannotCancel(OrderStatus::Shipped))));
        let uri = format!("/api/v1/orders/{order_id}/cancel");
        let response = send(mocks.app(), request("POST", &uri, As::Customer(user), None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "order cannot be cancelled while shipped");
    }

    #[tokio::test]
    async fn test_update_requires_staff() {
        let uri = format!("/api/v1/orders/{}", Uuid::new_v4());
        let body = serde_json::json!({"status": "shipped", "tracking_number": "1Z999"});
        let response = send(Mocks::default().app(), request("PATCH", &uri, As::Customer(Uuid::new_v4()), Some(body))).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
