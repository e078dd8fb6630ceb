//! Checkout and order management

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::Caller;
use crate::domain::aggregates::{
    CheckoutPlan, CheckoutRequest, OrderDetail, OrderError, OrderStatus, OrderSummary, OrderUpdate, ShippingMethod,
};
use crate::domain::events::DomainEvent;
use crate::error::{EcommerceError, Result};
use crate::messaging::EventPublisher;
use crate::pagination::{Page, PaginatedResponse};
use crate::repository::{cart, order};
use crate::service::cart::load_cart;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderService: Send + Sync {
    /// Turns the caller's cart into an order in one transaction.
    async fn checkout(&self, user_id: Uuid, request: CheckoutRequest) -> Result<OrderDetail>;
    /// Staff see every order, everyone else their own.
    async fn list_orders(&self, caller: Caller, page: Page) -> Result<PaginatedResponse<OrderSummary>>;
    async fn get_order(&self, caller: Caller, id: Uuid) -> Result<OrderDetail>;
    async fn cancel_order(&self, caller: Caller, id: Uuid) -> Result<OrderDetail>;
    async fn update_order(&self, id: Uuid, update: OrderUpdate) -> Result<OrderDetail>;
    async fn shipping_methods(&self) -> Result<Vec<ShippingMethod>>;
}

#[derive(Clone, Debug)]
pub struct PgOrderService {
    pool: PgPool,
    events: EventPublisher,
}

impl PgOrderService {
    pub fn new(pool: PgPool, events: EventPublisher) -> Self { Self { pool, events } }
}

#[async_trait]
impl OrderService for PgOrderService {
    async fn checkout(&self, user_id: Uuid, request: CheckoutRequest) -> Result<OrderDetail> {
        let mut tx = self.pool.begin().await?;

        // The row lock serializes concurrent checkouts of the same cart.
        let record = cart::lock_cart_for_user(&mut tx, user_id).await?.ok_or(OrderError::EmptyCart)?;
        let cart = load_cart(&mut tx, record).await?;
        let plan = CheckoutPlan::from_cart(&cart, Utc::now())?;

        if let Some(method_id) = request.shipping_method_id {
            order::find_active_shipping_method(&mut tx, method_id).await?.ok_or(OrderError::ShippingMethodUnavailable)?;
        }

        let (placed, items) = order::insert_order(&mut tx, user_id, request.shipping_method_id, &plan).await?;
        cart::clear_items(&mut tx, plan.cart_id).await?;
        cart::set_coupon(&mut tx, plan.cart_id, None).await?;
        tx.commit().await?;

        info!(order_id = %placed.id, %user_id, total = %placed.total_amount, items = items.len(), "order placed");
        self.events.publish(DomainEvent::OrderPlaced {
            order_id: placed.id,
            user_id,
            total_amount: placed.total_amount,
            item_count: items.len(),
        }).await;
        Ok(OrderDetail::new(placed, items))
    }

    async fn list_orders(&self, caller: Caller, page: Page) -> Result<PaginatedResponse<OrderSummary>> {
        let owner = (!caller.is_staff).then_some(caller.user_id);
        let mut conn = self.pool.acquire().await?;
        let (orders, total) = order::list_orders(&mut conn, owner, page).await?;
        Ok(PaginatedResponse::new(orders.into_iter().map(OrderSummary::from).collect(), total, page))
    }

    async fn get_order(&self, caller: Caller, id: Uuid) -> Result<OrderDetail> {
        let mut conn = self.pool.acquire().await?;
        let found = order::find_order(&mut conn, id).await?
            .filter(|o| caller.can_access(o.user_id))
            .ok_or_else(|| EcommerceError::not_found("order"))?;
        let items = order::order_items(&mut conn, found.id).await?;
        Ok(OrderDetail::new(found, items))
    }

    async fn cancel_order(&self, caller: Caller, id: Uuid) -> Result<OrderDetail> {
        let mut tx = self.pool.begin().await?;
        let current = order::lock_order(&mut tx, id).await?
            .filter(|o| caller.can_access(o.user_id))
            .ok_or_else(|| EcommerceError::not_found("order"))?;
        if let Err(e) = current.ensure_cancellable() {
            warn!(order_id = %id, status = ?current.status, "cancellation refused");
            return Err(e.into());
        }
        let cancelled = order::set_status(&mut tx, id, OrderStatus::Cancelled).await?;
        let items = order::order_items(&mut tx, id).await?;
        tx.commit().await?;

        info!(order_id = %id, "order cancelled");
        self.events.publish(DomainEvent::OrderCancelled { order_id: id, user_id: cancelled.user_id }).await;
        Ok(OrderDetail::new(cancelled, items))
    }

    async fn update_order(&self, id: Uuid, update: OrderUpdate) -> Result<OrderDetail> {
        let mut tx = self.pool.begin().await?;
        let updated = order::update_order(&mut tx, id, &update).await?.ok_or_else(|| EcommerceError::not_found("order"))?;
        let items = order::order_items(&mut tx, id).await?;
        tx.commit().await?;

        info!(order_id = %id, status = ?updated.status, "order updated");
        self.events.publish(DomainEvent::OrderUpdated {
            order_id: id,
            status: updated.status,
            tracking_number: updated.tracking_number.clone(),
        }).await;
        Ok(OrderDetail::new(updated, items))
    }

    async fn shipping_methods(&self) -> Result<Vec<ShippingMethod>> {
        let mut conn = self.pool.acquire().await?;
        Ok(order::active_shipping_methods(&mut conn).await?)
    }
}
