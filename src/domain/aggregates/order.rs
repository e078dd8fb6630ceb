//! Order Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::cart::Cart;
use crate::domain::value_objects::fits_amount_column;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn can_cancel(self) -> bool { matches!(self, Self::Pending | Self::Processing) }

    pub fn display(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub shipping_method_id: Option<Uuid>,
    pub total_amount: Decimal,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn ensure_cancellable(&self) -> Result<(), OrderError> {
        if !self.status.can_cancel() {
            return Err(OrderError::CannotCancel(self.status));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price_at_purchase: Decimal,
}

impl OrderItem {
    pub fn item_total(&self) -> Decimal { self.price_at_purchase * Decimal::from(self.quantity) }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ShippingMethod {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub cost: Decimal,
    pub is_active: bool,
}

/// Order row plus its item count, for listings.
#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct OrderWithCount {
    #[sqlx(flatten)]
    pub order: Order,
    pub item_count: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrderSummary {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub status_display: &'static str,
    pub total_amount: Decimal,
    pub item_count: i64,
    pub created_at: DateTime<Utc>,
}

impl From<OrderWithCount> for OrderSummary {
    fn from(row: OrderWithCount) -> Self {
        let OrderWithCount { order, item_count } = row;
        Self {
            id: order.id,
            user_id: order.user_id,
            status: order.status,
            status_display: order.status.display(),
            total_amount: order.total_amount,
            item_count,
            created_at: order.created_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrderItemView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price_at_purchase: Decimal,
    pub item_total: Decimal,
}

impl From<OrderItem> for OrderItemView {
    fn from(item: OrderItem) -> Self {
        Self { id: item.id, product_id: item.product_id, quantity: item.quantity, price_at_purchase: item.price_at_purchase, item_total: item.item_total() }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrderDetail {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub status_display: &'static str,
    pub items: Vec<OrderItemView>,
    pub item_count: usize,
    pub shipping_method_id: Option<Uuid>,
    pub total_amount: Decimal,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderDetail {
    pub fn new(order: Order, items: Vec<OrderItem>) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            status: order.status,
            status_display: order.status.display(),
            item_count: items.len(),
            items: items.into_iter().map(OrderItemView::from).collect(),
            shipping_method_id: order.shipping_method_id,
            total_amount: order.total_amount,
            tracking_number: order.tracking_number,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

/// A line to be written as an order item.
#[derive(Clone, Debug, PartialEq)]
pub struct PlannedItem {
    pub product_id: Uuid,
    pub quantity: i32,
    pub price_at_purchase: Decimal,
}

/// What checkout writes: the discounted order total and undiscounted per-item snapshots.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckoutPlan {
    pub cart_id: Uuid,
    pub total_amount: Decimal,
    pub items: Vec<PlannedItem>,
}

impl CheckoutPlan {
    pub fn from_cart(cart: &Cart, now: DateTime<Utc>) -> Result<Self, OrderError> {
        if cart.is_empty() {
            return Err(OrderError::EmptyCart);
        }
        if let Some(line) = cart.lines().iter().find(|line| !fits_amount_column(line.line_total())) {
            return Err(OrderError::AmountTooLarge(line.line_total()));
        }
        let total_amount = cart.final_price_at(now);
        if !fits_amount_column(total_amount) {
            return Err(OrderError::AmountTooLarge(total_amount));
        }
        let items = cart.lines().iter().map(|line| PlannedItem {
            product_id: line.product_id,
            quantity: line.quantity,
            price_at_purchase: line.unit_price,
        }).collect();
        Ok(Self { cart_id: cart.id(), total_amount, items })
    }
}

#[derive(Clone, Debug, Default, Deserialize, Validate)]
pub struct CheckoutRequest {
    pub shipping_method_id: Option<Uuid>,
}

/// Staff-side changes; everything else on an order is fixed at checkout.
#[derive(Clone, Debug, Default, Deserialize, Validate)]
pub struct OrderUpdate {
    pub status: Option<OrderStatus>,
    #[validate(length(max = 100))]
    pub tracking_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("cart is empty")]
    EmptyCart,
    #[error("order cannot be cancelled while {}", .0.display().to_lowercase())]
    CannotCancel(OrderStatus),
    #[error("shipping method is not available")]
    ShippingMethodUnavailable,
    #[error("amount {0} exceeds the order limit of 99999999.99")]
    AmountTooLarge(Decimal),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::cart::tests::{line, record};
    use crate::domain::aggregates::coupon::tests::welcome10;
    use crate::domain::value_objects::MAX_AMOUNT;

    fn order(status: OrderStatus) -> Order {
        let now = Utc::now();
        Order { id: Uuid::new_v4(), user_id: Uuid::new_v4(), status, shipping_method_id: None, total_amount: Decimal::ZERO, tracking_number: None, created_at: now, updated_at: now }
    }

    #[test]
    fn test_checkout_plan_snapshots_unit_price() {
        let cart = Cart::new(record(Uuid::new_v4()), None, vec![line("Boots", Decimal::new(7500, 2), 2)]);
        let plan = CheckoutPlan::from_cart(&cart, Utc::now()).unwrap();
        assert_eq!(plan.total_amount, Decimal::new(15000, 2));
        assert_eq!(plan.items.len(), 1);
        assert_eq!(plan.items[0].price_at_purchase, Decimal::new(7500, 2));
        assert_eq!(plan.items[0].quantity, 2);
        assert_eq!(plan.cart_id, cart.id());
    }

    #[test]
    fn test_checkout_plan_discount_only_on_total() {
        let now = Utc::now();
        let cart = Cart::new(record(Uuid::new_v4()), Some(welcome10(now)), vec![line("Boots", Decimal::new(5000, 2), 2)]);
        let plan = CheckoutPlan::from_cart(&cart, now).unwrap();
        assert_eq!(plan.total_amount, Decimal::new(9000, 2));
        assert_eq!(plan.items[0].price_at_purchase, Decimal::new(5000, 2));
    }

    #[test]
    fn test_checkout_plan_rejects_empty_cart() {
        let cart = Cart::new(record(Uuid::new_v4()), None, vec![]);
        assert_eq!(CheckoutPlan::from_cart(&cart, Utc::now()), Err(OrderError::EmptyCart));
        assert_eq!(OrderError::EmptyCart.to_string(), "cart is empty");
    }

    #[test]
    fn test_checkout_plan_rejects_unstorable_total() {
        let cart = Cart::new(record(Uuid::new_v4()), None, vec![line("Crown", Decimal::new(9_999_900, 2), 2000)]);
        assert_eq!(CheckoutPlan::from_cart(&cart, Utc::now()), Err(OrderError::AmountTooLarge(Decimal::new(19_999_800_000, 2))));

        let lines = vec![line("Crown", Decimal::new(6_000_000_000, 2), 1), line("Sceptre", Decimal::new(6_000_000_000, 2), 1)];
        let cart = Cart::new(record(Uuid::new_v4()), None, lines);
        assert_eq!(CheckoutPlan::from_cart(&cart, Utc::now()), Err(OrderError::AmountTooLarge(Decimal::new(12_000_000_000, 2))));
    }

    #[test]
    fn test_checkout_plan_accepts_largest_total() {
        let cart = Cart::new(record(Uuid::new_v4()), None, vec![line("Crown", MAX_AMOUNT, 1)]);
        assert_eq!(CheckoutPlan::from_cart(&cart, Utc::now()).unwrap().total_amount, MAX_AMOUNT);
    }

    #[test]
    fn test_cancellation_rules() {
        assert!(order(OrderStatus::Pending).ensure_cancellable().is_ok());
        assert!(order(OrderStatus::Processing).ensure_cancellable().is_ok());
        for status in [OrderStatus::Shipped, OrderStatus::Delivered, OrderStatus::Cancelled] {
            assert_eq!(order(status).ensure_cancellable(), Err(OrderError::CannotCancel(status)));
        }
        assert_eq!(OrderError::CannotCancel(OrderStatus::Shipped).to_string(), "order cannot be cancelled while shipped");
    }

    #[test]
    fn test_detail_item_totals() {
        let o = order(OrderStatus::Pending);
        let item = OrderItem { id: Uuid::new_v4(), order_id: o.id, product_id: Uuid::new_v4(), quantity: 2, price_at_purchase: Decimal::new(1000, 2) };
        let detail = OrderDetail::new(o, vec![item]);
        assert_eq!(detail.item_count, 1);
        assert_eq!(detail.items[0].item_total, Decimal::new(2000, 2));
        assert_eq!(detail.status_display, "Pending");
    }
}
