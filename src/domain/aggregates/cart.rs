//! Cart Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::coupon::Coupon;

/// A cart row: one per authenticated user, reused after checkout.
#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
pub struct CartRecord {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub session_id: Option<String>,
    pub coupon_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A cart item joined with the product's current price.
#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
pub struct CartLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_slug: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

impl CartLine {
    pub fn line_total(&self) -> Decimal { self.unit_price * Decimal::from(self.quantity) }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Cart {
    record: CartRecord,
    coupon: Option<Coupon>,
    lines: Vec<CartLine>,
}

/// Totals computed on demand from current product prices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CartPricing {
    pub total_items: usize,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub final_price: Decimal,
}

impl Cart {
    pub fn new(record: CartRecord, coupon: Option<Coupon>, lines: Vec<CartLine>) -> Self {
        Self { record, coupon, lines }
    }

    pub fn id(&self) -> Uuid { self.record.id }
    pub fn record(&self) -> &CartRecord { &self.record }
    pub fn coupon(&self) -> Option<&Coupon> { self.coupon.as_ref() }
    pub fn lines(&self) -> &[CartLine] { &self.lines }
    pub fn is_empty(&self) -> bool { self.lines.is_empty() }

    /// Σ quantity × current unit price.
    pub fn subtotal(&self) -> Decimal {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Coupon discount on the subtotal, zero without a coupon valid at `now`.
    pub fn discount_at(&self, now: DateTime<Utc>) -> Decimal {
        match &self.coupon {
            Some(coupon) if coupon.is_valid_at(now) => coupon.calculate_discount(self.subtotal()),
            _ => Decimal::ZERO,
        }
    }

    pub fn pricing_at(&self, now: DateTime<Utc>) -> CartPricing {
        let subtotal = self.subtotal();
        let discount = self.discount_at(now);
        CartPricing {
            total_items: self.lines.len(),
            subtotal,
            discount,
            final_price: (subtotal - discount).max(Decimal::ZERO),
        }
    }

    pub fn final_price_at(&self, now: DateTime<Utc>) -> Decimal { self.pricing_at(now).final_price }

    pub fn into_view(self, now: DateTime<Utc>) -> CartView {
        let pricing = self.pricing_at(now);
        CartView {
            id: self.record.id,
            user_id: self.record.user_id,
            coupon: self.coupon.map(|c| c.code),
            items: self.lines,
            total_items: pricing.total_items,
            total_price: pricing.subtotal,
            discount_amount: pricing.discount,
            final_price: pricing.final_price,
            created_at: self.record.created_at,
            updated_at: self.record.updated_at,
        }
    }
}

/// Response body for every cart endpoint.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CartView {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub items: Vec<CartLine>,
    pub total_items: usize,
    pub total_price: Decimal,
    pub coupon: Option<String>,
    pub discount_amount: Decimal,
    pub final_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Most units of one product a cart line may hold, also after merging repeated adds.
pub const MAX_LINE_QUANTITY: i32 = 10_000;

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct NewCartItem {
    pub product_id: Uuid,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1, max = 10000))]
    pub quantity: i32,
}

fn default_quantity() -> i32 { 1 }

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct CartItemUpdate {
    #[validate(range(min = 1, max = 10000))]
    pub quantity: i32,
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct ApplyCoupon {
    #[validate(length(min = 1, max = 50))]
    pub coupon_code: String,
}
