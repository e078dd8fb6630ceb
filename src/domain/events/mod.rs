//! Domain events, published after the owning transaction commits
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::{OrderStatus, PaymentStatus};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    OrderPlaced { order_id: Uuid, user_id: Uuid, total_amount: Decimal, item_count: usize },
    OrderCancelled { order_id: Uuid, user_id: Uuid },
    OrderUpdated { order_id: Uuid, status: OrderStatus, tracking_number: Option<String> },
    CouponApplied { cart_id: Uuid, code: String },
    RatingCreated { rating_id: Uuid, product_id: Uuid, user_id: Uuid, value: i16 },
    ReviewCreated { review_id: Uuid, rating_id: Uuid },
    PaymentRecorded { payment_id: Uuid, order_id: Option<Uuid>, amount: Decimal },
    PaymentStatusChanged { payment_id: Uuid, status: PaymentStatus },
    DailyReportGenerated { date: NaiveDate, total_revenue: Decimal },
}

impl DomainEvent {
    /// Subject suffix under the configured prefix.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::OrderPlaced { .. } => "orders.placed",
            Self::OrderCancelled { .. } => "orders.cancelled",
            Self::OrderUpdated { .. } => "orders.updated",
            Self::CouponApplied { .. } => "carts.coupon_applied",
            Self::RatingCreated { .. } => "ratings.created",
            Self::ReviewCreated { .. } => "reviews.created",
            Self::PaymentRecorded { .. } => "payments.recorded",
            Self::PaymentStatusChanged { .. } => "payments.status_changed",
            Self::DailyReportGenerated { .. } => "analytics.daily_report",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_is_tagged() {
        let event = DomainEvent::OrderCancelled { order_id: Uuid::nil(), user_id: Uuid::nil() };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "order_cancelled");
        assert_eq!(event.subject(), "orders.cancelled");
    }
}
