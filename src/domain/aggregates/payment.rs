//! Payment records. Status is whatever the gateway last reported; no transition rules.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::value_objects::validate_amount;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn display(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
            Self::Refunded => "Refunded",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PaymentMethod {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub is_active: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Option<Uuid>,
    pub payment_method_id: Option<Uuid>,
    pub amount: Decimal,
    pub currency: String,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payment joined with its method name.
#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct PaymentRow {
    #[sqlx(flatten)]
    pub payment: Payment,
    pub payment_method_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PaymentView {
    #[serde(flatten)]
    pub payment: Payment,
    pub payment_method_display: String,
    pub status_display: &'static str,
}

impl From<PaymentRow> for PaymentView {
    fn from(row: PaymentRow) -> Self {
        let status_display = row.payment.status.display();
        Self { payment: row.payment, payment_method_display: row.payment_method_name.unwrap_or_default(), status_display }
    }
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct NewPayment {
    pub order_id: Uuid,
    pub payment_method_id: Option<Uuid>,
    #[validate(custom = "validate_amount")]
    pub amount: Decimal,
    #[serde(default = "default_currency")]
    #[validate(length(equal = 3))]
    pub currency: String,
}

fn default_currency() -> String { "USD".to_string() }

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct PaymentStatusUpdate {
    pub status: PaymentStatus,
}
