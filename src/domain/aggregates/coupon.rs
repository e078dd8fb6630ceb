//! Coupon Aggregate: a time-windowed percentage discount code

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::domain::value_objects::{round_currency, validate_amount, validate_percentage};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Coupon {
    pub id: Uuid,
    pub code: String,
    pub discount_percentage: Decimal,
    /// Stored and reported, never applied to the discount.
    pub max_discount_amount: Option<Decimal>,
    pub is_active: bool,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
}

impl Coupon {
    /// Active and `valid_from <= now <= valid_to`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.valid_from <= now && now <= self.valid_to
    }

    pub fn is_valid(&self) -> bool { self.is_valid_at(Utc::now()) }

    /// `amount * discount_percentage / 100`, rounded to cents.
    pub fn calculate_discount(&self, amount: Decimal) -> Decimal {
        round_currency(amount * self.discount_percentage / Decimal::ONE_HUNDRED)
    }

    /// Gate for attaching this coupon to a cart at `now`.
    pub fn ensure_applicable(&self, now: DateTime<Utc>) -> Result<(), CouponError> {
        if !self.is_valid_at(now) {
            return Err(CouponError::NotValid(self.code.clone()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponError {
    #[error("invalid coupon code")]
    UnknownCode,
    #[error("coupon {0} is not valid")]
    NotValid(String),
}

/// Coupon as shown to shoppers, with its validity evaluated at read time.
#[derive(Clone, Debug, Serialize)]
pub struct CouponView {
    #[serde(flatten)]
    pub coupon: Coupon,
    pub is_valid: bool,
}

impl CouponView {
    pub fn at(coupon: Coupon, now: DateTime<Utc>) -> Self {
        let is_valid = coupon.is_valid_at(now);
        Self { coupon, is_valid }
    }
}

#[derive(Clone, Debug, Deserialize, Validate)]
#[validate(schema(function = "validate_window"))]
pub struct NewCoupon {
    #[validate(length(min = 1, max = 50))]
    pub code: String,
    #[validate(custom = "validate_percentage")]
    pub discount_percentage: Decimal,
    #[validate(custom = "validate_amount")]
    pub max_discount_amount: Option<Decimal>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
}

fn default_active() -> bool { true }

fn validate_window(coupon: &NewCoupon) -> Result<(), ValidationError> {
    if coupon.valid_from > coupon.valid_to {
        return Err(ValidationError::new("valid_from_after_valid_to"));
    }
    Ok(())
}
