//! Value Objects for the storefront

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use validator::ValidationError;

/// Currency amounts carry two decimal places.
pub const CURRENCY_SCALE: u32 = 2;

/// Round an amount to cents, midpoint away from zero (what `NUMERIC(_, 2)` does on store).
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// `part / whole * 100`, rounded to two places. Zero when `whole` is zero.
pub fn percentage(part: i64, whole: i64) -> Decimal {
    if whole == 0 {
        return Decimal::ZERO;
    }
    round_currency(Decimal::from(part) / Decimal::from(whole) * Decimal::ONE_HUNDRED)
}

/// Largest amount a `NUMERIC(10, 2)` column holds.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, CURRENCY_SCALE);

/// Whether `amount` can be stored in a `NUMERIC(10, 2)` column once rounded to cents.
pub fn fits_amount_column(amount: Decimal) -> bool {
    round_currency(amount).abs() <= MAX_AMOUNT
}

/// Field validator: amount must be non-negative and storable.
pub fn validate_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount < Decimal::ZERO {
        return Err(ValidationError::new("negative_amount"));
    }
    if !fits_amount_column(*amount) {
        return Err(ValidationError::new("amount_too_large"));
    }
    Ok(())
}

/// Field validator: a percentage between 0 and 100 inclusive.
pub fn validate_percentage(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO || *value > Decimal::ONE_HUNDRED {
        return Err(ValidationError::new("percentage_out_of_range"));
    }
    Ok(())
}

/// URL-safe identifier for catalog records
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slug(String);

impl Slug {
    pub fn new(value: impl AsRef<str>) -> Result<Self, SlugError> {
        let mut slug = String::new();
        for c in value.as_ref().trim().chars() {
            if c.is_ascii_alphanumeric() {
                slug.push(c.to_ascii_lowercase());
            } else if (c.is_whitespace() || c == '-' || c == '_') && !slug.ends_with('-') {
                slug.push('-');
            }
        }
        let slug = slug.trim_matches('-').to_string();
        if slug.is_empty() { return Err(SlugError::Empty); }
        if slug.len() > 255 { return Err(SlugError::TooLong); }
        Ok(Self(slug))
    }

    /// Slug for a user-supplied value if present, otherwise derived from the name.
    pub fn from_optional(explicit: Option<&str>, name: &str) -> Result<Self, SlugError> {
        Self::new(explicit.unwrap_or(name))
    }

    pub fn as_str(&self) -> &str { &self.0 }
    pub fn into_string(self) -> String { self.0 }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlugError {
    #[error("slug must contain at least one letter or digit")]
    Empty,
    #[error("slug is longer than 255 characters")]
    TooLong,
}

/// Star rating, 1 to 5 inclusive
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Stars(i16);

impl Stars {
    pub const MIN: i16 = 1;
    pub const MAX: i16 = 5;

    pub fn new(value: i16) -> Result<Self, StarsError> {
        if !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(StarsError(value));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> i16 { self.0 }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("rating must be between 1 and 5, got {0}")]
pub struct StarsError(pub i16);
