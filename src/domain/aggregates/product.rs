//! Catalog Aggregate: products with their brand, category, tags, variants and images

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::value_objects::validate_amount;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub base_price: Decimal,
    pub brand_id: Uuid,
    pub category_id: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<Uuid>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Brand {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProductVariant {
    pub id: Uuid,
    pub product_id: Uuid,
    pub size: Option<String>,
    pub color: Option<String>,
    pub sku: String,
    pub price_adjustment: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProductImage {
    pub id: Uuid,
    pub product_id: Uuid,
    pub url: String,
    pub alt_text: String,
    pub is_main: bool,
    pub position: i32,
}

/// Everything the product page shows.
#[derive(Clone, Debug, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub brand: Brand,
    pub category: Category,
    pub tags: Vec<Tag>,
    pub variants: Vec<ProductVariant>,
    pub images: Vec<ProductImage>,
    pub average_rating: Option<Decimal>,
    pub rating_count: i64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProductOrdering {
    PriceAsc,
    PriceDesc,
    CreatedAsc,
    #[default]
    CreatedDesc,
    NameAsc,
    NameDesc,
}

impl ProductOrdering {
    /// Parses `price`, `-price`, `created_at`, `-created_at`, `name`, `-name`.
    /// `base_price` is accepted as an alias of `price`.
    pub fn parse(value: &str) -> Option<Self> {
        let (descending, field) = match value.strip_prefix('-') {
            Some(field) => (true, field),
            None => (false, value),
        };
        let ordering = match (field, descending) {
            ("price" | "base_price", false) => Self::PriceAsc,
            ("price" | "base_price", true) => Self::PriceDesc,
            ("created_at", false) => Self::CreatedAsc,
            ("created_at", true) => Self::CreatedDesc,
            ("name", false) => Self::NameAsc,
            ("name", true) => Self::NameDesc,
            _ => return None,
        };
        Some(ordering)
    }
}

/// Listing filters for the product catalog.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProductFilter {
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub tag: Option<String>,
    pub search: Option<String>,
    pub ordering: ProductOrdering,
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct NewProduct {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 255))]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: String,
    #[validate(custom = "validate_amount")]
    pub base_price: Decimal,
    pub brand_id: Uuid,
    pub category_id: Uuid,
    #[serde(default)]
    pub tag_ids: Vec<Uuid>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool { true }

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct NewCategory {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub slug: Option<String>,
    pub parent_id: Option<Uuid>,
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct NewBrand {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct NewTag {
    #[validate(length(min = 1, max = 50))]
    pub name: String,
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct NewVariant {
    #[validate(length(max = 50))]
    pub size: Option<String>,
    #[validate(length(max = 50))]
    pub color: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub sku: String,
    #[serde(default)]
    pub price_adjustment: Decimal,
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct NewImage {
    #[validate(url)]
    pub url: String,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub alt_text: String,
    #[serde(default)]
    pub is_main: bool,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub position: i32,
}
