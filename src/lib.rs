//! OpenSASE Storefront
//!
//! Self-hosted storefront backend.
//!
//! ## Features
//! - Product catalog with brands, categories, tags, variants and images
//! - Shopping cart with coupon pricing
//! - Transactional checkout and order management
//! - Payment records
//! - Ratings and reviews
//! - Page/product view tracking and daily sales reports

pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod messaging;
pub mod pagination;
pub mod repository;
pub mod service;

pub use error::{EcommerceError, Result};
