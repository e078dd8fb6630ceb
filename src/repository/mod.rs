//! sqlx queries, one module per area.
//!
//! Every function takes `&mut PgConnection`, so the caller decides whether it
//! runs on a pooled connection or inside a transaction.

pub mod account;
pub mod analytics;
pub mod cart;
pub mod catalog;
pub mod order;
pub mod payment;
pub mod review;
