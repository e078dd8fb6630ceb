//! One async trait per area plus its Postgres implementation.
//!
//! Services own transaction boundaries and publish domain events once the
//! transaction has committed. Handlers only see the traits.

pub mod account;
pub mod analytics;
pub mod cart;
pub mod catalog;
pub mod order;
pub mod payment;
pub mod review;

pub use account::{AccountService, PgAccountService};
pub use analytics::{AnalyticsService, PgAnalyticsService};
pub use cart::{CartService, PgCartService};
pub use catalog::{CatalogService, PgCatalogService};
pub use order::{OrderService, PgOrderService};
pub use payment::{PaymentService, PgPaymentService};
pub use review::{PgReviewService, ReviewService};

use sqlx::PgPool;
use std::sync::Arc;

use crate::messaging::EventPublisher;

/// Every service behind a trait object, ready to hand to the router.
#[derive(Clone)]
pub struct Services {
    pub accounts: Arc<dyn AccountService>,
    pub analytics: Arc<dyn AnalyticsService>,
    pub carts: Arc<dyn CartService>,
    pub catalog: Arc<dyn CatalogService>,
    pub orders: Arc<dyn OrderService>,
    pub payments: Arc<dyn PaymentService>,
    pub reviews: Arc<dyn ReviewService>,
}

impl Services {
    pub fn postgres(pool: PgPool, events: EventPublisher) -> Self {
        Self {
            accounts: Arc::new(PgAccountService::new(pool.clone())),
            analytics: Arc::new(PgAnalyticsService::new(pool.clone(), events.clone())),
            carts: Arc::new(PgCartService::new(pool.clone(), events.clone())),
            catalog: Arc::new(PgCatalogService::new(pool.clone())),
            orders: Arc::new(PgOrderService::new(pool.clone(), events.clone())),
            payments: Arc::new(PgPaymentService::new(pool.clone(), events.clone())),
            reviews: Arc::new(PgReviewService::new(pool, events)),
        }
    }
}
