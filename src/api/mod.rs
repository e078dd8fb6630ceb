//! HTTP surface under `/api/v1`

pub mod accounts;
pub mod analytics;
pub mod carts;
pub mod catalog;
pub mod extract;
pub mod orders;
pub mod payments;
pub mod reviews;

use axum::{routing::get, Json, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use crate::service::Services as AppState;

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "healthy", "service": "opensase-storefront"}))
}

/// Routes without middleware or state; handy for tests.
pub fn routes() -> Router<AppState> {
    let api = Router::new()
        .route("/health", get(health))
        .merge(accounts::routes())
        .merge(catalog::routes())
        .merge(carts::routes())
        .merge(orders::routes())
        .merge(payments::routes())
        .merge(reviews::routes())
        .merge(analytics::routes());
    Router::new().route("/health", get(health)).nest("/api/v1", api)
}

pub fn router(state: AppState) -> Router {
    routes().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use axum::{body::Body, http::{Request, Response}, Router};
    use std::sync::Arc;
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::AppState;
    use crate::auth::{USER_ID_HEADER, USER_ROLE_HEADER};
    use crate::service::{
        account::MockAccountService, analytics::MockAnalyticsService, cart::MockCartService,
        catalog::MockCatalogService, order::MockOrderService, payment::MockPaymentService,
        review::MockReviewService,
    };

    /// Mocks with no expectations; tests set the ones they need.
    #[derive(Default)]
    pub(crate) struct Mocks {
        pub accounts: MockAccountService,
        pub analytics: MockAnalyticsService,
        pub carts: MockCartService,
        pub catalog: MockCatalogService,
        pub orders: MockOrderService,
        pub payments: MockPaymentService,
        pub reviews: MockReviewService,
    }

    impl Mocks {
        pub(crate) fn app(self) -> Router {
            super::routes().with_state(AppState {
                accounts: Arc::new(self.accounts),
                analytics: Arc::new(self.analytics),
                carts: Arc::new(self.carts),
                catalog: Arc::new(self.catalog),
                orders: Arc::new(self.orders),
                payments: Arc::new(self.payments),
                reviews: Arc::new(self.reviews),
            })
        }
    }

    pub(crate) enum As {
        Anonymous,
        Customer(Uuid),
        Staff(Uuid),
    }

    pub(crate) fn request(method: &str, uri: &str, who: As, body: Option<serde_json::Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        match who {
            As::Anonymous => {}
            As::Customer(id) => builder = builder.header(USER_ID_HEADER, id.to_string()),
            As::Staff(id) => builder = builder.header(USER_ID_HEADER, id.to_string()).header(USER_ROLE_HEADER, "staff"),
        }
        match body {
            Some(json) => builder.header("content-type", "application/json").body(Body::from(json.to_string())).unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    pub(crate) async fn send(app: Router, request: Request<Body>) -> Response<Body> {
        app.oneshot(request).await.unwrap()
    }

    pub(crate) async fn json_body(response: Response<Body>) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = send(Mocks::default().app(), request("GET", "/api/v1/health", As::Anonymous, None)).await;
        assert_eq!(response.status(), axum::http::StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "healthy");
    }
}
