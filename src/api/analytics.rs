//! View tracking and staff reporting

use axum::{body::Bytes, extract::{Path, Query, State}, http::StatusCode, routing::{get, post}, Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use validator::Validate;

use super::{extract::{optional_json, ValidatedJson}, AppState};
use crate::auth::{Caller, SessionId};
use crate::domain::aggregates::{
    DashboardStats, NewPageView, NewProductView, PageView, ProductView, ReportSummary, RevenueAnalytics, SalesReportView,
    TrendingProduct, UserBehavior,
};
use crate::error::Result;
use crate::pagination::{ListParams, PaginatedResponse};
use crate::service::analytics::Visitor;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/analytics/page-views", get(list_page_views).post(track_page_view))
        .route("/analytics/product-views", get(list_product_views).post(track_product_view))
        .route("/analytics/sales-reports", get(list_reports))
        .route("/analytics/sales-reports/:date", get(get_report))
        .route("/analytics/generate-daily-report", post(generate_daily_report))
        .route("/analytics/dashboard-stats", get(dashboard_stats))
        .route("/analytics/trending-products", get(trending_products))
        .route("/analytics/revenue-analytics", get(revenue_analytics))
        .route("/analytics/user-behavior", get(user_behavior))
}

fn visitor(caller: Option<Caller>, SessionId(session_id): SessionId) -> Visitor {
    Visitor { user_id: caller.map(|c| c.user_id), session_id }
}

#[derive(Debug, Default, Deserialize, Validate)]
struct ReportRequest {
    date: Option<NaiveDate>,
}

async fn track_page_view(State(s): State<AppState>, caller: Option<Caller>, session: SessionId, ValidatedJson(body): ValidatedJson<NewPageView>) -> Result<(StatusCode, Json<PageView>)> {
    Ok((StatusCode::CREATED, Json(s.analytics.track_page_view(visitor(caller, session), body).await?)))
}

async fn track_product_view(State(s): State<AppState>, caller: Option<Caller>, session: SessionId, ValidatedJson(body): ValidatedJson<NewProductView>) -> Result<(StatusCode, Json<ProductView>)> {
    Ok((StatusCode::CREATED, Json(s.analytics.track_product_view(visitor(caller, session), body).await?)))
}

async fn list_page_views(State(s): State<AppState>, caller: Caller, Query(p): Query<ListParams>) -> Result<Json<PaginatedResponse<PageView>>> {
    caller.require_staff()?;
    Ok(Json(s.analytics.list_page_views(p.into()).await?))
}

async fn list_product_views(State(s): State<AppState>, caller: Caller, Query(p): Query<ListParams>) -> Result<Json<PaginatedResponse<ProductView>>> {
    caller.require_staff()?;
    Ok(Json(s.analytics.list_product_views(p.into()).await?))
}

async fn list_reports(State(s): State<AppState>, caller: Caller, Query(p): Query<ListParams>) -> Result<Json<PaginatedResponse<SalesReportView>>> {
    caller.require_staff()?;
    Ok(Json(s.analytics.list_reports(p.into()).await?))
}

async fn get_report(State(s): State<AppState>, caller: Caller, Path(date): Path<NaiveDate>) -> Result<Json<SalesReportView>> {
    caller.require_staff()?;
    Ok(Json(s.analytics.get_report(date).await?))
}

/// `{"date": "YYYY-MM-DD"}` picks the day; no body means today.
async fn generate_daily_report(State(s): State<AppState>, caller: Caller, body: Bytes) -> Result<Json<ReportSummary>> {
    caller.require_staff()?;
    let request: ReportRequest = optional_json(&body)?;
    Ok(Json(s.analytics.generate_daily_report(request.date).await?))
}

async fn dashboard_stats(State(s): State<AppState>, caller: Caller) -> Result<Json<DashboardStats>> {
    caller.require_staff()?;
    Ok(Json(s.analytics.dashboard_stats().await?))
}

async fn trending_products(State(s): State<AppState>, caller: Caller) -> Result<Json<Vec<TrendingProduct>>> {
    caller.require_staff()?;
    Ok(Json(s.analytics.trending_products().await?))
}

async fn revenue_analytics(State(s): State<AppState>, caller: Caller) -> Result<Json<RevenueAnalytics>> {
    caller.require_staff()?;
    Ok(Json(s.analytics.revenue_analytics().await?))
}

async fn user_behavior(State(s): State<AppState>, caller: Caller) -> Result<Json<UserBehavior>> {
    caller.require_staff()?;
    Ok(Json(s.analytics.user_behavior().await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{json_body, request, send, As, Mocks};
    use crate::auth::SESSION_ID_HEADER;
    use axum::body::Body;
    use chrono::Utc;
    use mockall::predicate::eq;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_anonymous_page_view_keeps_session() {
        let mut mocks = Mocks::default();
        mocks.analytics.expect_track_page_view()
            .withf(|visitor, view| visitor.user_id.is_none() && visitor.session_id.as_deref() == Some("sess-1") && view.page_url == "/home")
            .times(1)
            .returning(|visitor, view| Ok(PageView {
                id: Uuid::new_v4(), user_id: visitor.user_id, page_url: view.page_url, page_title: view.page_title,
                session_id: visitor.session_id, ip_address: None, user_agent: view.user_agent, created_at: Utc::now(),
            }));

        let req = axum::http::Request::builder()
            .method("POST")
            .uri("/api/v1/analytics/page-views")
            .header("content-type", "application/json")
            .header(SESSION_ID_HEADER, "sess-1")
            .body(Body::from(r#"{"page_url": "/home"}"#))
            .unwrap();
        let response = send(mocks.app(), req).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(json_body(response).await["session_id"], "sess-1");
    }

    #[tokio::test]
    async fn test_generate_report_for_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let mut mocks = Mocks::default();
        mocks.analytics.expect_generate_daily_report()
            .with(eq(Some(date)))
            .times(1)
            .returning(|date| Ok(ReportSummary { report_generated: true, total_revenue: Decimal::new(24000, 2), date: date.unwrap() }));
        let body = serde_json::json!({"date": "2024-03-01"});
        let response = send(mocks.app(), request("POST", "/api/v1/analytics/generate-daily-report", As::Staff(Uuid::new_v4()), Some(body))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["report_generated"], true);
        assert_eq!(body["total_revenue"], "240.00");
        assert_eq!(body["date"], "2024-03-01");
    }

    #[tokio::test]
    async fn test_generate_report_defaults_to_today() {
        let mut mocks = Mocks::default();
        mocks.analytics.expect_generate_daily_report()
            .with(eq(None::<NaiveDate>))
            .times(1)
            .returning(|_| Ok(ReportSummary { report_generated: true, total_revenue: Decimal::ZERO, date: Utc::now().date_naive() }));
        let response = send(mocks.app(), request("POST", "/api/v1/analytics/generate-daily-report", As::Staff(Uuid::new_v4()), None)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_reports_are_staff_only() {
        for uri in ["/api/v1/analytics/dashboard-stats", "/api/v1/analytics/sales-reports", "/api/v1/analytics/user-behavior"] {
            let response = send(Mocks::default().app(), request("GET", uri, As::Customer(Uuid::new_v4()), None)).await;
            assert_eq!(response.status(), StatusCode::FORBIDDEN, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_bad_report_date() {
        let response = send(Mocks::default().app(), request("GET", "/api/v1/analytics/sales-reports/yesterday", As::Staff(Uuid::new_v4()), None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
