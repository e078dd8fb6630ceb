//! View tracking, daily sales reports and staff dashboards

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::domain::aggregates::{
    DashboardStats, NewPageView, NewProductView, PageView, ProductView, ReportSummary, RevenueAnalytics, SalesReport,
    SalesReportView, TrendingProduct, UserBehavior,
};
use crate::domain::events::DomainEvent;
use crate::error::{EcommerceError, Result};
use crate::messaging::EventPublisher;
use crate::pagination::{Page, PaginatedResponse};
use crate::repository::{analytics, catalog};

pub const TRENDING_LIMIT: i64 = 10;

/// Who produced a tracked view; both halves may be absent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Visitor {
    pub user_id: Option<Uuid>,
    pub session_id: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnalyticsService: Send + Sync {
    async fn track_page_view(&self, visitor: Visitor, view: NewPageView) -> Result<PageView>;
    async fn track_product_view(&self, visitor: Visitor, view: NewProductView) -> Result<ProductView>;
    async fn list_page_views(&self, page: Page) -> Result<PaginatedResponse<PageView>>;
    async fn list_product_views(&self, page: Page) -> Result<PaginatedResponse<ProductView>>;

    async fn list_reports(&self, page: Page) -> Result<PaginatedResponse<SalesReportView>>;
    async fn get_report(&self, date: NaiveDate) -> Result<SalesReportView>;
    /// Recomputes the report for `date` (today, UTC, when absent), replacing any earlier run.
    async fn generate_daily_report(&self, date: Option<NaiveDate>) -> Result<ReportSummary>;

    async fn dashboard_stats(&self) -> Result<DashboardStats>;
    async fn trending_products(&self) -> Result<Vec<TrendingProduct>>;
    async fn revenue_analytics(&self) -> Result<RevenueAnalytics>;
    async fn user_behavior(&self) -> Result<UserBehavior>;
}

#[derive(Clone, Debug)]
pub struct PgAnalyticsService {
    pool: PgPool,
    events: EventPublisher,
}

impl PgAnalyticsService {
    pub fn new(pool: PgPool, events: EventPublisher) -> Self { Self { pool, events } }
}

#[async_trait]
impl AnalyticsService for PgAnalyticsService {
    async fn track_page_view(&self, visitor: Visitor, view: NewPageView) -> Result<PageView> {
        let mut conn = self.pool.acquire().await?;
        let session = view.session_id.as_deref().or(visitor.session_id.as_deref());
        Ok(analytics::insert_page_view(&mut conn, visitor.user_id, session, &view).await?)
    }

    async fn track_product_view(&self, visitor: Visitor, view: NewProductView) -> Result<ProductView> {
        let mut conn = self.pool.acquire().await?;
        catalog::find_product(&mut conn, view.product_id).await?.ok_or_else(|| EcommerceError::not_found("product"))?;
        let session = view.session_id.as_deref().or(visitor.session_id.as_deref());
        Ok(analytics::insert_product_view(&mut conn, visitor.user_id, session, &view).await?)
    }

    async fn list_page_views(&self, page: Page) -> Result<PaginatedResponse<PageView>> {
        let mut conn = self.pool.acquire().await?;
        let (views, total) = analytics::list_page_views(&mut conn, page).await?;
        Ok(PaginatedResponse::new(views, total, page))
    }

    async fn list_product_views(&self, page: Page) -> Result<PaginatedResponse<ProductView>> {
        let mut conn = self.pool.acquire().await?;
        let (views, total) = analytics::list_product_views(&mut conn, page).await?;
        Ok(PaginatedResponse::new(views, total, page))
    }

    async fn list_reports(&self, page: Page) -> Result<PaginatedResponse<SalesReportView>> {
        let mut conn = self.pool.acquire().await?;
        let (reports, total) = analytics::list_reports(&mut conn, page).await?;
        Ok(PaginatedResponse::new(reports, total, page).map(SalesReportView::from))
    }

    async fn get_report(&self, date: NaiveDate) -> Result<SalesReportView> {
        let mut conn = self.pool.acquire().await?;
        let report = analytics::find_report(&mut conn, date).await?.ok_or_else(|| EcommerceError::not_found("sales report"))?;
        Ok(report.into())
    }

    async fn generate_daily_report(&self, date: Option<NaiveDate>) -> Result<ReportSummary> {
        let date = date.unwrap_or_else(|| Utc::now().date_naive());
        let mut tx = self.pool.begin().await?;
        let totals = analytics::daily_totals(&mut tx, date).await?;
        let report = analytics::upsert_report(&mut tx, &SalesReport::from_totals(date, &totals)).await?;
        tx.commit().await?;

        info!(%date, revenue = %report.total_revenue, orders = report.total_orders, customers = report.total_customers, "daily report generated");
        self.events.publish(DomainEvent::DailyReportGenerated { date, total_revenue: report.total_revenue }).await;
        Ok(ReportSummary { report_generated: true, total_revenue: report.total_revenue, date })
    }

    async fn dashboard_stats(&self) -> Result<DashboardStats> {
        let mut conn = self.pool.acquire().await?;
        Ok(analytics::dashboard_stats(&mut conn).await?)
    }

    async fn trending_products(&self) -> Result<Vec<TrendingProduct>> {
        let mut conn = self.pool.acquire().await?;
        Ok(analytics::trending_products(&mut conn, TRENDING_LIMIT).await?)
    }

    async fn revenue_analytics(&self) -> Result<RevenueAnalytics> {
        let now = Utc::now();
        let mut conn = self.pool.acquire().await?;
        Ok(RevenueAnalytics {
            daily_revenue: analytics::revenue_series(&mut conn, "day", now - Duration::days(30)).await?,
            weekly_trend: analytics::revenue_series(&mut conn, "week", now - Duration::weeks(12)).await?,
            monthly_summary: analytics::revenue_series(&mut conn, "month", now - Duration::days(365)).await?,
        })
    }

    async fn user_behavior(&self) -> Result<UserBehavior> {
        let mut conn = self.pool.acquire().await?;
        Ok(analytics::session_totals(&mut conn).await?.into())
    }
}
