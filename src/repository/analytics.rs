//! View tracking and report aggregation

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::domain::aggregates::{
    DailyTotals, DashboardStats, NewPageView, NewProductView, PageView, ProductView, RevenuePoint, SalesReport,
    SessionTotals, TrendingProduct,
};
use crate::pagination::Page;

const REPORT_COLUMNS: &str = "id, report_date, total_revenue, total_orders, total_customers, average_order_value, products_sold, new_customers";

pub async fn insert_page_view(conn: &mut PgConnection, user_id: Option<Uuid>, session_id: Option<&str>, v: &NewPageView) -> sqlx::Result<PageView> {
    sqlx::query_as::<_, PageView>("INSERT INTO page_views (id, user_id, page_url, page_title, session_id, ip_address, user_agent) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id, user_id, page_url, page_title, session_id, ip_address, user_agent, created_at")
        .bind(Uuid::now_v7()).bind(user_id).bind(&v.page_url).bind(&v.page_title).bind(session_id).bind(&v.ip_address).bind(&v.user_agent)
        .fetch_one(conn).await
}

pub async fn insert_product_view(conn: &mut PgConnection, user_id: Option<Uuid>, session_id: Option<&str>, v: &NewProductView) -> sqlx::Result<ProductView> {
    sqlx::query_as::<_, ProductView>("INSERT INTO product_views (id, product_id, user_id, session_id, view_duration) VALUES ($1, $2, $3, $4, $5) RETURNING id, product_id, user_id, session_id, view_duration, created_at")
        .bind(Uuid::now_v7()).bind(v.product_id).bind(user_id).bind(session_id).bind(v.view_duration)
        .fetch_one(conn).await
}

pub async fn list_page_views(conn: &mut PgConnection, page: Page) -> sqlx::Result<(Vec<PageView>, i64)> {
    let views = sqlx::query_as::<_, PageView>("SELECT id, user_id, page_url, page_title, session_id, ip_address, user_agent, created_at FROM page_views ORDER BY created_at DESC, id LIMIT $1 OFFSET $2")
        .bind(page.limit()).bind(page.offset()).fetch_all(&mut *conn).await?;
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM page_views").fetch_one(&mut *conn).await?;
    Ok((views, total))
}

pub async fn list_product_views(conn: &mut PgConnection, page: Page) -> sqlx::Result<(Vec<ProductView>, i64)> {
    let views = sqlx::query_as::<_, ProductView>("SELECT id, product_id, user_id, session_id, view_duration, created_at FROM product_views ORDER BY created_at DESC, id LIMIT $1 OFFSET $2")
        .bind(page.limit()).bind(page.offset()).fetch_all(&mut *conn).await?;
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM product_views").fetch_one(&mut *conn).await?;
    Ok((views, total))
}

/// Totals for orders placed on `date` (UTC). Empty days aggregate to zero.
pub async fn daily_totals(conn: &mut PgConnection, date: NaiveDate) -> sqlx::Result<DailyTotals> {
    sqlx::query_as::<_, DailyTotals>(
        "SELECT COALESCE(SUM(o.total_amount), 0) AS total_revenue, \
                COUNT(*) AS total_orders, \
                COUNT(DISTINCT o.user_id) AS total_customers, \
                COALESCE((SELECT SUM(oi.quantity) FROM order_items oi JOIN orders o2 ON o2.id = oi.order_id WHERE (o2.created_at AT TIME ZONE 'UTC')::date = $1), 0)::BIGINT AS products_sold, \
                (SELECT COUNT(*) FROM users u WHERE (u.date_joined AT TIME ZONE 'UTC')::date = $1) AS new_customers \
         FROM orders o WHERE (o.created_at AT TIME ZONE 'UTC')::date = $1")
        .bind(date).fetch_one(conn).await
}

/// One row per date: a rerun overwrites the figures instead of adding a row.
pub async fn upsert_report(conn: &mut PgConnection, report: &SalesReport) -> sqlx::Result<SalesReport> {
    sqlx::query_as::<_, SalesReport>(&format!(
        "INSERT INTO sales_reports ({REPORT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         ON CONFLICT (report_date) DO UPDATE SET total_revenue = EXCLUDED.total_revenue, total_orders = EXCLUDED.total_orders, \
         total_customers = EXCLUDED.total_customers, average_order_value = EXCLUDED.average_order_value, \
         products_sold = EXCLUDED.products_sold, new_customers = EXCLUDED.new_customers \
         RETURNING {REPORT_COLUMNS}"))
        .bind(report.id).bind(report.report_date).bind(report.total_revenue).bind(report.total_orders).bind(report.total_customers)
        .bind(report.average_order_value).bind(report.products_sold).bind(report.new_customers)
        .fetch_one(conn).await
}

pub async fn list_reports(conn: &mut PgConnection, page: Page) -> sqlx::Result<(Vec<SalesReport>, i64)> {
    let reports = sqlx::query_as::<_, SalesReport>(&format!("SELECT {REPORT_COLUMNS} FROM sales_reports ORDER BY report_date DESC LIMIT $1 OFFSET $2"))
        .bind(page.limit()).bind(page.offset()).fetch_all(&mut *conn).await?;
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales_reports").fetch_one(&mut *conn).await?;
    Ok((reports, total))
}

pub async fn find_report(conn: &mut PgConnection, date: NaiveDate) -> sqlx::Result<Option<SalesReport>> {
    sqlx::query_as::<_, SalesReport>(&format!("SELECT {REPORT_COLUMNS} FROM sales_reports WHERE report_date = $1"))
        .bind(date).fetch_optional(conn).await
}

/// Lifetime totals over live `orders`, not over stored sales reports.
pub async fn dashboard_stats(conn: &mut PgConnection) -> sqlx::Result<DashboardStats> {
    sqlx::query_as::<_, DashboardStats>(
        "SELECT (SELECT COUNT(*) FROM page_views) AS total_page_views, \
                (SELECT COUNT(*) FROM product_views) AS total_product_views, \
                (SELECT COALESCE(SUM(total_amount), 0) FROM orders) AS total_revenue, \
                (SELECT COUNT(*) FROM orders) AS total_orders")
        .fetch_one(conn).await
}

pub async fn trending_products(conn: &mut PgConnection, limit: i64) -> sqlx::Result<Vec<TrendingProduct>> {
    sqlx::query_as::<_, TrendingProduct>("SELECT p.id AS product_id, p.name, p.slug, COUNT(pv.id) AS view_count FROM product_views pv JOIN products p ON p.id = pv.product_id GROUP BY p.id, p.name, p.slug ORDER BY view_count DESC, p.name LIMIT $1")
        .bind(limit).fetch_all(conn).await
}

/// Revenue bucketed by `unit` (`day`, `week` or `month`) for orders since `since`.
pub async fn revenue_series(conn: &mut PgConnection, unit: &str, since: DateTime<Utc>) -> sqlx::Result<Vec<RevenuePoint>> {
    sqlx::query_as::<_, RevenuePoint>("SELECT DATE_TRUNC($1, o.created_at AT TIME ZONE 'UTC')::date AS period_start, SUM(o.total_amount) AS revenue, COUNT(*) AS orders FROM orders o WHERE o.created_at >= $2 GROUP BY 1 ORDER BY 1")
        .bind(unit).bind(since).fetch_all(conn).await
}

pub async fn session_totals(conn: &mut PgConnection) -> sqlx::Result<SessionTotals> {
    sqlx::query_as::<_, SessionTotals>(
        "SELECT (SELECT COUNT(DISTINCT s.session_id) FROM (SELECT session_id FROM page_views UNION SELECT session_id FROM product_views) s WHERE s.session_id IS NOT NULL) AS sessions, \
                (SELECT COUNT(*) FROM page_views WHERE session_id IS NOT NULL) AS page_views, \
                (SELECT COALESCE(SUM(view_duration), 0) FROM product_views WHERE session_id IS NOT NULL)::BIGINT AS total_view_seconds, \
                (SELECT COALESCE(SUM(total_orders), 0) FROM sales_reports)::BIGINT AS report_orders, \
                (SELECT COALESCE(SUM(total_customers), 0) FROM sales_reports)::BIGINT AS report_customers")
        .fetch_one(conn).await
}
