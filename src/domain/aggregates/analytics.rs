//! Analytics: tracked views and the daily sales report

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::value_objects::{percentage, round_currency};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PageView {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub page_url: String,
    pub page_title: String,
    pub session_id: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProductView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Option<Uuid>,
    pub session_id: Option<String>,
    pub view_duration: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct NewPageView {
    #[validate(length(min = 1, max = 255))]
    pub page_url: String,
    #[serde(default)]
    #[validate(length(max = 255))]
    pub page_title: String,
    #[validate(length(max = 40))]
    pub session_id: Option<String>,
    #[validate(length(max = 45))]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub user_agent: String,
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct NewProductView {
    pub product_id: Uuid,
    #[validate(length(max = 40))]
    pub session_id: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub view_duration: i32,
}

/// Figures for one calendar day, aggregated from that day's orders.
#[derive(Clone, Debug, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct DailyTotals {
    pub total_revenue: Decimal,
    pub total_orders: i64,
    pub total_customers: i64,
    pub products_sold: i64,
    pub new_customers: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SalesReport {
    pub id: Uuid,
    pub report_date: NaiveDate,
    pub total_revenue: Decimal,
    pub total_orders: i32,
    pub total_customers: i32,
    pub average_order_value: Decimal,
    pub products_sold: i32,
    pub new_customers: i32,
}

impl SalesReport {
    /// Build the row for `date`. The id is only used if no row exists for the date yet.
    pub fn from_totals(date: NaiveDate, totals: &DailyTotals) -> Self {
        let average_order_value = if totals.total_orders > 0 {
            round_currency(totals.total_revenue / Decimal::from(totals.total_orders))
        } else {
            Decimal::ZERO
        };
        Self {
            id: Uuid::now_v7(),
            report_date: date,
            total_revenue: round_currency(totals.total_revenue),
            total_orders: clamp_count(totals.total_orders),
            total_customers: clamp_count(totals.total_customers),
            average_order_value,
            products_sold: clamp_count(totals.products_sold),
            new_customers: clamp_count(totals.new_customers),
        }
    }

    /// Orders per distinct customer as a percentage; zero without customers.
    pub fn conversion_rate(&self) -> Decimal {
        percentage(i64::from(self.total_orders), i64::from(self.total_customers))
    }
}

fn clamp_count(value: i64) -> i32 { i32::try_from(value.max(0)).unwrap_or(i32::MAX) }

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SalesReportView {
    #[serde(flatten)]
    pub report: SalesReport,
    pub conversion_rate: Decimal,
}

impl From<SalesReport> for SalesReportView {
    fn from(report: SalesReport) -> Self {
        let conversion_rate = report.conversion_rate();
        Self { report, conversion_rate }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReportSummary {
    pub report_generated: bool,
    pub total_revenue: Decimal,
    pub date: NaiveDate,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, sqlx::FromRow)]
pub struct DashboardStats {
    pub total_page_views: i64,
    pub total_product_views: i64,
    pub total_revenue: Decimal,
    pub total_orders: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
pub struct TrendingProduct {
    pub product_id: Uuid,
    pub name: String,
    pub slug: String,
    pub view_count: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
pub struct RevenuePoint {
    pub period_start: NaiveDate,
    pub revenue: Decimal,
    pub orders: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RevenueAnalytics {
    pub daily_revenue: Vec<RevenuePoint>,
    pub weekly_trend: Vec<RevenuePoint>,
    pub monthly_summary: Vec<RevenuePoint>,
}

/// Raw session counters behind the user-behaviour view.
#[derive(Clone, Debug, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct SessionTotals {
    pub sessions: i64,
    pub page_views: i64,
    pub total_view_seconds: i64,
    pub report_orders: i64,
    pub report_customers: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct UserBehavior {
    pub average_session_duration: Decimal,
    pub page_views_per_session: Decimal,
    pub conversion_rate: Decimal,
}

impl From<SessionTotals> for UserBehavior {
    fn from(totals: SessionTotals) -> Self {
        let per_session = |value: i64| {
            if totals.sessions == 0 {
                Decimal::ZERO
            } else {
                round_currency(Decimal::from(value) / Decimal::from(totals.sessions))
            }
        };
        Self {
            average_session_duration: per_session(totals.total_view_seconds),
            page_views_per_session: per_session(totals.page_views),
            conversion_rate: percentage(totals.report_orders, totals.report_customers),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate { NaiveDate::from_ymd_opt(2024, 3, 14).unwrap() }

    #[test]
    fn test_conversion_rate_zero_customers() {
        let report = SalesReport::from_totals(date(), &DailyTotals::default());
        assert_eq!(report.conversion_rate(), Decimal::ZERO);
        assert_eq!(report.average_order_value, Decimal::ZERO);
    }

    #[test]
    fn test_conversion_rate_ratio() {
        let totals = DailyTotals { total_revenue: Decimal::new(400000, 2), total_orders: 40, total_customers: 35, products_sold: 90, new_customers: 3 };
        let report = SalesReport::from_totals(date(), &totals);
        assert_eq!(report.conversion_rate(), Decimal::new(11429, 2));
        assert_eq!(report.average_order_value, Decimal::new(10000, 2));
        assert_eq!(report.products_sold, 90);
        assert_eq!(SalesReportView::from(report).conversion_rate, Decimal::new(11429, 2));
    }

    #[test]
    fn test_average_order_value_rounds() {
        let totals = DailyTotals { total_revenue: Decimal::new(10000, 2), total_orders: 3, total_customers: 2, ..DailyTotals::default() };
        assert_eq!(SalesReport::from_totals(date(), &totals).average_order_value, Decimal::new(3333, 2));
    }

    #[test]
    fn test_user_behavior_without_sessions() {
        let behavior = UserBehavior::from(SessionTotals::default());
        assert_eq!(behavior, UserBehavior::default());
    }

    #[test]
    fn test_user_behavior_per_session() {
        let behavior = UserBehavior::from(SessionTotals { sessions: 4, page_views: 10, total_view_seconds: 90, report_orders: 5, report_customers: 4 });
        assert_eq!(behavior.page_views_per_session, Decimal::new(250, 2));
        assert_eq!(behavior.average_session_duration, Decimal::new(2250, 2));
        assert_eq!(behavior.conversion_rate, Decimal::new(12500, 2));
    }
}
