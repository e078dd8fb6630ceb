//! Payments and payment methods

use sqlx::PgConnection;
use uuid::Uuid;

use crate::domain::aggregates::{NewPayment, PaymentMethod, PaymentRow, PaymentStatus};

const PAYMENT_SELECT: &str = "SELECT pay.id, pay.order_id, pay.payment_method_id, pay.amount, pay.currency, pay.status, pay.created_at, pay.updated_at, pm.name AS payment_method_name FROM payments pay LEFT JOIN payment_methods pm ON pm.id = pay.payment_method_id";

pub async fn active_payment_methods(conn: &mut PgConnection) -> sqlx::Result<Vec<PaymentMethod>> {
    sqlx::query_as::<_, PaymentMethod>("SELECT id, name, description, is_active FROM payment_methods WHERE is_active ORDER BY name")
        .fetch_all(conn).await
}

pub async fn insert_payment(conn: &mut PgConnection, p: &NewPayment) -> sqlx::Result<PaymentRow> {
    let id: Uuid = sqlx::query_scalar("INSERT INTO payments (id, order_id, payment_method_id, amount, currency) VALUES ($1, $2, $3, $4, UPPER($5)) RETURNING id")
        .bind(Uuid::now_v7()).bind(p.order_id).bind(p.payment_method_id).bind(p.amount).bind(&p.currency)
        .fetch_one(&mut *conn).await?;
    sqlx::query_as::<_, PaymentRow>(&format!("{PAYMENT_SELECT} WHERE pay.id = $1")).bind(id).fetch_one(&mut *conn).await
}

/// Payments reachable through the owner's orders; `owner = None` lists all.
pub async fn list_payments(conn: &mut PgConnection, owner: Option<Uuid>) -> sqlx::Result<Vec<PaymentRow>> {
    sqlx::query_as::<_, PaymentRow>(&format!("{PAYMENT_SELECT} LEFT JOIN orders o ON o.id = pay.order_id WHERE ($1::uuid IS NULL OR o.user_id = $1) ORDER BY pay.created_at DESC, pay.id"))
        .bind(owner).fetch_all(conn).await
}

/// The payment and the user owning its order, if any.
pub async fn find_payment(conn: &mut PgConnection, id: Uuid) -> sqlx::Result<Option<(PaymentRow, Option<Uuid>)>> {
    let Some(row) = sqlx::query_as::<_, PaymentRow>(&format!("{PAYMENT_SELECT} WHERE pay.id = $1")).bind(id).fetch_optional(&mut *conn).await? else {
        return Ok(None);
    };
    let owner: Option<Uuid> = match row.payment.order_id {
        Some(order_id) => sqlx::query_scalar("SELECT user_id FROM orders WHERE id = $1").bind(order_id).fetch_optional(&mut *conn).await?,
        None => None,
    };
    Ok(Some((row, owner)))
}

pub async fn set_payment_status(conn: &mut PgConnection, id: Uuid, status: PaymentStatus) -> sqlx::Result<Option<PaymentRow>> {
    let updated = sqlx::query("UPDATE payments SET status = $2, updated_at = NOW() WHERE id = $1").bind(id).bind(status).execute(&mut *conn).await?;
    if updated.rows_affected() == 0 {
        return Ok(None);
    }
    sqlx::query_as::<_, PaymentRow>(&format!("{PAYMENT_SELECT} WHERE pay.id = $1")).bind(id).fetch_optional(&mut *conn).await
}
