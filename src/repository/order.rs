//! Orders, order items and shipping methods

use sqlx::PgConnection;
use uuid::Uuid;

use crate::domain::aggregates::{CheckoutPlan, Order, OrderItem, OrderStatus, OrderUpdate, OrderWithCount, ShippingMethod};
use crate::pagination::Page;

const ORDER_COLUMNS: &str = "id, user_id, status, shipping_method_id, total_amount, tracking_number, created_at, updated_at";

/// Writes the order with the default status, then one item per planned line.
pub async fn insert_order(conn: &mut PgConnection, user_id: Uuid, shipping_method_id: Option<Uuid>, plan: &CheckoutPlan) -> sqlx::Result<(Order, Vec<OrderItem>)> {
    let order = sqlx::query_as::<_, Order>(&format!("INSERT INTO orders (id, user_id, shipping_method_id, total_amount) VALUES ($1, $2, $3, $4) RETURNING {ORDER_COLUMNS}"))
        .bind(Uuid::now_v7()).bind(user_id).bind(shipping_method_id).bind(plan.total_amount)
        .fetch_one(&mut *conn).await?;

    let mut items = Vec::with_capacity(plan.items.len());
    for item in &plan.items {
        let row = sqlx::query_as::<_, OrderItem>("INSERT INTO order_items (id, order_id, product_id, quantity, price_at_purchase) VALUES ($1, $2, $3, $4, $5) RETURNING id, order_id, product_id, quantity, price_at_purchase")
            .bind(Uuid::now_v7()).bind(order.id).bind(item.product_id).bind(item.quantity).bind(item.price_at_purchase)
            .fetch_one(&mut *conn).await?;
        items.push(row);
    }
    Ok((order, items))
}

/// `owner = None` lists every order.
pub async fn list_orders(conn: &mut PgConnection, owner: Option<Uuid>, page: Page) -> sqlx::Result<(Vec<OrderWithCount>, i64)> {
    let orders = sqlx::query_as::<_, OrderWithCount>("SELECT o.id, o.user_id, o.status, o.shipping_method_id, o.total_amount, o.tracking_number, o.created_at, o.updated_at, (SELECT COUNT(*) FROM order_items oi WHERE oi.order_id = o.id) AS item_count FROM orders o WHERE ($1::uuid IS NULL OR o.user_id = $1) ORDER BY o.created_at DESC, o.id LIMIT $2 OFFSET $3")
        .bind(owner).bind(page.limit()).bind(page.offset()).fetch_all(&mut *conn).await?;
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE ($1::uuid IS NULL OR user_id = $1)")
        .bind(owner).fetch_one(&mut *conn).await?;
    Ok((orders, total))
}

pub async fn find_order(conn: &mut PgConnection, id: Uuid) -> sqlx::Result<Option<Order>> {
    sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1")).bind(id).fetch_optional(conn).await
}

pub async fn lock_order(conn: &mut PgConnection, id: Uuid) -> sqlx::Result<Option<Order>> {
    sqlx::query_as::<_, Order>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE")).bind(id).fetch_optional(conn).await
}

pub async fn order_items(conn: &mut PgConnection, order_id: Uuid) -> sqlx::Result<Vec<OrderItem>> {
    sqlx::query_as::<_, OrderItem>("SELECT id, order_id, product_id, quantity, price_at_purchase FROM order_items WHERE order_id = $1 ORDER BY id")
        .bind(order_id).fetch_all(conn).await
}

pub async fn set_status(conn: &mut PgConnection, id: Uuid, status: OrderStatus) -> sqlx::Result<Order> {
    sqlx::query_as::<_, Order>(&format!("UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {ORDER_COLUMNS}"))
        .bind(id).bind(status).fetch_one(conn).await
}

/// Only status and tracking number change after checkout.
pub async fn update_order(conn: &mut PgConnection, id: Uuid, update: &OrderUpdate) -> sqlx::Result<Option<Order>> {
    sqlx::query_as::<_, Order>(&format!("UPDATE orders SET status = COALESCE($2, status), tracking_number = COALESCE($3, tracking_number), updated_at = NOW() WHERE id = $1 RETURNING {ORDER_COLUMNS}"))
        .bind(id).bind(update.status).bind(&update.tracking_number).fetch_optional(conn).await
}

/// Payment completion advances a pending order; other states are left alone.
pub async fn mark_processing_if_pending(conn: &mut PgConnection, id: Uuid) -> sqlx::Result<u64> {
    let result = sqlx::query("UPDATE orders SET status = 'processing', updated_at = NOW() WHERE id = $1 AND status = 'pending'")
        .bind(id).execute(conn).await?;
    Ok(result.rows_affected())
}

pub async fn active_shipping_methods(conn: &mut PgConnection) -> sqlx::Result<Vec<ShippingMethod>> {
    sqlx::query_as::<_, ShippingMethod>("SELECT id, name, description, cost, is_active FROM shipping_methods WHERE is_active ORDER BY cost, name")
        .fetch_all(conn).await
}

pub async fn find_active_shipping_method(conn: &mut PgConnection, id: Uuid) -> sqlx::Result<Option<ShippingMethod>> {
    sqlx::query_as::<_, ShippingMethod>("SELECT id, name, description, cost, is_active FROM shipping_methods WHERE id = $1 AND is_active")
        .bind(id).fetch_optional(conn).await
}
