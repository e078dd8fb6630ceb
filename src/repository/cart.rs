//! Carts, cart items and coupons

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::domain::aggregates::{CartLine, CartRecord, Coupon, NewCoupon};

const CART_COLUMNS: &str = "id, user_id, session_id, coupon_id, created_at, updated_at";
const COUPON_COLUMNS: &str = "id, code, discount_percentage, max_discount_amount, is_active, valid_from, valid_to";

/// The user's cart, created on first access. Safe under concurrent first access.
pub async fn get_or_create_cart(conn: &mut PgConnection, user_id: Uuid) -> sqlx::Result<CartRecord> {
    sqlx::query_as::<_, CartRecord>(&format!("INSERT INTO carts (id, user_id) VALUES ($1, $2) ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id RETURNING {CART_COLUMNS}"))
        .bind(Uuid::now_v7()).bind(user_id).fetch_one(conn).await
}

/// Row-locks the user's cart for the rest of the transaction.
pub async fn lock_cart_for_user(conn: &mut PgConnection, user_id: Uuid) -> sqlx::Result<Option<CartRecord>> {
    sqlx::query_as::<_, CartRecord>(&format!("SELECT {CART_COLUMNS} FROM carts WHERE user_id = $1 FOR UPDATE"))
        .bind(user_id).fetch_optional(conn).await
}

/// Items joined with each product's current price.
pub async fn cart_lines(conn: &mut PgConnection, cart_id: Uuid) -> sqlx::Result<Vec<CartLine>> {
    sqlx::query_as::<_, CartLine>("SELECT ci.id, ci.product_id, p.name AS product_name, p.slug AS product_slug, p.base_price AS unit_price, ci.quantity FROM cart_items ci JOIN products p ON p.id = ci.product_id WHERE ci.cart_id = $1 ORDER BY ci.added_at, ci.id")
        .bind(cart_id).fetch_all(conn).await
}

pub async fn cart_line(conn: &mut PgConnection, cart_id: Uuid, item_id: Uuid) -> sqlx::Result<Option<CartLine>> {
    sqlx::query_as::<_, CartLine>("SELECT ci.id, ci.product_id, p.name AS product_name, p.slug AS product_slug, p.base_price AS unit_price, ci.quantity FROM cart_items ci JOIN products p ON p.id = ci.product_id WHERE ci.cart_id = $1 AND ci.id = $2")
        .bind(cart_id).bind(item_id).fetch_optional(conn).await
}

/// Adds to an existing line for the same product instead of duplicating it.
/// `None` when the merged quantity would pass `max_quantity`; the line is left as it was.
pub async fn upsert_item(conn: &mut PgConnection, cart_id: Uuid, product_id: Uuid, quantity: i32, max_quantity: i32) -> sqlx::Result<Option<Uuid>> {
    sqlx::query_scalar("INSERT INTO cart_items (id, cart_id, product_id, quantity) VALUES ($1, $2, $3, $4) ON CONFLICT (cart_id, product_id) DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity WHERE cart_items.quantity::BIGINT + EXCLUDED.quantity <= $5 RETURNING id")
        .bind(Uuid::now_v7()).bind(cart_id).bind(product_id).bind(quantity).bind(max_quantity).fetch_optional(conn).await
}

pub async fn set_item_quantity(conn: &mut PgConnection, cart_id: Uuid, item_id: Uuid, quantity: i32) -> sqlx::Result<u64> {
    let result = sqlx::query("UPDATE cart_items SET quantity = $3 WHERE id = $2 AND cart_id = $1")
        .bind(cart_id).bind(item_id).bind(quantity).execute(conn).await?;
    Ok(result.rows_affected())
}

pub async fn delete_item(conn: &mut PgConnection, cart_id: Uuid, item_id: Uuid) -> sqlx::Result<u64> {
    let result = sqlx::query("DELETE FROM cart_items WHERE id = $2 AND cart_id = $1").bind(cart_id).bind(item_id).execute(conn).await?;
    Ok(result.rows_affected())
}

pub async fn clear_items(conn: &mut PgConnection, cart_id: Uuid) -> sqlx::Result<u64> {
    let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1").bind(cart_id).execute(conn).await?;
    Ok(result.rows_affected())
}

pub async fn set_coupon(conn: &mut PgConnection, cart_id: Uuid, coupon_id: Option<Uuid>) -> sqlx::Result<CartRecord> {
    sqlx::query_as::<_, CartRecord>(&format!("UPDATE carts SET coupon_id = $2, updated_at = NOW() WHERE id = $1 RETURNING {CART_COLUMNS}"))
        .bind(cart_id).bind(coupon_id).fetch_one(conn).await
}

pub async fn touch_cart(conn: &mut PgConnection, cart_id: Uuid) -> sqlx::Result<()> {
    sqlx::query("UPDATE carts SET updated_at = NOW() WHERE id = $1").bind(cart_id).execute(conn).await?;
    Ok(())
}

pub async fn find_coupon(conn: &mut PgConnection, id: Uuid) -> sqlx::Result<Option<Coupon>> {
    sqlx::query_as::<_, Coupon>(&format!("SELECT {COUPON_COLUMNS} FROM coupons WHERE id = $1")).bind(id).fetch_optional(conn).await
}

pub async fn find_coupon_by_code(conn: &mut PgConnection, code: &str) -> sqlx::Result<Option<Coupon>> {
    sqlx::query_as::<_, Coupon>(&format!("SELECT {COUPON_COLUMNS} FROM coupons WHERE code = $1")).bind(code).fetch_optional(conn).await
}

/// Exact code match among active coupons; the date window is checked by the caller.
pub async fn find_active_coupon_by_code(conn: &mut PgConnection, code: &str) -> sqlx::Result<Option<Coupon>> {
    sqlx::query_as::<_, Coupon>(&format!("SELECT {COUPON_COLUMNS} FROM coupons WHERE code = $1 AND is_active")).bind(code).fetch_optional(conn).await
}

pub async fn list_active_coupons(conn: &mut PgConnection, now: DateTime<Utc>) -> sqlx::Result<Vec<Coupon>> {
    sqlx::query_as::<_, Coupon>(&format!("SELECT {COUPON_COLUMNS} FROM coupons WHERE is_active AND valid_from <= $1 AND valid_to >= $1 ORDER BY valid_to, code"))
        .bind(now).fetch_all(conn).await
}

pub async fn insert_coupon(conn: &mut PgConnection, c: &NewCoupon) -> sqlx::Result<Coupon> {
    sqlx::query_as::<_, Coupon>(&format!("INSERT INTO coupons (id, code, discount_percentage, max_discount_amount, is_active, valid_from, valid_to) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {COUPON_COLUMNS}"))
        .bind(Uuid::now_v7()).bind(&c.code).bind(c.discount_percentage).bind(c.max_discount_amount).bind(c.is_active).bind(c.valid_from).bind(c.valid_to)
        .fetch_one(conn).await
}
