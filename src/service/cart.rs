//! Cart and coupon service

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::domain::aggregates::{Cart, CartLine, CartRecord, CartView, CouponError, CouponView, NewCoupon, MAX_LINE_QUANTITY};
use crate::domain::events::DomainEvent;
use crate::error::{EcommerceError, Result};
use crate::messaging::EventPublisher;
use crate::repository::{cart, catalog};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CartService: Send + Sync {
    /// The caller's cart, created on first access.
    async fn my_cart(&self, user_id: Uuid) -> Result<CartView>;
    async fn apply_coupon(&self, user_id: Uuid, code: String) -> Result<CartView>;
    async fn remove_coupon(&self, user_id: Uuid) -> Result<CartView>;
    async fn clear(&self, user_id: Uuid) -> Result<CartView>;

    async fn list_items(&self, user_id: Uuid) -> Result<Vec<CartLine>>;
    async fn add_item(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> Result<CartLine>;
    async fn update_item(&self, user_id: Uuid, item_id: Uuid, quantity: i32) -> Result<CartLine>;
    async fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> Result<()>;

    async fn list_coupons(&self) -> Result<Vec<CouponView>>;
    async fn get_coupon(&self, code: String) -> Result<CouponView>;
    async fn create_coupon(&self, coupon: NewCoupon) -> Result<CouponView>;
}

#[derive(Clone, Debug)]
pub struct PgCartService {
    pool: PgPool,
    events: EventPublisher,
}

impl PgCartService {
    pub fn new(pool: PgPool, events: EventPublisher) -> Self { Self { pool, events } }
}

fn ensure_line_quantity(quantity: i32) -> Result<()> {
    if !(1..=MAX_LINE_QUANTITY).contains(&quantity) {
        return Err(EcommerceError::InvalidInput(format!("quantity must be between 1 and {MAX_LINE_QUANTITY}")));
    }
    Ok(())
}

/// Loads lines and coupon for a cart row.
pub(crate) async fn load_cart(conn: &mut PgConnection, record: CartRecord) -> Result<Cart> {
    let lines = cart::cart_lines(&mut *conn, record.id).await?;
    let coupon = match record.coupon_id {
        Some(id) => cart::find_coupon(&mut *conn, id).await?,
        None => None,
    };
    Ok(Cart::new(record, coupon, lines))
}

#[async_trait]
impl CartService for PgCartService {
    async fn my_cart(&self, user_id: Uuid) -> Result<CartView> {
        let mut conn = self.pool.acquire().await?;
        let record = cart::get_or_create_cart(&mut conn, user_id).await?;
        Ok(load_cart(&mut conn, record).await?.into_view(Utc::now()))
    }

    async fn apply_coupon(&self, user_id: Uuid, code: String) -> Result<CartView> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let record = cart::get_or_create_cart(&mut tx, user_id).await?;
        let coupon = cart::find_active_coupon_by_code(&mut tx, &code).await?.ok_or(CouponError::UnknownCode)?;
        coupon.ensure_applicable(now)?;
        let record = cart::set_coupon(&mut tx, record.id, Some(coupon.id)).await?;
        let view = load_cart(&mut tx, record).await?.into_view(now);
        tx.commit().await?;

        info!(cart_id = %view.id, code = %coupon.code, discount = %view.discount_amount, "coupon applied");
        self.events.publish(DomainEvent::CouponApplied { cart_id: view.id, code: coupon.code }).await;
        Ok(view)
    }

    async fn remove_coupon(&self, user_id: Uuid) -> Result<CartView> {
        let mut tx = self.pool.begin().await?;
        let record = cart::get_or_create_cart(&mut tx, user_id).await?;
        let record = cart::set_coupon(&mut tx, record.id, None).await?;
        let view = load_cart(&mut tx, record).await?.into_view(Utc::now());
        tx.commit().await?;
        Ok(view)
    }

    async fn clear(&self, user_id: Uuid) -> Result<CartView> {
        let mut tx = self.pool.begin().await?;
        let record = cart::get_or_create_cart(&mut tx, user_id).await?;
        cart::clear_items(&mut tx, record.id).await?;
        let record = cart::set_coupon(&mut tx, record.id, None).await?;
        let view = load_cart(&mut tx, record).await?.into_view(Utc::now());
        tx.commit().await?;
        Ok(view)
    }

    async fn list_items(&self, user_id: Uuid) -> Result<Vec<CartLine>> {
        let mut conn = self.pool.acquire().await?;
        let record = cart::get_or_create_cart(&mut conn, user_id).await?;
        Ok(cart::cart_lines(&mut conn, record.id).await?)
    }

    async fn add_item(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> Result<CartLine> {
        ensure_line_quantity(quantity)?;
        let mut tx = self.pool.begin().await?;
        let product = catalog::find_product(&mut tx, product_id).await?.ok_or_else(|| EcommerceError::not_found("product"))?;
        if !product.is_active {
            return Err(EcommerceError::InvalidInput(format!("product {} is not available", product.slug)));
        }
        let record = cart::get_or_create_cart(&mut tx, user_id).await?;
        let item_id = cart::upsert_item(&mut tx, record.id, product.id, quantity, MAX_LINE_QUANTITY).await?
            .ok_or_else(|| EcommerceError::InvalidInput(format!("a cart line holds at most {MAX_LINE_QUANTITY} units")))?;
        cart::touch_cart(&mut tx, record.id).await?;
        let line = cart::cart_line(&mut tx, record.id, item_id).await?.ok_or_else(|| EcommerceError::not_found("cart item"))?;
        tx.commit().await?;
        Ok(line)
    }

    async fn update_item(&self, user_id: Uuid, item_id: Uuid, quantity: i32) -> Result<CartLine> {
        ensure_line_quantity(quantity)?;
        let mut tx = self.pool.begin().await?;
        let record = cart::get_or_create_cart(&mut tx, user_id).await?;
        if cart::set_item_quantity(&mut tx, record.id, item_id, quantity).await? == 0 {
            return Err(EcommerceError::not_found("cart item"));
        }
        cart::touch_cart(&mut tx, record.id).await?;
        let line = cart::cart_line(&mut tx, record.id, item_id).await?.ok_or_else(|| EcommerceError::not_found("cart item"))?;
        tx.commit().await?;
        Ok(line)
    }

    async fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let record = cart::get_or_create_cart(&mut tx, user_id).await?;
        if cart::delete_item(&mut tx, record.id, item_id).await? == 0 {
            return Err(EcommerceError::not_found("cart item"));
        }
        cart::touch_cart(&mut tx, record.id).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn list_coupons(&self) -> Result<Vec<CouponView>> {
        let now = Utc::now();
        let mut conn = self.pool.acquire().await?;
        let coupons = cart::list_active_coupons(&mut conn, now).await?;
        Ok(coupons.into_iter().map(|c| CouponView::at(c, now)).collect())
    }

    async fn get_coupon(&self, code: String) -> Result<CouponView> {
        let mut conn = self.pool.acquire().await?;
        let coupon = cart::find_coupon_by_code(&mut conn, &code).await?.ok_or_else(|| EcommerceError::not_found("coupon"))?;
        Ok(CouponView::at(coupon, Utc::now()))
    }

    async fn create_coupon(&self, coupon: NewCoupon) -> Result<CouponView> {
        let mut conn = self.pool.acquire().await?;
        let created = cart::insert_coupon(&mut conn, &coupon).await.map_err(|e| match EcommerceError::from(e) {
            EcommerceError::Conflict(_) => EcommerceError::Conflict(format!("coupon code {} already exists", coupon.code)),
            other => other,
        })?;
        info!(code = %created.code, "coupon created");
        Ok(CouponView::at(created, Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_quantity_bounds() {
        assert!(ensure_line_quantity(1).is_ok());
        assert!(ensure_line_quantity(MAX_LINE_QUANTITY).is_ok());
        for quantity in [0, -3, MAX_LINE_QUANTITY + 1, i32::MAX] {
            assert!(matches!(ensure_line_quantity(quantity), Err(EcommerceError::InvalidInput(_))), "{quantity}");
        }
    }
}
