//! Payment records. The gateway itself is external; this only stores what it reports.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::auth::Caller;
use crate::domain::aggregates::{NewPayment, PaymentMethod, PaymentStatus, PaymentView};
use crate::domain::events::DomainEvent;
use crate::error::{EcommerceError, Result};
use crate::messaging::EventPublisher;
use crate::repository::{order, payment};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentService: Send + Sync {
    async fn payment_methods(&self) -> Result<Vec<PaymentMethod>>;
    async fn list_payments(&self, caller: Caller) -> Result<Vec<PaymentView>>;
    async fn get_payment(&self, caller: Caller, id: Uuid) -> Result<PaymentView>;
    async fn create_payment(&self, caller: Caller, payment: NewPayment) -> Result<PaymentView>;
    /// Any transition is accepted. COMPLETED moves a pending order to processing.
    async fn update_status(&self, id: Uuid, status: PaymentStatus) -> Result<PaymentView>;
}

#[derive(Clone, Debug)]
pub struct PgPaymentService {
    pool: PgPool,
    events: EventPublisher,
}

impl PgPaymentService {
    pub fn new(pool: PgPool, events: EventPublisher) -> Self { Self { pool, events } }
}

#[async_trait]
impl PaymentService for PgPaymentService {
    async fn payment_methods(&self) -> Result<Vec<PaymentMethod>> {
        let mut conn = self.pool.acquire().await?;
        Ok(payment::active_payment_methods(&mut conn).await?)
    }

    async fn list_payments(&self, caller: Caller) -> Result<Vec<PaymentView>> {
        let owner = (!caller.is_staff).then_some(caller.user_id);
        let mut conn = self.pool.acquire().await?;
        let rows = payment::list_payments(&mut conn, owner).await?;
        Ok(rows.into_iter().map(PaymentView::from).collect())
    }

    async fn get_payment(&self, caller: Caller, id: Uuid) -> Result<PaymentView> {
        let mut conn = self.pool.acquire().await?;
        match payment::find_payment(&mut conn, id).await? {
            Some((row, owner)) if caller.is_staff || owner == Some(caller.user_id) => Ok(row.into()),
            _ => Err(EcommerceError::not_found("payment")),
        }
    }

    async fn create_payment(&self, caller: Caller, new: NewPayment) -> Result<PaymentView> {
        let mut tx = self.pool.begin().await?;
        order::find_order(&mut tx, new.order_id).await?
            .filter(|o| caller.can_access(o.user_id))
            .ok_or_else(|| EcommerceError::not_found("order"))?;
        let row = payment::insert_payment(&mut tx, &new).await?;
        tx.commit().await?;

        info!(payment_id = %row.payment.id, order_id = %new.order_id, amount = %row.payment.amount, "payment recorded");
        self.events.publish(DomainEvent::PaymentRecorded {
            payment_id: row.payment.id,
            order_id: row.payment.order_id,
            amount: row.payment.amount,
        }).await;
        Ok(row.into())
    }

    async fn update_status(&self, id: Uuid, status: PaymentStatus) -> Result<PaymentView> {
        let mut tx = self.pool.begin().await?;
        let row = payment::set_payment_status(&mut tx, id, status).await?.ok_or_else(|| EcommerceError::not_found("payment"))?;
        if status == PaymentStatus::Completed {
            if let Some(order_id) = row.payment.order_id {
                if order::mark_processing_if_pending(&mut tx, order_id).await? > 0 {
                    info!(%order_id, "order moved to processing after payment");
                }
            }
        }
        tx.commit().await?;

        info!(payment_id = %id, status = status.display(), "payment status changed");
        self.events.publish(DomainEvent::PaymentStatusChanged { payment_id: id, status }).await;
        Ok(row.into())
    }
}
