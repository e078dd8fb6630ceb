//! Payment records

use axum::{extract::{Path, State}, http::StatusCode, routing::{get, post}, Json, Router};
use uuid::Uuid;

use super::{extract::ValidatedJson, AppState};
use crate::auth::Caller;
use crate::domain::aggregates::{NewPayment, PaymentMethod, PaymentStatusUpdate, PaymentView};
use crate::error::Result;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/payments", get(list_payments).post(create_payment))
        .route("/payments/:id", get(get_payment))
        .route("/payments/:id/status", post(update_status))
        .route("/payment-methods", get(payment_methods))
}

async fn payment_methods(State(s): State<AppState>) -> Result<Json<Vec<PaymentMethod>>> {
    Ok(Json(s.payments.payment_methods().await?))
}

async fn list_payments(State(s): State<AppState>, caller: Caller) -> Result<Json<Vec<PaymentView>>> {
    Ok(Json(s.payments.list_payments(caller).await?))
}

async fn get_payment(State(s): State<AppState>, caller: Caller, Path(id): Path<Uuid>) -> Result<Json<PaymentView>> {
    Ok(Json(s.payments.get_payment(caller, id).await?))
}

async fn create_payment(State(s): State<AppState>, caller: Caller, ValidatedJson(body): ValidatedJson<NewPayment>) -> Result<(StatusCode, Json<PaymentView>)> {
    Ok((StatusCode::CREATED, Json(s.payments.create_payment(caller, body).await?)))
}

async fn update_status(State(s): State<AppState>, caller: Caller, Path(id): Path<Uuid>, ValidatedJson(body): ValidatedJson<PaymentStatusUpdate>) -> Result<Json<PaymentView>> {
    caller.require_staff()?;
    Ok(Json(s.payments.update_status(id, body.status).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{json_body, request, send, As, Mocks};
    use crate::domain::aggregates::{Payment, PaymentRow, PaymentStatus};
    use chrono::Utc;
    use mockall::predicate::eq;
    use rust_decimal::Decimal;

    fn view(id: Uuid, status: PaymentStatus) -> PaymentView {
        let now = Utc::now();
        let payment = Payment {
            id, order_id: Some(Uuid::new_v4()), payment_method_id: Some(Uuid::new_v4()), amount: Decimal::new(15000, 2),
            currency: "USD".into(), status, created_at: now, updated_at: now,
        };
        PaymentView::from(PaymentRow { payment, payment_method_name: Some("Card".into()) })
    }

    #[tokio::test]
    async fn test_staff_complete_payment() {
        let id = Uuid::new_v4();
        let mut mocks = Mocks::default();
        mocks.payments.expect_update_status()
            .with(eq(id), eq(PaymentStatus::Completed))
            .times(1)
            .returning(|id, status| Ok(view(id, status)));
        let uri = format!("/api/v1/payments/{id}/status");
        let response = send(mocks.app(), request("POST", &uri, As::Staff(Uuid::new_v4()), Some(serde_json::json!({"status": "COMPLETED"})))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "COMPLETED");
        assert_eq!(body["status_display"], "Completed");
        assert_eq!(body["payment_method_display"], "Card");
    }

    #[tokio::test]
    async fn test_unknown_status_is_rejected() {
        let uri = format!("/api/v1/payments/{}/status", Uuid::new_v4());
        let response = send(Mocks::default().app(), request("POST", &uri, As::Staff(Uuid::new_v4()), Some(serde_json::json!({"status": "completed"})))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_customer_cannot_change_status() {
        let uri = format!("/api/v1/payments/{}/status", Uuid::new_v4());
        let response = send(Mocks::default().app(), request("POST", &uri, As::Customer(Uuid::new_v4()), Some(serde_json::json!({"status": "REFUNDED"})))).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
