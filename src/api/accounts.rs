//! Users and addresses

use axum::{extract::{Path, Query, State}, http::StatusCode, routing::{get, post}, Json, Router};
use uuid::Uuid;

use super::{extract::ValidatedJson, AppState};
use crate::auth::Caller;
use crate::domain::aggregates::{Address, AddressDefault, NewAddress, NewUser, User, UserDetail, UserUpdate};
use crate::error::Result;
use crate::pagination::{ListParams, PaginatedResponse};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/register", post(register))
        .route("/users/me", get(me).patch(update_me))
        .route("/users/:username", get(get_user))
        .route("/addresses", get(list_addresses).post(create_address))
        .route("/addresses/:id", get(get_address).put(update_address).delete(delete_address))
        .route("/addresses/:id/set_default_shipping", post(set_default_shipping))
        .route("/addresses/:id/set_default_billing", post(set_default_billing))
}

async fn register(State(s): State<AppState>, ValidatedJson(body): ValidatedJson<NewUser>) -> Result<(StatusCode, Json<User>)> {
    Ok((StatusCode::CREATED, Json(s.accounts.register(body).await?)))
}

async fn list_users(State(s): State<AppState>, caller: Caller, Query(p): Query<ListParams>) -> Result<Json<PaginatedResponse<User>>> {
    Ok(Json(s.accounts.list_users(caller, p.into()).await?))
}

async fn me(State(s): State<AppState>, caller: Caller) -> Result<Json<UserDetail>> {
    Ok(Json(s.accounts.me(caller.user_id).await?))
}

async fn update_me(State(s): State<AppState>, caller: Caller, ValidatedJson(body): ValidatedJson<UserUpdate>) -> Result<Json<User>> {
    Ok(Json(s.accounts.update_me(caller.user_id, body).await?))
}

async fn get_user(State(s): State<AppState>, caller: Caller, Path(username): Path<String>) -> Result<Json<UserDetail>> {
    Ok(Json(s.accounts.get_user(caller, username).await?))
}

async fn list_addresses(State(s): State<AppState>, caller: Caller) -> Result<Json<Vec<Address>>> {
    Ok(Json(s.accounts.list_addresses(caller.user_id).await?))
}

async fn create_address(State(s): State<AppState>, caller: Caller, ValidatedJson(body): ValidatedJson<NewAddress>) -> Result<(StatusCode, Json<Address>)> {
    Ok((StatusCode::CREATED, Json(s.accounts.create_address(caller.user_id, body).await?)))
}

async fn get_address(State(s): State<AppState>, caller: Caller, Path(id): Path<Uuid>) -> Result<Json<Address>> {
    Ok(Json(s.accounts.get_address(caller.user_id, id).await?))
}

async fn update_address(State(s): State<AppState>, caller: Caller, Path(id): Path<Uuid>, ValidatedJson(body): ValidatedJson<NewAddress>) -> Result<Json<Address>> {
    Ok(Json(s.accounts.update_address(caller.user_id, id, body).await?))
}

async fn delete_address(State(s): State<AppState>, caller: Caller, Path(id): Path<Uuid>) -> Result<StatusCode> {
    s.accounts.delete_address(caller.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_default_shipping(State(s): State<AppState>, caller: Caller, Path(id): Path<Uuid>) -> Result<Json<Address>> {
    Ok(Json(s.accounts.set_default_address(caller.user_id, id, AddressDefault::Shipping).await?))
}

async fn set_default_billing(State(s): State<AppState>, caller: Caller, Path(id): Path<Uuid>) -> Result<Json<Address>> {
    Ok(Json(s.accounts.set_default_address(caller.user_id, id, AddressDefault::Billing).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{json_body, request, send, As, Mocks};
    use chrono::Utc;
    use mockall::predicate::eq;

    #[tokio::test]
    async fn test_register_validates_email() {
        let app = Mocks::default().app();
        let response = send(app, request("POST", "/api/v1/users/register", As::Anonymous, Some(serde_json::json!({"username": "ada", "email": "nope"})))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "INVALID_INPUT");
    }

    #[tokio::test]
    async fn test_me_requires_identity() {
        let response = send(Mocks::default().app(), request("GET", "/api/v1/users/me", As::Anonymous, None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_set_default_shipping_uses_caller() {
        let user = Uuid::new_v4();
        let address_id = Uuid::new_v4();
        let mut mocks = Mocks::default();
        mocks.accounts.expect_set_default_address()
            .with(eq(user), eq(address_id), eq(AddressDefault::Shipping))
            .times(1)
            .returning(move |user_id, id, _| Ok(Address {
                id, user_id, label: "home".into(), street_address: "1 Main St".into(), city: "Lagos".into(),
                state_province: String::new(), zip_code: "100001".into(), country: "NG".into(), is_shipping: true,
                is_billing: false, is_default_shipping: true, is_default_billing: false, created_at: Utc::now(),
            }));
        let uri = format!("/api/v1/addresses/{address_id}/set_default_shipping");
        let response = send(mocks.app(), request("POST", &uri, As::Customer(user), None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["is_default_shipping"], true);
    }
}
