//! Accounts and addresses

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::auth::Caller;
use crate::domain::aggregates::{Address, AddressDefault, NewAddress, NewUser, User, UserDetail, UserUpdate};
use crate::error::{EcommerceError, Result};
use crate::pagination::{Page, PaginatedResponse};
use crate::repository::account;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountService: Send + Sync {
    async fn register(&self, user: NewUser) -> Result<User>;
    async fn me(&self, user_id: Uuid) -> Result<UserDetail>;
    /// Staff see everyone, others only themselves.
    async fn list_users(&self, caller: Caller, page: Page) -> Result<PaginatedResponse<User>>;
    async fn get_user(&self, caller: Caller, username: String) -> Result<UserDetail>;
    async fn update_me(&self, user_id: Uuid, update: UserUpdate) -> Result<User>;

    async fn list_addresses(&self, user_id: Uuid) -> Result<Vec<Address>>;
    async fn get_address(&self, user_id: Uuid, id: Uuid) -> Result<Address>;
    async fn create_address(&self, user_id: Uuid, address: NewAddress) -> Result<Address>;
    async fn update_address(&self, user_id: Uuid, id: Uuid, address: NewAddress) -> Result<Address>;
    async fn delete_address(&self, user_id: Uuid, id: Uuid) -> Result<()>;
    async fn set_default_address(&self, user_id: Uuid, id: Uuid, kind: AddressDefault) -> Result<Address>;
}

#[derive(Clone, Debug)]
pub struct PgAccountService {
    pool: PgPool,
}

impl PgAccountService {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl AccountService for PgAccountService {
    async fn register(&self, new: NewUser) -> Result<User> {
        let mut conn = self.pool.acquire().await?;
        let user = account::insert_user(&mut conn, &new).await.map_err(|e| match EcommerceError::from(e) {
            EcommerceError::Conflict(_) => EcommerceError::Conflict("username or email already registered".into()),
            other => other,
        })?;
        info!(user_id = %user.id, username = %user.username, "user registered");
        Ok(user)
    }

    async fn me(&self, user_id: Uuid) -> Result<UserDetail> {
        let mut conn = self.pool.acquire().await?;
        let user = account::find_user(&mut conn, user_id).await?.ok_or_else(|| EcommerceError::not_found("user"))?;
        let addresses = account::list_addresses(&mut conn, user.id).await?;
        Ok(UserDetail::new(user, addresses))
    }

    async fn list_users(&self, caller: Caller, page: Page) -> Result<PaginatedResponse<User>> {
        let mut conn = self.pool.acquire().await?;
        if caller.is_staff {
            let (users, total) = account::list_users(&mut conn, page).await?;
            return Ok(PaginatedResponse::new(users, total, page));
        }
        let own: Vec<User> = account::find_user(&mut conn, caller.user_id).await?.into_iter().collect();
        let total = own.len() as i64;
        Ok(PaginatedResponse::new(own, total, page))
    }

    async fn get_user(&self, caller: Caller, username: String) -> Result<UserDetail> {
        let mut conn = self.pool.acquire().await?;
        let user = account::find_user_by_username(&mut conn, &username).await?
            .filter(|u| caller.can_access(u.id))
            .ok_or_else(|| EcommerceError::not_found("user"))?;
        let addresses = account::list_addresses(&mut conn, user.id).await?;
        Ok(UserDetail::new(user, addresses))
    }

    async fn update_me(&self, user_id: Uuid, update: UserUpdate) -> Result<User> {
        let mut conn = self.pool.acquire().await?;
        account::update_user(&mut conn, user_id, &update).await?.ok_or_else(|| EcommerceError::not_found("user"))
    }

    async fn list_addresses(&self, user_id: Uuid) -> Result<Vec<Address>> {
        let mut conn = self.pool.acquire().await?;
        Ok(account::list_addresses(&mut conn, user_id).await?)
    }

    async fn get_address(&self, user_id: Uuid, id: Uuid) -> Result<Address> {
        let mut conn = self.pool.acquire().await?;
        account::find_address(&mut conn, user_id, id).await?.ok_or_else(|| EcommerceError::not_found("address"))
    }

    async fn create_address(&self, user_id: Uuid, address: NewAddress) -> Result<Address> {
        let mut conn = self.pool.acquire().await?;
        Ok(account::insert_address(&mut conn, user_id, &address).await?)
    }

    async fn update_address(&self, user_id: Uuid, id: Uuid, address: NewAddress) -> Result<Address> {
        let mut conn = self.pool.acquire().await?;
        account::update_address(&mut conn, user_id, id, &address).await?.ok_or_else(|| EcommerceError::not_found("address"))
    }

    async fn delete_address(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        if account::delete_address(&mut conn, user_id, id).await? == 0 {
            return Err(EcommerceError::not_found("address"));
        }
        Ok(())
    }

    async fn set_default_address(&self, user_id: Uuid, id: Uuid, kind: AddressDefault) -> Result<Address> {
        let mut tx = self.pool.begin().await?;
        let address = account::set_default_address(&mut tx, user_id, id, kind).await?
            .ok_or_else(|| EcommerceError::not_found("address"))?;
        tx.commit().await?;
        Ok(address)
    }
}
