//! Users and addresses

use sqlx::PgConnection;
use uuid::Uuid;

use crate::domain::aggregates::{Address, AddressDefault, NewAddress, NewUser, User, UserUpdate};
use crate::pagination::Page;

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, phone_number, is_staff, is_active, date_joined";
const ADDRESS_COLUMNS: &str = "id, user_id, label, street_address, city, state_province, zip_code, country, is_shipping, is_billing, is_default_shipping, is_default_billing, created_at";

pub async fn insert_user(conn: &mut PgConnection, u: &NewUser) -> sqlx::Result<User> {
    sqlx::query_as::<_, User>(&format!("INSERT INTO users (id, username, email, first_name, last_name, phone_number) VALUES ($1, $2, LOWER($3), $4, $5, $6) RETURNING {USER_COLUMNS}"))
        .bind(Uuid::now_v7()).bind(&u.username).bind(&u.email).bind(&u.first_name).bind(&u.last_name).bind(&u.phone_number)
        .fetch_one(conn).await
}

pub async fn find_user(conn: &mut PgConnection, id: Uuid) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1")).bind(id).fetch_optional(conn).await
}

pub async fn find_user_by_username(conn: &mut PgConnection, username: &str) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1")).bind(username).fetch_optional(conn).await
}

pub async fn list_users(conn: &mut PgConnection, page: Page) -> sqlx::Result<(Vec<User>, i64)> {
    let users = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY date_joined DESC, id LIMIT $1 OFFSET $2"))
        .bind(page.limit()).bind(page.offset()).fetch_all(&mut *conn).await?;
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users").fetch_one(&mut *conn).await?;
    Ok((users, total))
}

/// Absent fields keep their current value.
pub async fn update_user(conn: &mut PgConnection, id: Uuid, u: &UserUpdate) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>(&format!("UPDATE users SET email = COALESCE(LOWER($2), email), first_name = COALESCE($3, first_name), last_name = COALESCE($4, last_name), phone_number = COALESCE($5, phone_number) WHERE id = $1 RETURNING {USER_COLUMNS}"))
        .bind(id).bind(&u.email).bind(&u.first_name).bind(&u.last_name).bind(&u.phone_number)
        .fetch_optional(conn).await
}

pub async fn list_addresses(conn: &mut PgConnection, user_id: Uuid) -> sqlx::Result<Vec<Address>> {
    sqlx::query_as::<_, Address>(&format!("SELECT {ADDRESS_COLUMNS} FROM addresses WHERE user_id = $1 ORDER BY created_at, id"))
        .bind(user_id).fetch_all(conn).await
}

pub async fn find_address(conn: &mut PgConnection, user_id: Uuid, id: Uuid) -> sqlx::Result<Option<Address>> {
    sqlx::query_as::<_, Address>(&format!("SELECT {ADDRESS_COLUMNS} FROM addresses WHERE id = $1 AND user_id = $2"))
        .bind(id).bind(user_id).fetch_optional(conn).await
}

pub async fn insert_address(conn: &mut PgConnection, user_id: Uuid, a: &NewAddress) -> sqlx::Result<Address> {
    sqlx::query_as::<_, Address>(&format!("INSERT INTO addresses (id, user_id, label, street_address, city, state_province, zip_code, country, is_shipping, is_billing) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {ADDRESS_COLUMNS}"))
        .bind(Uuid::now_v7()).bind(user_id).bind(&a.label).bind(&a.street_address).bind(&a.city).bind(&a.state_province)
        .bind(&a.zip_code).bind(&a.country).bind(a.is_shipping).bind(a.is_billing)
        .fetch_one(conn).await
}

pub async fn update_address(conn: &mut PgConnection, user_id: Uuid, id: Uuid, a: &NewAddress) -> sqlx::Result<Option<Address>> {
    sqlx::query_as::<_, Address>(&format!("UPDATE addresses SET label = $3, street_address = $4, city = $5, state_province = $6, zip_code = $7, country = $8, is_shipping = $9, is_billing = $10 WHERE id = $1 AND user_id = $2 RETURNING {ADDRESS_COLUMNS}"))
        .bind(id).bind(user_id).bind(&a.label).bind(&a.street_address).bind(&a.city).bind(&a.state_province)
        .bind(&a.zip_code).bind(&a.country).bind(a.is_shipping).bind(a.is_billing)
        .fetch_optional(conn).await
}

pub async fn delete_address(conn: &mut PgConnection, user_id: Uuid, id: Uuid) -> sqlx::Result<u64> {
    let result = sqlx::query("DELETE FROM addresses WHERE id = $1 AND user_id = $2").bind(id).bind(user_id).execute(conn).await?;
    Ok(result.rows_affected())
}

/// Move the default flag to `id`, clearing it on the user's other addresses.
pub async fn set_default_address(conn: &mut PgConnection, user_id: Uuid, id: Uuid, kind: AddressDefault) -> sqlx::Result<Option<Address>> {
    let column = kind.column();
    sqlx::query(&format!("UPDATE addresses SET {column} = FALSE WHERE user_id = $1 AND id <> $2 AND {column}"))
        .bind(user_id).bind(id).execute(&mut *conn).await?;
    sqlx::query_as::<_, Address>(&format!("UPDATE addresses SET {column} = TRUE WHERE id = $1 AND user_id = $2 RETURNING {ADDRESS_COLUMNS}"))
        .bind(id).bind(user_id).fetch_optional(&mut *conn).await
}
