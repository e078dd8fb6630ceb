//! Accounts and addresses

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub is_staff: bool,
    pub is_active: bool,
    pub date_joined: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Address {
    pub id: Uuid,
    pub user_id: Uuid,
    pub label: String,
    pub street_address: String,
    pub city: String,
    pub state_province: String,
    pub zip_code: String,
    pub country: String,
    pub is_shipping: bool,
    pub is_billing: bool,
    pub is_default_shipping: bool,
    pub is_default_billing: bool,
    pub created_at: DateTime<Utc>,
}

/// Which default flag an address action moves.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressDefault {
    Shipping,
    Billing,
}

impl AddressDefault {
    pub fn column(self) -> &'static str {
        match self {
            Self::Shipping => "is_default_shipping",
            Self::Billing => "is_default_billing",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: User,
    pub full_name: String,
    pub addresses: Vec<Address>,
}

impl UserDetail {
    pub fn new(user: User, addresses: Vec<Address>) -> Self {
        let full_name = user.full_name();
        Self { user, full_name, addresses }
    }
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct NewUser {
    #[validate(length(min = 3, max = 150))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub last_name: String,
    #[validate(length(max = 20))]
    pub phone_number: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Validate)]
pub struct UserUpdate {
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 150))]
    pub first_name: Option<String>,
    #[validate(length(max = 150))]
    pub last_name: Option<String>,
    #[validate(length(max = 20))]
    pub phone_number: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct NewAddress {
    #[serde(default)]
    #[validate(length(max = 50))]
    pub label: String,
    #[validate(length(min = 1, max = 255))]
    pub street_address: String,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub state_province: String,
    #[validate(length(min = 1, max = 20))]
    pub zip_code: String,
    #[validate(length(min = 1, max = 100))]
    pub country: String,
    #[serde(default = "default_true")]
    pub is_shipping: bool,
    #[serde(default)]
    pub is_billing: bool,
}

fn default_true() -> bool { true }

#[cfg(test)]
mod tests {
    use super::*;

    fn user(first: &str, last: &str) -> User {
        User { id: Uuid::new_v4(), username: "ada".into(), email: "ada@example.com".into(), first_name: first.into(), last_name: last.into(), phone_number: None, is_staff: false, is_active: true, date_joined: Utc::now() }
    }

    #[test]
    fn test_full_name() {
        assert_eq!(user("Ada", "Lovelace").full_name(), "Ada Lovelace");
        assert_eq!(user("", "Lovelace").full_name(), "Lovelace");
        assert_eq!(UserDetail::new(user("Ada", ""), vec![]).full_name, "Ada");
    }

    #[test]
    fn test_new_user_validation() {
        let ok: NewUser = serde_json::from_value(serde_json::json!({"username": "ada", "email": "ada@example.com"})).unwrap();
        assert!(ok.validate().is_ok());
        let bad = NewUser { email: "not-an-email".into(), ..ok.clone() };
        assert!(bad.validate().is_err());
        let short = NewUser { username: "al".into(), ..ok };
        assert!(short.validate().is_err());
    }

    #[test]
    fn test_new_address_defaults() {
        let address: NewAddress = serde_json::from_value(serde_json::json!({"street_address": "1 Main St", "city": "Lagos", "zip_code": "100001", "country": "NG"})).unwrap();
        assert!(address.is_shipping);
        assert!(!address.is_billing);
        assert!(address.validate().is_ok());
        assert_eq!(AddressDefault::Billing.column(), "is_default_billing");
    }
}
