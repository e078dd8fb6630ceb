//! Caller identity asserted by the upstream gateway.
//!
//! Credentials are checked before requests reach this service; the gateway
//! forwards `x-user-id` and `x-user-role`. Handlers take a [`Caller`] (or
//! `Option<Caller>` for anonymous routes) and pass it into service calls.

use axum::{async_trait, extract::FromRequestParts, http::{request::Parts, HeaderMap}};
use std::convert::Infallible;
use uuid::Uuid;

use crate::error::EcommerceError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";
pub const SESSION_ID_HEADER: &str = "x-session-id";

const STAFF_ROLE: &str = "staff";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Uuid,
    pub is_staff: bool,
}

impl Caller {
    pub fn customer(user_id: Uuid) -> Self { Self { user_id, is_staff: false } }
    pub fn staff(user_id: Uuid) -> Self { Self { user_id, is_staff: true } }

    pub fn from_headers(headers: &HeaderMap) -> Result<Self, EcommerceError> {
        let user_id = headers.get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v.trim()).ok())
            .ok_or(EcommerceError::Unauthenticated)?;
        let is_staff = headers.get(USER_ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|role| role.trim().eq_ignore_ascii_case(STAFF_ROLE));
        Ok(Self { user_id, is_staff })
    }

    pub fn require_staff(&self) -> Result<(), EcommerceError> {
        if !self.is_staff {
            return Err(EcommerceError::Forbidden);
        }
        Ok(())
    }

    /// Owners and staff may touch a resource.
    pub fn can_access(&self, owner: Uuid) -> bool { self.is_staff || self.user_id == owner }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = EcommerceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_headers(&parts.headers)
    }
}

/// Anonymous session id used for view tracking.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionId(pub Option<String>);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for SessionId {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts.headers.get(SESSION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        Ok(Self(session))
    }
}
