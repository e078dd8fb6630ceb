//! Request body extractors

use axum::{async_trait, body::Bytes, extract::{FromRequest, Request}, Json};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::EcommerceError;

/// JSON body that has passed its `Validate` rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = EcommerceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await
            .map_err(|rejection| EcommerceError::InvalidInput(rejection.body_text()))?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// A JSON body that may be omitted entirely; an empty body yields `T::default()`.
pub fn optional_json<T>(body: &Bytes) -> Result<T, EcommerceError>
where
    T: DeserializeOwned + Validate + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    let value: T = serde_json::from_slice(body).map_err(|e| EcommerceError::InvalidInput(format!("invalid JSON body: {e}")))?;
    value.validate()?;
    Ok(value)
}
