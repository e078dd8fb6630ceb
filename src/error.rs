//! Error taxonomy shared by services and handlers

use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde::Serialize;
use sqlx::error::{DatabaseError, ErrorKind};
use thiserror::Error;
use tracing::error;

use crate::domain::aggregates::{CouponError, OrderError, ReviewError};
use crate::domain::value_objects::{SlugError, StarsError};

#[derive(Error, Debug)]
pub enum EcommerceError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("you do not have permission to perform this action")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Database(#[source] sqlx::Error),
}

pub type Result<T, E = EcommerceError> = std::result::Result<T, E>;

impl EcommerceError {
    pub fn not_found(what: impl Into<String>) -> Self { Self::NotFound(what.into()) }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::Conflict(_) => "CONFLICT",
            Self::Database(_) => "INTERNAL_ERROR",
        }
    }
}

/// SQLSTATE raised when a value overflows its `NUMERIC` or `INTEGER` column.
const NUMERIC_VALUE_OUT_OF_RANGE: &str = "22003";

impl From<sqlx::Error> for EcommerceError {
    fn from(error: sqlx::Error) -> Self {
        if matches!(error, sqlx::Error::RowNotFound) {
            return Self::NotFound("record".into());
        }

        if error.as_database_error().and_then(DatabaseError::code).as_deref() == Some(NUMERIC_VALUE_OUT_OF_RANGE) {
            return Self::InvalidInput("value out of range".into());
        }

        match error.as_database_error().map(DatabaseError::kind) {
            Some(ErrorKind::UniqueViolation) => Self::Conflict("record already exists".into()),
            Some(ErrorKind::ForeignKeyViolation) => Self::InvalidInput("referenced record does not exist".into()),
            Some(ErrorKind::NotNullViolation) => Self::InvalidInput("missing required field".into()),
            Some(ErrorKind::CheckViolation) => Self::InvalidInput("value out of range".into()),
            Some(ErrorKind::Other | _) | None => Self::Database(error),
        }
    }
}

impl From<validator::ValidationErrors> for EcommerceError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors.field_errors().into_iter()
            .map(|(field, errs)| {
                let codes: Vec<&str> = errs.iter().map(|e| e.code.as_ref()).collect();
                format!("{field}: {}", codes.join(", "))
            })
            .collect();
        if fields.is_empty() {
            fields.push(errors.to_string());
        }
        fields.sort();
        Self::InvalidInput(format!("validation failed: {}", fields.join("; ")))
    }
}

impl From<OrderError> for EcommerceError {
    fn from(error: OrderError) -> Self { Self::InvalidInput(error.to_string()) }
}

impl From<CouponError> for EcommerceError {
    fn from(error: CouponError) -> Self {
        match error {
            CouponError::UnknownCode => Self::NotFound("coupon".into()),
            CouponError::NotValid(_) => Self::InvalidInput(error.to_string()),
        }
    }
}

impl From<ReviewError> for EcommerceError {
    fn from(error: ReviewError) -> Self {
        match error {
            ReviewError::RatingNotFound => Self::NotFound("rating".into()),
            ReviewError::NotRatingOwner => Self::Forbidden,
            ReviewError::AlreadyReviewed | ReviewError::AlreadyRated => Self::Conflict(error.to_string()),
            ReviewError::Stars(_) => Self::InvalidInput(error.to_string()),
        }
    }
}

impl From<SlugError> for EcommerceError {
    fn from(error: SlugError) -> Self { Self::InvalidInput(error.to_string()) }
}

impl From<StarsError> for EcommerceError {
    fn from(error: StarsError) -> Self { Self::InvalidInput(error.to_string()) }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

impl IntoResponse for EcommerceError {
    fn into_response(self) -> Response {
        let message = match &self {
            Self::Database(e) => {
                error!(error = %e, "storage failure");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        (self.status(), Json(ErrorBody { error: message, code: self.code() })).into_response()
    }
}
