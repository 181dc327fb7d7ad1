use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::{coins::CoinError, period::PeriodError};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("not found")]
    NotFound,
    #[error("forbidden")]
    Forbidden,
    #[error("validation error: {0}")]
    Validation(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NotFound => StatusCode::NOT_FOUND,
            ServiceError::Forbidden => StatusCode::FORBIDDEN,
            ServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        match err.as_database_error() {
            Some(db_err) if db_err.is_unique_violation() => {
                ServiceError::Conflict("record already exists".into())
            }
            Some(db_err) if db_err.is_foreign_key_violation() => {
                ServiceError::Validation("referenced record does not exist".into())
            }
            _ => ServiceError::Internal(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

impl From<PeriodError> for ServiceError {
    fn from(err: PeriodError) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

impl From<CoinError> for ServiceError {
    fn from(err: CoinError) -> Self {
        ServiceError::Validation(err.to_string())
    }
}
