use axum::{http::StatusCode, routing::get, Json, Router};

use crate::services::errors::ServiceError;

pub mod auth;
pub mod cash;
pub mod employees;
pub mod health;
pub mod movements;
pub mod payments;
pub mod registers;
pub mod reports;
pub mod units;

pub type ApiError = (StatusCode, Json<serde_json::Value>);

pub fn router() -> Router {
    Router::new()
        .route("/health", get(health::healthcheck))
        .nest("/auth", auth::router())
        .nest("/units", units::router())
        .nest("/employees", employees::router())
        .nest("/registers", registers::router())
        .nest("/movements", movements::router())
        .nest("/payments", payments::router())
        .nest("/reports", reports::router())
        .nest("/cash", cash::router())
}

pub(crate) fn to_response(err: ServiceError) -> ApiError {
    if let ServiceError::Internal(detail) = &err {
        tracing::error!(error = %detail, "request failed");
        return (
            err.status_code(),
            Json(serde_json::json!({ "error": "internal_error" })),
        );
    }
    (
        err.status_code(),
        Json(serde_json::json!({ "error": err.to_string() })),
    )
}
