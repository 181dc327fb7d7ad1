use std::sync::Arc;

use axum::{extract::Extension, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    domain::models::{Employee, Role},
    infrastructure::{
        auth::{credential_matches, issue_token},
        state::AppState,
    },
    services::errors::ServiceError,
};

use super::{to_response, ApiError};

pub fn router() -> Router {
    Router::new().route("/login", post(login))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    login: String,
    credential: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    token: String,
    employee_id: Uuid,
    role: Role,
    unit_id: Option<Uuid>,
}

async fn login(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    if !credential_matches(&state.config.auth.developer_credential, &payload.credential) {
        warn!("login rejected: credential mismatch");
        return Err(unauthorized());
    }

    let employee = sqlx::query_as::<_, Employee>(
        "SELECT * FROM employees WHERE login = $1 AND active",
    )
    .bind(payload.login.trim().to_ascii_lowercase())
    .fetch_optional(&state.pool)
    .await
    .map_err(|err| to_response(ServiceError::from(err)))?;

    let Some(employee) = employee else {
        return Err(unauthorized());
    };

    let token = issue_token(&state, &employee).map_err(to_response)?;
    info!(employee_id = %employee.id, role = %employee.role, "employee signed in");

    Ok(Json(LoginResponse {
        token,
        employee_id: employee.id,
        role: employee.role,
        unit_id: employee.unit_id,
    }))
}

fn unauthorized() -> ApiError {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "error": "invalid_credentials" })),
    )
}
