use std::sync::Arc;

use axum::{extract::Extension, routing::post, Json, Router};

use crate::{
    infrastructure::{auth::AuthenticatedUser, state::AppState},
    services::{
        cash::{count_drawer, make_change, ChangeRequest, CountRequest},
        errors::ServiceError,
    },
};

use super::{to_response, ApiError};

pub fn router() -> Router {
    Router::new()
        .route("/count", post(count))
        .route("/change", post(change))
}

async fn count(
    _user: AuthenticatedUser,
    Json(payload): Json<CountRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let result = count_drawer(&payload).map_err(to_response)?;
    Ok(Json(serde_json::json!(result)))
}

/// The drawer search is CPU-bound, so it runs off the async workers.
async fn change(
    Extension(state): Extension<Arc<AppState>>,
    _user: AuthenticatedUser,
    Json(payload): Json<ChangeRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let max_cents = state.config.cash.max_movement_cents;
    let breakdown = tokio::task::spawn_blocking(move || make_change(&payload, max_cents))
        .await
        .map_err(|err| to_response(ServiceError::Internal(format!("change task failed: {err}"))))?
        .map_err(to_response)?;
    Ok(Json(serde_json::json!(breakdown)))
}
