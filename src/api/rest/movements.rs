use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

use crate::{
    infrastructure::{auth::AuthenticatedUser, state::AppState},
    services::movements::{MovementQuery, MovementService, RecordMovementRequest},
};

use super::{to_response, ApiError};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_movements).post(record_movement))
        .route("/:id", get(get_movement).delete(delete_movement))
}

async fn list_movements(
    Extension(state): Extension<Arc<AppState>>,
    user: AuthenticatedUser,
    Query(query): Query<MovementQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let movements = MovementService::new(state)
        .list(&user, query)
        .await
        .map_err(to_response)?;
    Ok(Json(serde_json::json!({ "movements": movements })))
}

async fn record_movement(
    Extension(state): Extension<Arc<AppState>>,
    user: AuthenticatedUser,
    Json(payload): Json<RecordMovementRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let movement = MovementService::new(state)
        .record(&user, payload)
        .await
        .map_err(to_response)?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "movement": movement })),
    ))
}

async fn get_movement(
    Extension(state): Extension<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let movement = MovementService::new(state)
        .get(&user, id)
        .await
        .map_err(to_response)?;
    Ok(Json(serde_json::json!({ "movement": movement })))
}

async fn delete_movement(
    Extension(state): Extension<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    MovementService::new(state)
        .delete(&user, id)
        .await
        .map_err(to_response)?;
    Ok(StatusCode::NO_CONTENT)
}
