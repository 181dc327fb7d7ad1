use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::{
    infrastructure::{auth::AuthenticatedUser, state::AppState},
    services::registers::{
        CloseRegisterRequest, OpenRegisterRequest, RegisterQuery, RegisterService,
    },
};

use super::{to_response, ApiError};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_registers).post(open_register))
        .route("/:id", get(get_register))
        .route("/:id/close", post(close_register))
        .route("/:id/summary", get(register_summary))
}

async fn list_registers(
    Extension(state): Extension<Arc<AppState>>,
    user: AuthenticatedUser,
    Query(query): Query<RegisterQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let registers = RegisterService::new(state)
        .list(&user, query)
        .await
        .map_err(to_response)?;
    Ok(Json(serde_json::json!({ "registers": registers })))
}

async fn open_register(
    Extension(state): Extension<Arc<AppState>>,
    user: AuthenticatedUser,
    Json(payload): Json<OpenRegisterRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let register = RegisterService::new(state)
        .open(&user, payload)
        .await
        .map_err(to_response)?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "register": register })),
    ))
}

async fn get_register(
    Extension(state): Extension<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let register = RegisterService::new(state)
        .get(&user, id)
        .await
        .map_err(to_response)?;
    Ok(Json(serde_json::json!({ "register": register })))
}

async fn close_register(
    Extension(state): Extension<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CloseRegisterRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let register = RegisterService::new(state)
        .close(&user, id, payload)
        .await
        .map_err(to_response)?;
    Ok(Json(serde_json::json!({ "register": register })))
}

async fn register_summary(
    Extension(state): Extension<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let summary = RegisterService::new(state)
        .summary(&user, id)
        .await
        .map_err(to_response)?;
    Ok(Json(serde_json::json!(summary)))
}
