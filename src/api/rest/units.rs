use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    infrastructure::{auth::AuthenticatedUser, state::AppState},
    services::units::{CreateUnitRequest, UnitService, UpdateUnitRequest},
};

use super::{to_response, ApiError};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_units).post(create_unit))
        .route("/:id", get(get_unit).put(update_unit).delete(deactivate_unit))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UnitListQuery {
    include_inactive: bool,
}

async fn list_units(
    Extension(state): Extension<Arc<AppState>>,
    _user: AuthenticatedUser,
    Query(query): Query<UnitListQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let units = UnitService::new(state)
        .list(query.include_inactive)
        .await
        .map_err(to_response)?;
    Ok(Json(serde_json::json!({ "units": units })))
}

async fn get_unit(
    Extension(state): Extension<Arc<AppState>>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let unit = UnitService::new(state).get(id).await.map_err(to_response)?;
    Ok(Json(serde_json::json!({ "unit": unit })))
}

async fn create_unit(
    Extension(state): Extension<Arc<AppState>>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateUnitRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let unit = UnitService::new(state)
        .create(&user, payload)
        .await
        .map_err(to_response)?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "unit": unit })),
    ))
}

async fn update_unit(
    Extension(state): Extension<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUnitRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let unit = UnitService::new(state)
        .update(&user, id, payload)
        .await
        .map_err(to_response)?;
    Ok(Json(serde_json::json!({ "unit": unit })))
}

async fn deactivate_unit(
    Extension(state): Extension<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let unit = UnitService::new(state)
        .deactivate(&user, id)
        .await
        .map_err(to_response)?;
    Ok(Json(serde_json::json!({ "unit": unit })))
}
