use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_with::{serde_as, NoneAsEmptyString};
use uuid::Uuid;

use crate::{
    infrastructure::{auth::AuthenticatedUser, state::AppState},
    services::employees::{CreateEmployeeRequest, EmployeeService, UpdateEmployeeRequest},
};

use super::{to_response, ApiError};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_employees).post(create_employee))
        .route(
            "/:id",
            get(get_employee).put(update_employee).delete(deactivate_employee),
        )
}

#[serde_as]
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EmployeeListQuery {
    #[serde_as(as = "NoneAsEmptyString")]
    unit_id: Option<Uuid>,
}

async fn list_employees(
    Extension(state): Extension<Arc<AppState>>,
    user: AuthenticatedUser,
    Query(query): Query<EmployeeListQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let employees = EmployeeService::new(state)
        .list(&user, query.unit_id)
        .await
        .map_err(to_response)?;
    Ok(Json(serde_json::json!({ "employees": employees })))
}

async fn get_employee(
    Extension(state): Extension<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let employee = EmployeeService::new(state)
        .get(&user, id)
        .await
        .map_err(to_response)?;
    Ok(Json(serde_json::json!({ "employee": employee })))
}

async fn create_employee(
    Extension(state): Extension<Arc<AppState>>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateEmployeeRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let employee = EmployeeService::new(state)
        .create(&user, payload)
        .await
        .map_err(to_response)?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "employee": employee })),
    ))
}

async fn update_employee(
    Extension(state): Extension<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateEmployeeRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let employee = EmployeeService::new(state)
        .update(&user, id, payload)
        .await
        .map_err(to_response)?;
    Ok(Json(serde_json::json!({ "employee": employee })))
}

async fn deactivate_employee(
    Extension(state): Extension<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let employee = EmployeeService::new(state)
        .deactivate(&user, id)
        .await
        .map_err(to_response)?;
    Ok(Json(serde_json::json!({ "employee": employee })))
}
