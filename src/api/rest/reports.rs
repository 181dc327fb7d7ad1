use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    routing::get,
    Json, Router,
};

use crate::{
    infrastructure::{auth::AuthenticatedUser, state::AppState},
    services::reports::{ReportQuery, ReportService},
};

use super::{to_response, ApiError};

pub fn router() -> Router {
    Router::new()
        .route("/summary", get(period_summary))
        .route("/registers", get(register_closings))
}

async fn period_summary(
    Extension(state): Extension<Arc<AppState>>,
    user: AuthenticatedUser,
    Query(query): Query<ReportQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let report = ReportService::new(state)
        .summary(&user, query)
        .await
        .map_err(to_response)?;
    Ok(Json(serde_json::json!({ "report": report })))
}

async fn register_closings(
    Extension(state): Extension<Arc<AppState>>,
    user: AuthenticatedUser,
    Query(query): Query<ReportQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let report = ReportService::new(state)
        .registers(&user, query)
        .await
        .map_err(to_response)?;
    Ok(Json(serde_json::json!({ "report": report })))
}
