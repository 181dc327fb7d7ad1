use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_with::{serde_as, NoneAsEmptyString};
use uuid::Uuid;

use crate::{
    infrastructure::{auth::AuthenticatedUser, state::AppState},
    services::payments::{PaymentService, SettleRequest},
};

use super::{to_response, ApiError};

pub fn router() -> Router {
    Router::new()
        .route("/pending", get(list_pending))
        .route("/:id/settle", post(settle_payment))
}

#[serde_as]
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PendingQuery {
    #[serde_as(as = "NoneAsEmptyString")]
    unit_id: Option<Uuid>,
}

async fn list_pending(
    Extension(state): Extension<Arc<AppState>>,
    user: AuthenticatedUser,
    Query(query): Query<PendingQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let payments = PaymentService::new(state)
        .list_pending(&user, query.unit_id)
        .await
        .map_err(to_response)?;
    Ok(Json(serde_json::json!({ "payments": payments })))
}

async fn settle_payment(
    Extension(state): Extension<Arc<AppState>>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    payload: Option<Json<SettleRequest>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let payload = payload.map(|Json(body)| body).unwrap_or_default();
    let payment = PaymentService::new(state)
        .settle(&user, id, payload)
        .await
        .map_err(to_response)?;
    Ok(Json(serde_json::json!({ "payment": payment })))
}
