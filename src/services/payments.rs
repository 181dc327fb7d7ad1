use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::{
    domain::models::{Movement, PaymentMethod, PaymentStatus, Role},
    infrastructure::{auth::AuthenticatedUser, state::AppState},
};

use super::{
    access::{ensure_role, ensure_unit_access, scoped_unit},
    errors::ServiceError,
    movements::fetch_movement,
};

#[derive(Debug, Default, Deserialize)]
pub struct SettleRequest {
    /// Corrects the method when the customer paid differently than announced.
    pub payment_method: Option<PaymentMethod>,
}

/// Pending payments: movements recorded as `pendente` that are settled
/// later, possibly after their register closed.
pub struct PaymentService {
    state: Arc<AppState>,
}

impl PaymentService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub async fn list_pending(
        &self,
        actor: &AuthenticatedUser,
        unit_id: Option<Uuid>,
    ) -> Result<Vec<Movement>, ServiceError> {
        let unit_id = scoped_unit(actor, unit_id)?;
        let pending = sqlx::query_as::<_, Movement>(
            "SELECT * FROM movements
             WHERE payment_status = $1 AND ($2::uuid IS NULL OR unit_id = $2)
             ORDER BY occurred_at ASC, id ASC",
        )
        .bind(PaymentStatus::Pending)
        .bind(unit_id)
        .fetch_all(&self.state.pool)
        .await?;
        Ok(pending)
    }

    pub async fn settle(
        &self,
        actor: &AuthenticatedUser,
        id: Uuid,
        payload: SettleRequest,
    ) -> Result<Movement, ServiceError> {
        ensure_role(actor, &[Role::Manager, Role::Admin])?;

        let mut tx = self.state.pool.begin().await?;
        let movement = fetch_movement(&mut *tx, id, true).await?;
        ensure_unit_access(actor, movement.unit_id)?;
        if movement.payment_status != PaymentStatus::Pending {
            return Err(ServiceError::Conflict("payment is already settled".into()));
        }

        let settled = sqlx::query_as::<_, Movement>(
            "UPDATE movements
             SET payment_status = $1, payment_method = $2, settled_at = $3
             WHERE id = $4
             RETURNING *",
        )
        .bind(PaymentStatus::Realized)
        .bind(payload.payment_method.unwrap_or(movement.payment_method))
        .bind(Utc::now())
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(
            movement_id = %settled.id,
            method = %settled.payment_method,
            settled_by = %actor.employee_id,
            "pending payment settled"
        );
        Ok(settled)
    }
}
