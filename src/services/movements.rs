use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_with::{serde_as, NoneAsEmptyString};
use sqlx::PgExecutor;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    domain::models::{Movement, MovementDirection, PaymentMethod, PaymentStatus, Role},
    infrastructure::{auth::AuthenticatedUser, state::AppState},
};

use super::{
    access::{ensure_unit_access, scoped_unit},
    errors::ServiceError,
    registers::{fetch_register, RegisterLock},
};

#[derive(Debug, Deserialize, Validate)]
pub struct RecordMovementRequest {
    pub register_id: Uuid,
    pub amount_cents: i64,
    #[serde(default = "default_direction")]
    pub direction: MovementDirection,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[validate(length(max = 255))]
    pub description: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
}

fn default_direction() -> MovementDirection {
    MovementDirection::Inflow
}

#[serde_as]
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MovementQuery {
    #[serde_as(as = "NoneAsEmptyString")]
    pub register_id: Option<Uuid>,
    #[serde_as(as = "NoneAsEmptyString")]
    pub unit_id: Option<Uuid>,
    #[serde_as(as = "NoneAsEmptyString")]
    pub payment_method: Option<PaymentMethod>,
    #[serde_as(as = "NoneAsEmptyString")]
    pub payment_status: Option<PaymentStatus>,
    #[serde_as(as = "NoneAsEmptyString")]
    pub from: Option<NaiveDate>,
    #[serde_as(as = "NoneAsEmptyString")]
    pub to: Option<NaiveDate>,
}

/// Sales, withdrawals and other money flows of an open register.
pub struct MovementService {
    state: Arc<AppState>,
}

impl MovementService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub async fn record(
        &self,
        actor: &AuthenticatedUser,
        payload: RecordMovementRequest,
    ) -> Result<Movement, ServiceError> {
        payload.validate()?;
        check_amount(payload.amount_cents, self.state.config.cash.max_movement_cents)?;

        // The shared lock holds off a concurrent close until this insert
        // commits, so a closed register never gains movements.
        let mut tx = self.state.pool.begin().await?;
        let register = fetch_register(&mut *tx, payload.register_id, RegisterLock::Shared).await?;
        ensure_unit_access(actor, register.unit_id)?;
        if !register.is_open() {
            return Err(ServiceError::Conflict("cash register is closed".into()));
        }

        let now = Utc::now();
        let settled_at = (payload.payment_status == PaymentStatus::Realized).then_some(now);

        let movement = sqlx::query_as::<_, Movement>(
            "INSERT INTO movements (id, register_id, unit_id, amount_cents, direction, payment_method,
                                    payment_status, description, occurred_at, business_date, created_by, settled_at)
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(register.id)
        .bind(register.unit_id)
        .bind(payload.amount_cents)
        .bind(payload.direction)
        .bind(payload.payment_method)
        .bind(payload.payment_status)
        .bind(payload.description.as_deref().map(str::trim))
        .bind(payload.occurred_at.unwrap_or(now))
        .bind(register.business_date)
        .bind(actor.employee_id)
        .bind(settled_at)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        info!(
            movement_id = %movement.id,
            register_id = %register.id,
            direction = %movement.direction,
            method = %movement.payment_method,
            status = %movement.payment_status,
            amount_cents = movement.amount_cents,
            "movement recorded"
        );
        Ok(movement)
    }

    pub async fn list(
        &self,
        actor: &AuthenticatedUser,
        query: MovementQuery,
    ) -> Result<Vec<Movement>, ServiceError> {
        let unit_id = scoped_unit(actor, query.unit_id)?;
        let movements = sqlx::query_as::<_, Movement>(
            "SELECT * FROM movements
             WHERE ($1::uuid IS NULL OR unit_id = $1)
               AND ($2::uuid IS NULL OR register_id = $2)
               AND ($3::text IS NULL OR payment_method = $3)
               AND ($4::text IS NULL OR payment_status = $4)
               AND ($5::date IS NULL OR business_date >= $5)
               AND ($6::date IS NULL OR business_date <= $6)
             ORDER BY occurred_at DESC, id ASC",
        )
        .bind(unit_id)
        .bind(query.register_id)
        .bind(query.payment_method)
        .bind(query.payment_status)
        .bind(query.from)
        .bind(query.to)
        .fetch_all(&self.state.pool)
        .await?;
        Ok(movements)
    }

    pub async fn get(&self, actor: &AuthenticatedUser, id: Uuid) -> Result<Movement, ServiceError> {
        let movement = fetch_movement(&self.state.pool, id, false).await?;
        ensure_unit_access(actor, movement.unit_id)?;
        Ok(movement)
    }

    /// Removes a mistaken entry. Only possible while the register is open;
    /// operators may only remove entries they recorded themselves.
    pub async fn delete(&self, actor: &AuthenticatedUser, id: Uuid) -> Result<(), ServiceError> {
        let mut tx = self.state.pool.begin().await?;
        let movement = fetch_movement(&mut *tx, id, true).await?;
        ensure_unit_access(actor, movement.unit_id)?;
        if actor.role == Role::Operator && movement.created_by != actor.employee_id {
            return Err(ServiceError::Forbidden);
        }

        let register =
            fetch_register(&mut *tx, movement.register_id, RegisterLock::Exclusive).await?;
        if !register.is_open() {
            return Err(ServiceError::Conflict(
                "movements of a closed cash register cannot be removed".into(),
            ));
        }

        sqlx::query("DELETE FROM movements WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(movement_id = %id, removed_by = %actor.employee_id, "movement removed");
        Ok(())
    }
}

fn check_amount(amount_cents: i64, max_cents: i64) -> Result<(), ServiceError> {
    if amount_cents <= 0 {
        return Err(ServiceError::Validation(
            "amount_cents must be greater than zero".into(),
        ));
    }
    if amount_cents > max_cents {
        return Err(ServiceError::Validation(format!(
            "amount_cents must not exceed {max_cents}"
        )));
    }
    Ok(())
}

pub(crate) async fn fetch_movement<'e, E>(
    executor: E,
    id: Uuid,
    for_update: bool,
) -> Result<Movement, ServiceError>
where
    E: PgExecutor<'e>,
{
    let sql = if for_update {
        "SELECT * FROM movements WHERE id = $1 FOR UPDATE"
    } else {
        "SELECT * FROM movements WHERE id = $1"
    };
    sqlx::query_as::<_, Movement>(sql)
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or(ServiceError::NotFound)
}

pub(crate) async fn register_movements<'e, E>(
    executor: E,
    register_id: Uuid,
) -> Result<Vec<Movement>, ServiceError>
where
    E: PgExecutor<'e>,
{
    let movements = sqlx::query_as::<_, Movement>(
        "SELECT * FROM movements WHERE register_id = $1 ORDER BY occurred_at ASC, id ASC",
    )
    .bind(register_id)
    .fetch_all(executor)
    .await?;
    Ok(movements)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_must_be_positive_and_capped() {
        assert!(check_amount(1, 100).is_ok());
        assert!(check_amount(100, 100).is_ok());
        assert!(matches!(check_amount(0, 100), Err(ServiceError::Validation(_))));
        assert!(matches!(check_amount(-5, 100), Err(ServiceError::Validation(_))));
        assert!(matches!(check_amount(101, 100), Err(ServiceError::Validation(_))));
    }

    #[test]
    fn request_defaults_to_settled_inflow() {
        let payload: RecordMovementRequest = serde_json::from_value(serde_json::json!({
            "register_id": Uuid::nil(),
            "amount_cents": 1250,
            "payment_method": "pix"
        }))
        .unwrap();

        assert_eq!(payload.direction, MovementDirection::Inflow);
        assert_eq!(payload.payment_status, PaymentStatus::Realized);
        assert_eq!(payload.payment_method, PaymentMethod::Pix);
    }

    #[test]
    fn empty_query_values_are_ignored() {
        let query: MovementQuery =
            serde_json::from_value(serde_json::json!({ "unit_id": "", "payment_status": "pendente" }))
                .unwrap();

        assert!(query.unit_id.is_none());
        assert_eq!(query.payment_status, Some(PaymentStatus::Pending));
    }
}
