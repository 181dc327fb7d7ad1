use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    domain::models::{RegisterStatus, Role, Unit},
    infrastructure::{auth::AuthenticatedUser, state::AppState},
};

use super::{access::ensure_role, errors::ServiceError};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUnitRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    #[validate(length(max = 255))]
    pub address: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUnitRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    #[validate(length(max = 255))]
    pub address: Option<String>,
    pub active: Option<bool>,
}

/// Store units. Everyone signed in may read them; only admins change them.
pub struct UnitService {
    state: Arc<AppState>,
}

impl UnitService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub async fn list(&self, include_inactive: bool) -> Result<Vec<Unit>, ServiceError> {
        let units = sqlx::query_as::<_, Unit>(
            "SELECT * FROM units WHERE ($1 OR active) ORDER BY LOWER(name) ASC",
        )
        .bind(include_inactive)
        .fetch_all(&self.state.pool)
        .await?;
        Ok(units)
    }

    pub async fn get(&self, id: Uuid) -> Result<Unit, ServiceError> {
        sqlx::query_as::<_, Unit>("SELECT * FROM units WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.state.pool)
            .await?
            .ok_or(ServiceError::NotFound)
    }

    pub async fn create(
        &self,
        actor: &AuthenticatedUser,
        payload: CreateUnitRequest,
    ) -> Result<Unit, ServiceError> {
        ensure_role(actor, &[Role::Admin])?;
        payload.validate()?;
        require_name(Some(payload.name.as_str()))?;

        let unit = sqlx::query_as::<_, Unit>(
            "INSERT INTO units (id, name, address, active, created_at)
             VALUES ($1,$2,$3,TRUE,$4)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(payload.name.trim())
        .bind(payload.address.as_deref().map(str::trim))
        .bind(Utc::now())
        .fetch_one(&self.state.pool)
        .await?;

        info!(unit_id = %unit.id, name = %unit.name, "unit created");
        Ok(unit)
    }

    pub async fn update(
        &self,
        actor: &AuthenticatedUser,
        id: Uuid,
        payload: UpdateUnitRequest,
    ) -> Result<Unit, ServiceError> {
        ensure_role(actor, &[Role::Admin])?;
        payload.validate()?;
        require_name(payload.name.as_deref())?;
        if payload.active == Some(false) {
            self.ensure_no_open_register(id).await?;
        }

        let unit = sqlx::query_as::<_, Unit>(
            "UPDATE units
             SET name = COALESCE($1, name),
                 address = COALESCE($2, address),
                 active = COALESCE($3, active)
             WHERE id = $4
             RETURNING *",
        )
        .bind(payload.name.as_deref().map(str::trim))
        .bind(payload.address.as_deref().map(str::trim))
        .bind(payload.active)
        .bind(id)
        .fetch_optional(&self.state.pool)
        .await?
        .ok_or(ServiceError::NotFound)?;

        info!(unit_id = %unit.id, "unit updated");
        Ok(unit)
    }

    /// Soft delete: history keeps pointing at the unit.
    pub async fn deactivate(&self, actor: &AuthenticatedUser, id: Uuid) -> Result<Unit, ServiceError> {
        ensure_role(actor, &[Role::Admin])?;
        self.ensure_no_open_register(id).await?;

        let unit = sqlx::query_as::<_, Unit>(
            "UPDATE units SET active = FALSE WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.state.pool)
        .await?
        .ok_or(ServiceError::NotFound)?;

        info!(unit_id = %unit.id, "unit deactivated");
        Ok(unit)
    }

    /// Every deactivation path goes through here.
    async fn ensure_no_open_register(&self, id: Uuid) -> Result<(), ServiceError> {
        let open_registers = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(1) FROM cash_registers WHERE unit_id = $1 AND status = $2",
        )
        .bind(id)
        .bind(RegisterStatus::Open)
        .fetch_one(&self.state.pool)
        .await?;
        if open_registers > 0 {
            return Err(ServiceError::Conflict(
                "unit still has an open cash register".into(),
            ));
        }
        Ok(())
    }
}

fn require_name(name: Option<&str>) -> Result<(), ServiceError> {
    match name {
        Some(name) if name.trim().is_empty() => {
            Err(ServiceError::Validation("unit name cannot be blank".into()))
        }
        _ => Ok(()),
    }
}
