use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    domain::models::{Employee, Role},
    infrastructure::{auth::AuthenticatedUser, state::AppState},
};

use super::{
    access::{ensure_role, ensure_unit_access, scoped_unit},
    errors::ServiceError,
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateEmployeeRequest {
    #[validate(length(min = 3, max = 64))]
    pub login: String,
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    pub role: Role,
    pub unit_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateEmployeeRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    pub role: Option<Role>,
    pub unit_id: Option<Uuid>,
    pub active: Option<bool>,
}

/// Staff records. Admins manage everyone; managers manage the operators of
/// their own unit.
pub struct EmployeeService {
    state: Arc<AppState>,
}

impl EmployeeService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub async fn list(
        &self,
        actor: &AuthenticatedUser,
        unit_id: Option<Uuid>,
    ) -> Result<Vec<Employee>, ServiceError> {
        let unit_id = scoped_unit(actor, unit_id)?;
        let employees = sqlx::query_as::<_, Employee>(
            "SELECT * FROM employees
             WHERE ($1::uuid IS NULL OR unit_id = $1)
             ORDER BY LOWER(name) ASC, id ASC",
        )
        .bind(unit_id)
        .fetch_all(&self.state.pool)
        .await?;
        Ok(employees)
    }

    pub async fn get(&self, actor: &AuthenticatedUser, id: Uuid) -> Result<Employee, ServiceError> {
        let employee = self.fetch(id).await?;
        if employee.id != actor.employee_id {
            ensure_visible(actor, &employee)?;
        }
        Ok(employee)
    }

    pub async fn create(
        &self,
        actor: &AuthenticatedUser,
        payload: CreateEmployeeRequest,
    ) -> Result<Employee, ServiceError> {
        ensure_role(actor, &[Role::Manager, Role::Admin])?;
        payload.validate()?;
        check_assignment(payload.role, payload.unit_id)?;
        ensure_can_manage(actor, payload.role, payload.unit_id)?;

        let employee = sqlx::query_as::<_, Employee>(
            "INSERT INTO employees (id, login, name, role, unit_id, active, created_at)
             VALUES ($1,$2,$3,$4,$5,TRUE,$6)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(payload.login.trim().to_ascii_lowercase())
        .bind(payload.name.trim())
        .bind(payload.role)
        .bind(payload.unit_id)
        .bind(Utc::now())
        .fetch_one(&self.state.pool)
        .await?;

        info!(
            employee_id = %employee.id,
            role = %employee.role,
            created_by = %actor.employee_id,
            "employee created"
        );
        Ok(employee)
    }

    pub async fn update(
        &self,
        actor: &AuthenticatedUser,
        id: Uuid,
        payload: UpdateEmployeeRequest,
    ) -> Result<Employee, ServiceError> {
        ensure_role(actor, &[Role::Manager, Role::Admin])?;
        payload.validate()?;

        let current = self.fetch(id).await?;
        ensure_can_manage(actor, current.role, current.unit_id)?;

        let role = payload.role.unwrap_or(current.role);
        let unit_id = payload.unit_id.or(current.unit_id);
        check_assignment(role, unit_id)?;
        ensure_can_manage(actor, role, unit_id)?;

        if id == actor.employee_id && payload.active == Some(false) {
            return Err(ServiceError::Validation(
                "cannot deactivate your own account".into(),
            ));
        }

        let employee = sqlx::query_as::<_, Employee>(
            "UPDATE employees
             SET name = COALESCE($1, name), role = $2, unit_id = $3, active = COALESCE($4, active)
             WHERE id = $5
             RETURNING *",
        )
        .bind(payload.name.as_deref().map(str::trim))
        .bind(role)
        .bind(unit_id)
        .bind(payload.active)
        .bind(id)
        .fetch_optional(&self.state.pool)
        .await?
        .ok_or(ServiceError::NotFound)?;

        info!(employee_id = %employee.id, updated_by = %actor.employee_id, "employee updated");
        Ok(employee)
    }

    pub async fn deactivate(
        &self,
        actor: &AuthenticatedUser,
        id: Uuid,
    ) -> Result<Employee, ServiceError> {
        self.update(
            actor,
            id,
            UpdateEmployeeRequest {
                active: Some(false),
                ..Default::default()
            },
        )
        .await
    }

    async fn fetch(&self, id: Uuid) -> Result<Employee, ServiceError> {
        sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.state.pool)
            .await?
            .ok_or(ServiceError::NotFound)
    }
}

fn check_assignment(role: Role, unit_id: Option<Uuid>) -> Result<(), ServiceError> {
    if role != Role::Admin && unit_id.is_none() {
        return Err(ServiceError::Validation(
            "operators and managers must belong to a unit".into(),
        ));
    }
    Ok(())
}

fn ensure_can_manage(
    actor: &AuthenticatedUser,
    role: Role,
    unit_id: Option<Uuid>,
) -> Result<(), ServiceError> {
    if actor.is_admin() {
        return Ok(());
    }
    if actor.role != Role::Manager || role != Role::Operator {
        return Err(ServiceError::Forbidden);
    }
    match unit_id {
        Some(unit_id) => ensure_unit_access(actor, unit_id),
        None => Err(ServiceError::Forbidden),
    }
}

fn ensure_visible(actor: &AuthenticatedUser, employee: &Employee) -> Result<(), ServiceError> {
    match employee.unit_id {
        Some(unit_id) => ensure_unit_access(actor, unit_id),
        None if actor.is_admin() => Ok(()),
        None => Err(ServiceError::Forbidden),
    }
}
