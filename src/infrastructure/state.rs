use std::sync::Arc;

use uuid::Uuid;

use crate::{
    domain::models::Employee,
    infrastructure::{
        auth::{AuthenticatedUser, JwtKeys},
        config::Config,
        db::PgPool,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pool: PgPool,
    pub jwt_keys: JwtKeys,
}

impl AppState {
    pub fn new(config: Arc<Config>, pool: PgPool) -> Self {
        let jwt_keys = JwtKeys::new(&config.auth.jwt_secret);
        Self {
            config,
            pool,
            jwt_keys,
        }
    }

    /// Resolves the fixed development user when `auth.bypass_auth` is set.
    pub async fn resolve_bypass_user(&self) -> Result<Option<AuthenticatedUser>, sqlx::Error> {
        if !self.config.auth.bypass_auth {
            return Ok(None);
        }
        let Some(login) = self.config.auth.bypass_login.as_deref() else {
            return Ok(None);
        };

        let employee = sqlx::query_as::<_, Employee>(
            "SELECT * FROM employees WHERE login = $1 AND active",
        )
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;

        Ok(employee.as_ref().map(AuthenticatedUser::from))
    }

    /// Current role and unit of the employee a token was issued to; `None`
    /// once the employee is gone or deactivated.
    pub async fn load_active_user(
        &self,
        employee_id: Uuid,
    ) -> Result<Option<AuthenticatedUser>, sqlx::Error> {
        let employee = sqlx::query_as::<_, Employee>(
            "SELECT * FROM employees WHERE id = $1 AND active",
        )
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(employee.as_ref().map(AuthenticatedUser::from))
    }
}
