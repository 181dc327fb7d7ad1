use std::sync::Arc;

use axum::{
    async_trait, extract::FromRequestParts, http::request::Parts, response::IntoResponse, Json,
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

use crate::{
    domain::models::{Employee, Role},
    infrastructure::state::AppState,
    services::errors::ServiceError,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub unit: Option<Uuid>,
    pub exp: usize,
}

#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
}

impl JwtKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

pub fn issue_token(state: &AppState, employee: &Employee) -> Result<String, ServiceError> {
    let expiration = chrono::Utc::now()
        + chrono::Duration::from_std(state.config.jwt_ttl())
            .map_err(|_| ServiceError::Internal("failed to calculate expiration".into()))?;
    let claims = Claims {
        sub: employee.id,
        role: employee.role,
        unit: employee.unit_id,
        exp: expiration.timestamp() as usize,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &state.jwt_keys.encoding,
    )
    .map_err(|err| ServiceError::Internal(err.to_string()))
}

/// Compares a login credential with the configured one without leaking the
/// position of the first mismatch. An empty configured credential never
/// matches.
pub fn credential_matches(expected: &str, provided: &str) -> bool {
    !expected.is_empty() && bool::from(expected.as_bytes().ct_eq(provided.as_bytes()))
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing authorization header")]
    Missing,
    #[error("invalid authorization token")]
    Invalid,
    #[error("missing application state")]
    MissingState,
    #[error("employee is unknown or inactive")]
    InactiveEmployee,
    #[error("employee lookup failed")]
    Unavailable,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;
        let (status, message) = match self {
            AuthError::Missing => (StatusCode::UNAUTHORIZED, "missing authorization header"),
            AuthError::Invalid => (StatusCode::UNAUTHORIZED, "invalid authorization token"),
            AuthError::MissingState => {
                (StatusCode::UNAUTHORIZED, "application state unavailable")
            }
            AuthError::InactiveEmployee => (StatusCode::UNAUTHORIZED, "employee is inactive"),
            AuthError::Unavailable => {
                (StatusCode::SERVICE_UNAVAILABLE, "authentication unavailable")
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[derive(Clone, Debug)]
pub struct AuthenticatedUser {
    pub employee_id: Uuid,
    pub role: Role,
    pub unit_id: Option<Uuid>,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&Employee> for AuthenticatedUser {
    fn from(employee: &Employee) -> Self {
        Self {
            employee_id: employee.id,
            role: employee.role,
            unit_id: employee.unit_id,
        }
    }
}

#[async_trait]
impl FromRequestParts<()> for AuthenticatedUser {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &()) -> Result<Self, Self::Rejection> {
        let Some(state) = parts.extensions.get::<Arc<AppState>>() else {
            return Err(AuthError::MissingState);
        };

        match state.resolve_bypass_user().await {
            Ok(Some(user)) => return Ok(user),
            Ok(None) => {}
            Err(err) => {
                warn!(error = ?err, "failed to resolve bypass user");
            }
        }

        let Some(header_value) = parts.headers.get(axum::http::header::AUTHORIZATION) else {
            return Err(AuthError::Missing);
        };
        let header_str = header_value.to_str().map_err(|_| AuthError::Invalid)?;
        let token = header_str
            .strip_prefix("Bearer ")
            .ok_or(AuthError::Invalid)?;
        let validation = Validation::new(Algorithm::HS256);
        let claims = match decode::<Claims>(token, &state.jwt_keys.decoding, &validation) {
            Ok(data) => data.claims,
            Err(err) => {
                warn!(error = ?err, "failed to decode jwt");
                return Err(AuthError::Invalid);
            }
        };

        if !state.config.auth.recheck_employee {
            return Ok(AuthenticatedUser {
                employee_id: claims.sub,
                role: claims.role,
                unit_id: claims.unit,
            });
        }
        match state.load_active_user(claims.sub).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => {
                warn!(employee_id = %claims.sub, "token presented for inactive employee");
                Err(AuthError::InactiveEmployee)
            }
            Err(err) => {
                error!(error = ?err, "failed to load token employee");
                Err(AuthError::Unavailable)
            }
        }
    }
}
