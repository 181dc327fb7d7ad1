//! Role and unit scoping shared by every service.
//!
//! Admins see every unit. Managers and operators are bound to the unit in
//! their token and are refused anything outside it.

use uuid::Uuid;

use crate::{domain::models::Role, infrastructure::auth::AuthenticatedUser};

use super::errors::ServiceError;

pub fn ensure_role(user: &AuthenticatedUser, allowed: &[Role]) -> Result<(), ServiceError> {
    if allowed.iter().any(|r| r == &user.role) {
        Ok(())
    } else {
        Err(ServiceError::Forbidden)
    }
}

pub fn ensure_unit_access(user: &AuthenticatedUser, unit_id: Uuid) -> Result<(), ServiceError> {
    if user.is_admin() || user.unit_id == Some(unit_id) {
        Ok(())
    } else {
        Err(ServiceError::Forbidden)
    }
}

/// Resolves the unit filter for a listing. Admins get what they asked for
/// (`None` meaning every unit); everyone else is pinned to their own unit.
pub fn scoped_unit(
    user: &AuthenticatedUser,
    requested: Option<Uuid>,
) -> Result<Option<Uuid>, ServiceError> {
    if user.is_admin() {
        return Ok(requested);
    }
    let own = user.unit_id.ok_or(ServiceError::Forbidden)?;
    match requested {
        Some(unit_id) if unit_id != own => Err(ServiceError::Forbidden),
        _ => Ok(Some(own)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role, unit_id: Option<Uuid>) -> AuthenticatedUser {
        AuthenticatedUser {
            employee_id: Uuid::new_v4(),
            role,
            unit_id,
        }
    }

    #[test]
    fn admin_scope_passes_request_through() {
        let admin = user(Role::Admin, None);
        let unit = Uuid::new_v4();

        assert_eq!(scoped_unit(&admin, None).unwrap(), None);
        assert_eq!(scoped_unit(&admin, Some(unit)).unwrap(), Some(unit));
        assert!(ensure_unit_access(&admin, unit).is_ok());
    }

    #[test]
    fn manager_is_pinned_to_own_unit() {
        let own = Uuid::new_v4();
        let manager = user(Role::Manager, Some(own));

        assert_eq!(scoped_unit(&manager, None).unwrap(), Some(own));
        assert_eq!(scoped_unit(&manager, Some(own)).unwrap(), Some(own));
        assert!(matches!(
            scoped_unit(&manager, Some(Uuid::new_v4())),
            Err(ServiceError::Forbidden)
        ));
        assert!(ensure_unit_access(&manager, Uuid::new_v4()).is_err());
    }

    #[test]
    fn unitless_operator_is_refused() {
        let operator = user(Role::Operator, None);

        assert!(matches!(
            scoped_unit(&operator, None),
            Err(ServiceError::Forbidden)
        ));
        assert!(ensure_role(&operator, &[Role::Manager, Role::Admin]).is_err());
    }
}
