//! Cash register ("caixa") lifecycle.
//!
//! A unit opens one register per business day with a drawer float. Movements
//! are recorded against it while it is open, and closing it freezes the
//! expected cash, the counted cash, and their difference.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, NoneAsEmptyString};
use sqlx::PgExecutor;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    domain::{
        coins::{self, DenominationCount},
        models::{CashRegister, RegisterStatus},
        money::Cents,
        period::business_date,
        summary::{expected_cash, summarize, MovementSummary},
    },
    infrastructure::{auth::AuthenticatedUser, state::AppState},
};

use super::{
    access::{ensure_unit_access, scoped_unit},
    errors::ServiceError,
    movements::register_movements,
};

#[derive(Debug, Default, Deserialize, Validate)]
pub struct OpenRegisterRequest {
    /// Defaults to the caller's unit.
    pub unit_id: Option<Uuid>,
    #[validate(range(min = 0))]
    pub opening_balance_cents: Option<i64>,
    /// Drawer count; takes precedence over `opening_balance_cents`.
    pub opening_count: Option<Vec<DenominationCount>>,
    pub business_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct CloseRegisterRequest {
    pub count: Option<Vec<DenominationCount>>,
    #[validate(range(min = 0))]
    pub counted_cents: Option<i64>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

#[serde_as]
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterQuery {
    #[serde_as(as = "NoneAsEmptyString")]
    pub unit_id: Option<Uuid>,
    #[serde_as(as = "NoneAsEmptyString")]
    pub status: Option<RegisterStatus>,
    #[serde_as(as = "NoneAsEmptyString")]
    pub from: Option<NaiveDate>,
    #[serde_as(as = "NoneAsEmptyString")]
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct RegisterSummary {
    pub register: CashRegister,
    pub summary: MovementSummary,
    pub expected_cash: Cents,
}

pub struct RegisterService {
    state: Arc<AppState>,
}

impl RegisterService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    pub async fn open(
        &self,
        actor: &AuthenticatedUser,
        payload: OpenRegisterRequest,
    ) -> Result<CashRegister, ServiceError> {
        payload.validate()?;
        let unit_id = payload
            .unit_id
            .or(actor.unit_id)
            .ok_or_else(|| ServiceError::Validation("unit_id is required".into()))?;
        ensure_unit_access(actor, unit_id)?;

        let opening_balance = match (&payload.opening_count, payload.opening_balance_cents) {
            (Some(count), _) => coins::count(count)?,
            (None, Some(cents)) => Cents::from_cents(cents),
            (None, None) => Cents::zero(),
        };
        check_drawer_amount(opening_balance, self.state.config.cash.max_drawer_cents)?;

        let unit_active =
            sqlx::query_scalar::<_, bool>("SELECT active FROM units WHERE id = $1")
                .bind(unit_id)
                .fetch_optional(&self.state.pool)
                .await?
                .ok_or(ServiceError::NotFound)?;
        if !unit_active {
            return Err(ServiceError::Validation("unit is inactive".into()));
        }

        let already_open = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(1) FROM cash_registers WHERE unit_id = $1 AND status = $2",
        )
        .bind(unit_id)
        .bind(RegisterStatus::Open)
        .fetch_one(&self.state.pool)
        .await?;
        if already_open > 0 {
            return Err(ServiceError::Conflict(
                "unit already has an open cash register".into(),
            ));
        }

        let now = Utc::now();
        let date = payload.business_date.unwrap_or_else(|| {
            business_date(now, self.state.config.reports.utc_offset_minutes)
        });

        let register = sqlx::query_as::<_, CashRegister>(
            "INSERT INTO cash_registers (id, unit_id, business_date, status, opening_balance_cents, opened_by, opened_at)
             VALUES ($1,$2,$3,$4,$5,$6,$7)
             RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(unit_id)
        .bind(date)
        .bind(RegisterStatus::Open)
        .bind(opening_balance.cents())
        .bind(actor.employee_id)
        .bind(now)
        .fetch_one(&self.state.pool)
        .await?;

        info!(
            register_id = %register.id,
            unit_id = %unit_id,
            business_date = %register.business_date,
            opening_balance = %opening_balance,
            "cash register opened"
        );
        Ok(register)
    }

    pub async fn list(
        &self,
        actor: &AuthenticatedUser,
        query: RegisterQuery,
    ) -> Result<Vec<CashRegister>, ServiceError> {
        let unit_id = scoped_unit(actor, query.unit_id)?;
        let registers = sqlx::query_as::<_, CashRegister>(
            "SELECT * FROM cash_registers
             WHERE ($1::uuid IS NULL OR unit_id = $1)
               AND ($2::text IS NULL OR status = $2)
               AND ($3::date IS NULL OR business_date >= $3)
               AND ($4::date IS NULL OR business_date <= $4)
             ORDER BY business_date DESC, opened_at DESC",
        )
        .bind(unit_id)
        .bind(query.status)
        .bind(query.from)
        .bind(query.to)
        .fetch_all(&self.state.pool)
        .await?;
        Ok(registers)
    }

    pub async fn get(
        &self,
        actor: &AuthenticatedUser,
        id: Uuid,
    ) -> Result<CashRegister, ServiceError> {
        let register = fetch_register(&self.state.pool, id, RegisterLock::Unlocked).await?;
        ensure_unit_access(actor, register.unit_id)?;
        Ok(register)
    }

    pub async fn close(
        &self,
        actor: &AuthenticatedUser,
        id: Uuid,
        payload: CloseRegisterRequest,
    ) -> Result<CashRegister, ServiceError> {
        payload.validate()?;
        let counted = match (&payload.count, payload.counted_cents) {
            (Some(count), _) => coins::count(count)?,
            (None, Some(cents)) => Cents::from_cents(cents),
            (None, None) => {
                return Err(ServiceError::Validation(
                    "closing requires a drawer count or counted_cents".into(),
                ))
            }
        };
        check_drawer_amount(counted, self.state.config.cash.max_drawer_cents)?;

        let mut tx = self.state.pool.begin().await?;
        let register = fetch_register(&mut *tx, id, RegisterLock::Exclusive).await?;
        ensure_unit_access(actor, register.unit_id)?;
        if !register.is_open() {
            return Err(ServiceError::Conflict("cash register is already closed".into()));
        }

        let movements = register_movements(&mut *tx, register.id).await?;
        let expected = expected_cash(
            Cents::from_cents(register.opening_balance_cents),
            &movements,
        );
        let difference = closing_difference(counted, expected)?;

        let closed = sqlx::query_as::<_, CashRegister>(
            "UPDATE cash_registers
             SET status = $1, closed_by = $2, closed_at = $3,
                 counted_cents = $4, expected_cents = $5, difference_cents = $6, notes = $7
             WHERE id = $8
             RETURNING *",
        )
        .bind(RegisterStatus::Closed)
        .bind(actor.employee_id)
        .bind(Utc::now())
        .bind(counted.cents())
        .bind(expected.cents())
        .bind(difference.cents())
        .bind(payload.notes)
        .bind(register.id)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        if difference.is_zero() {
            info!(register_id = %closed.id, counted = %counted, "cash register closed");
        } else {
            warn!(
                register_id = %closed.id,
                expected = %expected,
                counted = %counted,
                difference = %difference,
                "cash register closed with a drawer difference"
            );
        }
        Ok(closed)
    }

    pub async fn summary(
        &self,
        actor: &AuthenticatedUser,
        id: Uuid,
    ) -> Result<RegisterSummary, ServiceError> {
        let register = self.get(actor, id).await?;
        let movements = register_movements(&self.state.pool, register.id).await?;
        let expected = expected_cash(
            Cents::from_cents(register.opening_balance_cents),
            &movements,
        );
        Ok(RegisterSummary {
            summary: summarize(&movements),
            expected_cash: expected,
            register,
        })
    }
}

/// Row lock taken when reading a register inside a transaction. Recording
/// takes `Shared` so concurrent sales don't block each other; closing takes
/// `Exclusive` and therefore waits for in-flight sales, and they for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RegisterLock {
    Unlocked,
    Shared,
    Exclusive,
}

pub(crate) async fn fetch_register<'e, E>(
    executor: E,
    id: Uuid,
    lock: RegisterLock,
) -> Result<CashRegister, ServiceError>
where
    E: PgExecutor<'e>,
{
    let sql = match lock {
        RegisterLock::Unlocked => "SELECT * FROM cash_registers WHERE id = $1",
        RegisterLock::Shared => "SELECT * FROM cash_registers WHERE id = $1 FOR SHARE",
        RegisterLock::Exclusive => "SELECT * FROM cash_registers WHERE id = $1 FOR UPDATE",
    };
    sqlx::query_as::<_, CashRegister>(sql)
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or(ServiceError::NotFound)
}

fn check_drawer_amount(amount: Cents, max_cents: i64) -> Result<(), ServiceError> {
    if amount.is_negative() || amount.cents() > max_cents {
        return Err(ServiceError::Validation(format!(
            "drawer amount must be between 0 and {max_cents}"
        )));
    }
    Ok(())
}

fn closing_difference(counted: Cents, expected: Cents) -> Result<Cents, ServiceError> {
    counted
        .checked_sub(expected)
        .ok_or_else(|| ServiceError::Validation("drawer difference is out of range".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drawer_amounts_are_bounded() {
        let max = 100_000_000;

        assert!(check_drawer_amount(Cents::zero(), max).is_ok());
        assert!(check_drawer_amount(Cents::from_cents(max), max).is_ok());
        assert!(matches!(
            check_drawer_amount(Cents::from_cents(i64::MAX), max),
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            check_drawer_amount(Cents::from_cents(-1), max),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn difference_is_counted_minus_expected_without_overflow() {
        assert_eq!(
            closing_difference(Cents::from_cents(14_900), Cents::from_cents(15_000)).unwrap(),
            Cents::from_cents(-100)
        );
        assert!(matches!(
            closing_difference(Cents::from_cents(i64::MAX), Cents::from_cents(-500)),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn negative_counted_cents_fail_request_validation() {
        let payload: CloseRegisterRequest =
            serde_json::from_value(serde_json::json!({ "counted_cents": -1 })).unwrap();

        assert!(payload.validate().is_err());
    }
}
