use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{
    coins::{self, ChangeBreakdown, DenominationCount},
    money::Cents,
};

use super::errors::ServiceError;

#[derive(Debug, Deserialize)]
pub struct CountRequest {
    pub denominations: Vec<DenominationCount>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct CountResponse {
    pub total: Cents,
    pub pieces: i64,
}

#[derive(Debug, Deserialize)]
pub struct ChangeRequest {
    pub due_cents: i64,
    pub paid_cents: i64,
    /// Drawer contents; omitted means an unlimited drawer.
    pub available: Option<Vec<DenominationCount>>,
}

/// Till helpers. Nothing here touches the database.
pub fn count_drawer(payload: &CountRequest) -> Result<CountResponse, ServiceError> {
    let total = coins::count(&payload.denominations)?;
    let pieces = payload
        .denominations
        .iter()
        .try_fold(0_i64, |acc, entry| acc.checked_add(entry.quantity))
        .ok_or_else(|| ServiceError::Validation("drawer count overflows".into()))?;
    Ok(CountResponse { total, pieces })
}

/// `max_cents` caps the payment; it is the same limit a single movement has.
pub fn make_change(payload: &ChangeRequest, max_cents: i64) -> Result<ChangeBreakdown, ServiceError> {
    if payload.paid_cents > max_cents || payload.due_cents > max_cents {
        return Err(ServiceError::Validation(format!(
            "amounts must not exceed {max_cents}"
        )));
    }
    let breakdown = coins::change_for(
        Cents::from_cents(payload.due_cents),
        Cents::from_cents(payload.paid_cents),
        payload.available.as_deref(),
    )?;
    debug!(change = %breakdown.change, pieces = breakdown.pieces.len(), "change computed");
    Ok(breakdown)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: i64 = 10_000_000;

    fn piece(value_cents: i64, quantity: i64) -> DenominationCount {
        DenominationCount {
            value_cents,
            quantity,
        }
    }

    #[test]
    fn counts_value_and_pieces() {
        let response = count_drawer(&CountRequest {
            denominations: vec![piece(5_000, 2), piece(100, 3), piece(25, 4)],
        })
        .unwrap();

        assert_eq!(
            response,
            CountResponse {
                total: Cents::from_cents(10_400),
                pieces: 9,
            }
        );
    }

    #[test]
    fn unknown_denomination_is_a_validation_error() {
        let err = count_drawer(&CountRequest {
            denominations: vec![piece(300, 1)],
        })
        .unwrap_err();

        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn change_uses_the_drawer_when_given() {
        let breakdown = make_change(&ChangeRequest {
            due_cents: 1_350,
            paid_cents: 2_000,
            available: Some(vec![piece(500, 0), piece(200, 5), piece(50, 2)]),
        }, MAX)
        .unwrap();

        assert_eq!(breakdown.change, Cents::from_cents(650));
        assert_eq!(breakdown.pieces, vec![piece(200, 3), piece(50, 1)]);
    }

    #[test]
    fn short_payment_is_rejected() {
        let err = make_change(&ChangeRequest {
            due_cents: 1_000,
            paid_cents: 500,
            available: None,
        }, MAX)
        .unwrap_err();

        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn payments_above_the_movement_cap_are_rejected() {
        let err = make_change(&ChangeRequest {
            due_cents: 0,
            paid_cents: MAX + 1,
            available: Some(vec![piece(5, 1_000_000)]),
        }, MAX)
        .unwrap_err();

        assert!(matches!(err, ServiceError::Validation(message) if message.contains("must not exceed")));
    }
}
