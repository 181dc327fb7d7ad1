//! Movement aggregation for register, unit and period reports.
//!
//! Every figure is produced by one pass over the movements: outflows are
//! negated, and each amount is bucketed by payment status and by payment
//! method. The same routine backs the register summary, the per-unit report
//! rows and the per-day/per-month report buckets.

use serde::Serialize;

use crate::domain::{
    models::{Movement, MovementDirection, PaymentMethod, PaymentStatus},
    money::Cents,
};

/// Totals for one payment method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MethodTotal {
    pub method: PaymentMethod,
    pub inflow: Cents,
    pub outflow: Cents,
    pub net: Cents,
    pub count: u32,
}

impl MethodTotal {
    fn empty(method: PaymentMethod) -> Self {
        Self {
            method,
            inflow: Cents::zero(),
            outflow: Cents::zero(),
            net: Cents::zero(),
            count: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovementSummary {
    pub count: u32,
    /// Unsigned sum of inflows.
    pub total_in: Cents,
    /// Unsigned sum of outflows.
    pub total_out: Cents,
    /// Signed sum of settled movements.
    pub realized: Cents,
    /// Signed sum of movements still awaiting settlement.
    pub pending: Cents,
    /// Signed sum of every movement.
    pub grand_total: Cents,
    /// One row per payment method that occurs, in `PaymentMethod::ALL` order.
    pub by_method: Vec<MethodTotal>,
}

impl Default for MovementSummary {
    fn default() -> Self {
        summarize(std::iter::empty())
    }
}

pub fn summarize<'a, I>(movements: I) -> MovementSummary
where
    I: IntoIterator<Item = &'a Movement>,
{
    let mut methods: Vec<MethodTotal> = PaymentMethod::ALL
        .iter()
        .copied()
        .map(MethodTotal::empty)
        .collect();
    let mut count = 0_u32;
    let mut total_in = Cents::zero();
    let mut total_out = Cents::zero();
    let mut realized = Cents::zero();
    let mut pending = Cents::zero();

    for movement in movements {
        let amount = Cents::from_cents(movement.amount_cents);
        let signed = movement.signed_amount();
        let bucket = &mut methods[movement.payment_method.index()];

        match movement.direction {
            MovementDirection::Inflow => {
                total_in += amount;
                bucket.inflow += amount;
            }
            MovementDirection::Outflow => {
                total_out += amount;
                bucket.outflow += amount;
            }
        }
        bucket.net += signed;
        bucket.count += 1;

        match movement.payment_status {
            PaymentStatus::Realized => realized += signed,
            PaymentStatus::Pending => pending += signed,
        }
        count += 1;
    }

    methods.retain(|total| total.count > 0);

    MovementSummary {
        count,
        total_in,
        total_out,
        realized,
        pending,
        grand_total: realized + pending,
        by_method: methods,
    }
}

/// Cash the drawer should hold: the opening balance plus every settled cash
/// movement. Pending cash has not physically changed hands yet.
pub fn expected_cash<'a, I>(opening_balance: Cents, movements: I) -> Cents
where
    I: IntoIterator<Item = &'a Movement>,
{
    opening_balance
        + movements
            .into_iter()
            .filter(|m| {
                m.payment_method == PaymentMethod::Cash
                    && m.payment_status == PaymentStatus::Realized
            })
            .map(Movement::signed_amount)
            .sum::<Cents>()
}
