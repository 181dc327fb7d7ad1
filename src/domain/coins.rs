//! Drawer counting and change ("troco") calculation in Brazilian Real.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::money::Cents;

const SLOTS: usize = 13;

/// Notes and coins in circulation, largest first, in centavos.
pub const DENOMINATIONS: [i64; SLOTS] = [
    20_000, 10_000, 5_000, 2_000, 1_000, 500, 200, 100, 50, 25, 10, 5, 1,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenominationCount {
    pub value_cents: i64,
    pub quantity: i64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoinError {
    #[error("unsupported denomination: {0} centavos")]
    UnknownDenomination(i64),
    #[error("quantity for {0} centavos cannot be negative")]
    NegativeQuantity(i64),
    #[error("amounts cannot be negative")]
    NegativeAmount,
    #[error("payment of {paid} does not cover {due}")]
    InsufficientPayment { due: Cents, paid: Cents },
    #[error("drawer cannot make change of {0}")]
    CannotMakeChange(Cents),
    #[error("drawer count overflows")]
    Overflow,
    #[error("change of {0} is above what the drawer search accepts")]
    ChangeTooLarge(Cents),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeBreakdown {
    pub change: Cents,
    /// Pieces handed back, largest denomination first.
    pub pieces: Vec<DenominationCount>,
}

/// Quantities indexed like `DENOMINATIONS`.
type Stock = [i64; SLOTS];

fn slot(value_cents: i64) -> Result<usize, CoinError> {
    DENOMINATIONS
        .iter()
        .position(|v| *v == value_cents)
        .ok_or(CoinError::UnknownDenomination(value_cents))
}

fn stock_from(counts: &[DenominationCount]) -> Result<Stock, CoinError> {
    let mut stock = [0_i64; SLOTS];
    for entry in counts {
        if entry.quantity < 0 {
            return Err(CoinError::NegativeQuantity(entry.value_cents));
        }
        let idx = slot(entry.value_cents)?;
        stock[idx] = stock[idx]
            .checked_add(entry.quantity)
            .ok_or(CoinError::Overflow)?;
    }
    Ok(stock)
}

/// Total value of a drawer count. Repeated denominations are summed.
pub fn count(counts: &[DenominationCount]) -> Result<Cents, CoinError> {
    let stock = stock_from(counts)?;
    let mut total = 0_i64;
    for (value, quantity) in DENOMINATIONS.iter().zip(stock.iter()) {
        let subtotal = value.checked_mul(*quantity).ok_or(CoinError::Overflow)?;
        total = total.checked_add(subtotal).ok_or(CoinError::Overflow)?;
    }
    Ok(Cents::from_cents(total))
}

/// Largest change a limited drawer is asked to break down (R$ 100.000,00).
/// The search keeps one bit per centavo and denomination.
pub const MAX_CHANGE_CENTS: i64 = 10_000_000;

/// Change for a cash payment.
///
/// Without `available` the drawer is treated as unlimited and the greedy
/// breakdown is returned. With it, only pieces present in the drawer are
/// used; larger denominations are still preferred.
pub fn change_for(
    due: Cents,
    paid: Cents,
    available: Option<&[DenominationCount]>,
) -> Result<ChangeBreakdown, CoinError> {
    if due.is_negative() || paid.is_negative() {
        return Err(CoinError::NegativeAmount);
    }
    if paid < due {
        return Err(CoinError::InsufficientPayment { due, paid });
    }

    let change = paid - due;
    let picked = match available {
        None => greedy(change.cents()),
        Some(counts) => {
            if change.cents() > MAX_CHANGE_CENTS {
                return Err(CoinError::ChangeTooLarge(change));
            }
            let stock = stock_from(counts)?;
            limited(change.cents(), &stock).ok_or(CoinError::CannotMakeChange(change))?
        }
    };

    let pieces = DENOMINATIONS
        .iter()
        .zip(picked.iter())
        .filter(|(_, quantity)| **quantity > 0)
        .map(|(value, quantity)| DenominationCount {
            value_cents: *value,
            quantity: *quantity,
        })
        .collect();

    Ok(ChangeBreakdown { change, pieces })
}

fn greedy(mut remaining: i64) -> Stock {
    let mut picked = [0_i64; SLOTS];
    for (idx, value) in DENOMINATIONS.iter().enumerate() {
        picked[idx] = remaining / value;
        remaining %= value;
    }
    picked
}

/// Bit set over the amounts `0..=change`.
struct Amounts(Vec<u64>);

impl Amounts {
    fn new(change: usize) -> Self {
        Amounts(vec![0; change / 64 + 1])
    }

    fn get(&self, amount: usize) -> bool {
        self.0[amount / 64] & (1 << (amount % 64)) != 0
    }

    fn set(&mut self, amount: usize) {
        self.0[amount / 64] |= 1 << (amount % 64);
    }
}

/// Bounded change-making over a finite drawer.
///
/// `layers[k]` holds every amount payable with the pieces of slots `k..`.
/// Each layer is built from the next one with a sliding window per residue
/// class, so the work is `O(SLOTS * change)` whatever the quantities. The
/// breakdown then walks from the largest denomination down, taking as many
/// pieces as still leave a payable remainder.
fn limited(change: i64, stock: &Stock) -> Option<Stock> {
    let total = usize::try_from(change).ok()?;
    let capacity = DENOMINATIONS
        .iter()
        .zip(stock.iter())
        .fold(0_i64, |acc, (value, quantity)| {
            acc.saturating_add(value.saturating_mul(*quantity))
        });
    if capacity < change {
        return None;
    }

    let mut layers: Vec<Amounts> = Vec::with_capacity(SLOTS + 1);
    let mut base = Amounts::new(total);
    base.set(0);
    layers.push(base);

    for idx in (0..SLOTS).rev() {
        let below = &layers[layers.len() - 1];
        let mut current = Amounts::new(total);
        let value = DENOMINATIONS[idx] as usize;
        let limit = usize::try_from(stock[idx]).unwrap_or(usize::MAX).min(total / value);

        for residue in 0..value.min(total + 1) {
            let mut window = 0_usize;
            let mut amount = residue;
            let mut steps = 0_usize;
            while amount <= total {
                if below.get(amount) {
                    window += 1;
                }
                if steps > limit {
                    let dropped = amount - (limit + 1) * value;
                    if below.get(dropped) {
                        window -= 1;
                    }
                }
                if window > 0 {
                    current.set(amount);
                }
                amount += value;
                steps += 1;
            }
        }
        layers.push(current);
    }
    // layers[SLOTS - idx] covers slots idx..; flip so it indexes by slot.
    layers.reverse();

    if !layers[0].get(total) {
        return None;
    }

    let mut picked = [0_i64; SLOTS];
    let mut remaining = total;
    for idx in 0..SLOTS {
        let value = DENOMINATIONS[idx] as usize;
        let most = usize::try_from(stock[idx])
            .unwrap_or(usize::MAX)
            .min(remaining / value);
        let take = (0..=most)
            .rev()
            .find(|take| layers[idx + 1].get(remaining - take * value))?;
        picked[idx] = take as i64;
        remaining -= take * value;
    }

    (remaining == 0).then_some(picked)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn piece(value_cents: i64, quantity: i64) -> DenominationCount {
        DenominationCount {
            value_cents,
            quantity,
        }
    }

    #[test]
    fn counts_drawer_and_merges_repeated_entries() {
        let total = count(&[piece(5_000, 2), piece(25, 4), piece(5_000, 1), piece(1, 3)]).unwrap();

        assert_eq!(total, Cents::from_cents(15_103));
    }

    #[test]
    fn count_rejects_unknown_denomination_and_negative_quantity() {
        assert_eq!(
            count(&[piece(300, 1)]),
            Err(CoinError::UnknownDenomination(300))
        );
        assert_eq!(
            count(&[piece(100, -1)]),
            Err(CoinError::NegativeQuantity(100))
        );
    }

    #[test]
    fn greedy_change_with_unlimited_drawer() {
        let breakdown =
            change_for(Cents::from_cents(1_265), Cents::from_cents(5_000), None).unwrap();

        assert_eq!(breakdown.change, Cents::from_cents(3_735));
        assert_eq!(
            breakdown.pieces,
            vec![
                piece(2_000, 1),
                piece(1_000, 1),
                piece(500, 1),
                piece(200, 1),
                piece(25, 1),
                piece(10, 1),
            ]
        );
    }

    #[test]
    fn exact_payment_needs_no_pieces() {
        let breakdown =
            change_for(Cents::from_cents(700), Cents::from_cents(700), None).unwrap();

        assert!(breakdown.change.is_zero());
        assert!(breakdown.pieces.is_empty());
    }

    #[test]
    fn limited_drawer_avoids_greedy_dead_end() {
        // Greedy would take the R$ 50 note and be left unable to pay R$ 10.
        let drawer = [piece(5_000, 1), piece(2_000, 3)];

        let breakdown =
            change_for(Cents::from_cents(4_000), Cents::from_cents(10_000), Some(&drawer[..])).unwrap();

        assert_eq!(breakdown.pieces, vec![piece(2_000, 3)]);
    }

    #[test]
    fn limited_drawer_reports_impossible_change() {
        let drawer = [piece(1_000, 5)];

        let result = change_for(Cents::from_cents(995), Cents::from_cents(2_000), Some(&drawer[..]));

        assert_eq!(
            result,
            Err(CoinError::CannotMakeChange(Cents::from_cents(1_005)))
        );
    }

    #[test]
    fn drawer_without_centavos_fails_fast_on_odd_change() {
        let drawer: Vec<DenominationCount> = DENOMINATIONS
            .iter()
            .filter(|value| **value != 1)
            .map(|value| piece(*value, 10_000))
            .collect();
        let started = std::time::Instant::now();

        let odd = change_for(Cents::zero(), Cents::from_cents(200_001), Some(&drawer[..]));
        let even = change_for(Cents::zero(), Cents::from_cents(200_005), Some(&drawer[..])).unwrap();

        assert_eq!(odd, Err(CoinError::CannotMakeChange(Cents::from_cents(200_001))));
        assert_eq!(even.pieces, vec![piece(20_000, 10), piece(5, 1)]);
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
    }

    #[test]
    fn limited_drawer_respects_quantities_across_slots() {
        // 30 centavos from 25s, 10s and 5s: one 25 leaves 5.
        let drawer = [piece(25, 2), piece(10, 3), piece(5, 1)];

        let breakdown =
            change_for(Cents::from_cents(70), Cents::from_cents(100), Some(&drawer[..])).unwrap();

        assert_eq!(breakdown.pieces, vec![piece(25, 1), piece(5, 1)]);
    }

    #[test]
    fn oversized_change_from_a_drawer_is_refused() {
        let drawer = [piece(20_000, 1_000_000)];

        let result = change_for(
            Cents::zero(),
            Cents::from_cents(MAX_CHANGE_CENTS + 20_000),
            Some(&drawer[..]),
        );

        assert!(matches!(result, Err(CoinError::ChangeTooLarge(_))));
    }

    #[test]
    fn underpayment_is_rejected() {
        let result = change_for(Cents::from_cents(1_000), Cents::from_cents(999), None);

        assert!(matches!(result, Err(CoinError::InsufficientPayment { .. })));
    }
}
