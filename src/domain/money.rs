use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};

/// Signed monetary amount in centavos.
///
/// Amounts cross the API and the database as plain integers; only `Display`
/// renders them as Brazilian Real.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Cents(i64);

impl Cents {
    pub const fn from_cents(cents: i64) -> Self {
        Cents(cents)
    }

    pub const fn zero() -> Self {
        Cents(0)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub const fn abs(self) -> Self {
        Cents(self.0.abs())
    }

    pub fn checked_add(self, rhs: Cents) -> Option<Cents> {
        self.0.checked_add(rhs.0).map(Cents)
    }

    pub fn checked_sub(self, rhs: Cents) -> Option<Cents> {
        self.0.checked_sub(rhs.0).map(Cents)
    }
}

impl From<i64> for Cents {
    fn from(value: i64) -> Self {
        Cents(value)
    }
}

impl Add for Cents {
    type Output = Cents;

    fn add(self, rhs: Cents) -> Cents {
        Cents(self.0 + rhs.0)
    }
}

impl AddAssign for Cents {
    fn add_assign(&mut self, rhs: Cents) {
        self.0 += rhs.0;
    }
}

impl Sub for Cents {
    type Output = Cents;

    fn sub(self, rhs: Cents) -> Cents {
        Cents(self.0 - rhs.0)
    }
}

impl SubAssign for Cents {
    fn sub_assign(&mut self, rhs: Cents) {
        self.0 -= rhs.0;
    }
}

impl Neg for Cents {
    type Output = Cents;

    fn neg(self) -> Cents {
        Cents(-self.0)
    }
}

impl Sum for Cents {
    fn sum<I: Iterator<Item = Cents>>(iter: I) -> Self {
        iter.fold(Cents::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Cents> for Cents {
    fn sum<I: Iterator<Item = &'a Cents>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl fmt::Display for Cents {
    /// Formats as `R$ 1.234,56`; negative amounts carry a leading minus.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.is_negative() { "-" } else { "" };
        let magnitude = self.0.unsigned_abs();
        let reais = (magnitude / 100).to_string();
        let centavos = magnitude % 100;

        let mut grouped = String::with_capacity(reais.len() + reais.len() / 3);
        for (idx, digit) in reais.chars().enumerate() {
            if idx > 0 && (reais.len() - idx) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(digit);
        }

        write!(f, "{sign}R$ {grouped},{centavos:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::Cents;

    #[test]
    fn checked_arithmetic_reports_overflow() {
        let max = Cents::from_cents(i64::MAX);

        assert_eq!(max.checked_sub(Cents::from_cents(-500)), None);
        assert_eq!(max.checked_add(Cents::from_cents(1)), None);
        assert_eq!(
            Cents::from_cents(1_000).checked_sub(Cents::from_cents(1_500)),
            Some(Cents::from_cents(-500))
        );
    }

    #[test]
    fn display_uses_brazilian_separators() {
        assert_eq!(Cents::from_cents(0).to_string(), "R$ 0,00");
        assert_eq!(Cents::from_cents(5).to_string(), "R$ 0,05");
        assert_eq!(Cents::from_cents(123_456).to_string(), "R$ 1.234,56");
        assert_eq!(Cents::from_cents(100_000_000).to_string(), "R$ 1.000.000,00");
    }

    #[test]
    fn display_prefixes_negative_amounts() {
        assert_eq!(Cents::from_cents(-50).to_string(), "-R$ 0,50");
        assert_eq!(Cents::from_cents(-987_654).to_string(), "-R$ 9.876,54");
    }

    #[test]
    fn arithmetic_and_sum() {
        let total: Cents = [1_000, -250, 75].into_iter().map(Cents::from).sum();
        assert_eq!(total, Cents::from_cents(825));
        assert_eq!(-total, Cents::from_cents(-825));
        assert_eq!((total - Cents::from_cents(1_000)).abs(), Cents::from_cents(175));
    }

    #[test]
    fn serializes_as_plain_integer() {
        let json = serde_json::to_value(Cents::from_cents(1_099)).unwrap();
        assert_eq!(json, serde_json::json!(1_099));
    }
}
