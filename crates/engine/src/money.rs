use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::{EngineError, Quantity, util::parse_fixed_point};

/// Basis points in one whole (100%).
pub const BASIS_POINTS: i64 = 10_000;

/// Signed money amount represented as **integer minor units** (cents).
///
/// Use this type for **all** monetary values in the engine (prices, totals,
/// ledger debits/credits, cash counts) to avoid floating-point drift. The
/// `0.01` tolerance of a float ledger becomes an exact equality here.
///
/// # Examples
///
/// ```rust
/// use engine::Money;
///
/// let amount = Money::new(12_34);
/// assert_eq!(amount.minor(), 1234);
/// assert_eq!(amount.to_string(), "12.34");
/// assert_eq!("203.4".parse::<Money>().unwrap().minor(), 20340);
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Creates a new amount from integer minor units.
    #[must_use]
    pub const fn new(minor: i64) -> Self {
        Self(minor)
    }

    /// Creates an amount from whole major units (`Money::major(100)` is 100.00).
    #[must_use]
    pub const fn major(units: i64) -> Self {
        Self(units * 100)
    }

    /// Returns the raw value in minor units.
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Applies a rate expressed in basis points, rounding half away from zero.
    ///
    /// `Money::major(180).apply_rate(1300)` is 23.40.
    #[must_use]
    pub fn apply_rate(self, basis_points: i64) -> Money {
        Money(div_round(
            i128::from(self.0) * i128::from(basis_points),
            i128::from(BASIS_POINTS),
        ))
    }

    /// Multiplies a per-unit price by an integer count; `None` on overflow.
    #[must_use]
    pub fn checked_times(self, count: i64) -> Option<Money> {
        self.0.checked_mul(count).map(Money)
    }

    /// Multiplies a per-unit price by a fractional quantity, rounding half
    /// away from zero; `None` when the product does not fit.
    #[must_use]
    pub fn checked_times_quantity(self, quantity: Quantity) -> Option<Money> {
        let rounded = div_round_wide(
            i128::from(self.0) * i128::from(quantity.milli()),
            i128::from(Quantity::SCALE),
        );
        i64::try_from(rounded).ok().map(Money)
    }

    #[must_use]
    pub fn min(self, other: Money) -> Money {
        if self <= other { self } else { other }
    }

    #[must_use]
    pub fn max(self, other: Money) -> Money {
        if self >= other { self } else { other }
    }

    #[must_use]
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    /// Sums amounts; `None` as soon as the running total overflows.
    pub fn checked_sum(amounts: impl IntoIterator<Item = Money>) -> Option<Money> {
        amounts
            .into_iter()
            .try_fold(Money::ZERO, |total, amount| total.checked_add(amount))
    }
}

/// Integer division rounding half away from zero, saturating at the i64 range.
pub(crate) fn div_round(numerator: i128, denominator: i128) -> i64 {
    let rounded = div_round_wide(numerator, denominator);
    i64::try_from(rounded).unwrap_or(if rounded < 0 { i64::MIN } else { i64::MAX })
}

fn div_round_wide(numerator: i128, denominator: i128) -> i128 {
    let half = denominator / 2;
    if (numerator < 0) != (denominator < 0) {
        (numerator - half) / denominator
    } else {
        (numerator + half) / denominator
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Money> for i64 {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl FromStr for Money {
    type Err = EngineError;

    /// Parses a decimal string into minor units.
    ///
    /// Accepts `.` or `,` as decimal separator and an optional leading sign;
    /// rejects more than 2 fractional digits.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_fixed_point(s, 2, "amount").map(Money)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_two_decimals() {
        assert_eq!(Money::new(0).to_string(), "0.00");
        assert_eq!(Money::new(1).to_string(), "0.01");
        assert_eq!(Money::new(1050).to_string(), "10.50");
        assert_eq!(Money::new(-1050).to_string(), "-10.50");
    }

    #[test]
    fn parse_accepts_dot_or_comma() {
        assert_eq!("10".parse::<Money>().unwrap().minor(), 1000);
        assert_eq!("10,5".parse::<Money>().unwrap().minor(), 1050);
        assert_eq!("-0.01".parse::<Money>().unwrap().minor(), -1);
        assert!("12.345".parse::<Money>().is_err());
    }

    #[test]
    fn apply_rate_rounds_half_away_from_zero() {
        assert_eq!(Money::major(180).apply_rate(1300), Money::new(2340));
        assert_eq!(Money::new(5).apply_rate(1000), Money::new(1));
        assert_eq!(Money::new(4).apply_rate(1000), Money::new(0));
        assert_eq!(Money::new(-5).apply_rate(1000), Money::new(-1));
    }

    #[test]
    fn times_quantity_scales_unit_price() {
        let unit = Money::major(10);
        assert_eq!(
            unit.checked_times_quantity(Quantity::units(50)),
            Some(Money::major(500))
        );
        assert_eq!(
            unit.checked_times_quantity(Quantity::new(250)),
            Some(Money::new(250))
        );
    }

    #[test]
    fn products_that_do_not_fit_are_none() {
        assert_eq!(Money::major(100).checked_times(3), Some(Money::major(300)));
        assert_eq!(Money::major(100).checked_times(i64::MAX / 100), None);
        assert_eq!(
            Money::major(100).checked_times_quantity(Quantity::new(i64::MAX)),
            None
        );
    }

    #[test]
    fn checked_sum_stops_at_overflow() {
        assert_eq!(
            Money::checked_sum([Money::new(1), Money::new(2)]),
            Some(Money::new(3))
        );
        assert_eq!(
            Money::checked_sum([Money::new(i64::MAX), Money::new(i64::MAX), Money::new(3)]),
            None
        );
    }
}
