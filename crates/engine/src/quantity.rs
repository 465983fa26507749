use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::{EngineError, util::parse_fixed_point};

/// Signed stock quantity in **milli-units** of the ingredient's unit.
///
/// `Quantity::new(250)` is 0.250 kg for an ingredient measured in kg, or a
/// quarter of a piece. Stock arithmetic never touches floats, so replaying
/// the movement history reproduces the stored stock exactly.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Quantity(i64);

impl Quantity {
    pub const ZERO: Quantity = Quantity(0);
    /// Milli-units per whole unit.
    pub const SCALE: i64 = 1_000;

    #[must_use]
    pub const fn new(milli: i64) -> Self {
        Self(milli)
    }

    /// Whole units (`Quantity::units(15)` is 15.000).
    #[must_use]
    pub const fn units(units: i64) -> Self {
        Self(units * Self::SCALE)
    }

    #[must_use]
    pub const fn milli(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Scales a per-unit quantity by an integer multiplier (order line count).
    #[must_use]
    pub fn checked_times(self, multiplier: i64) -> Option<Quantity> {
        self.0.checked_mul(multiplier).map(Quantity)
    }

    #[must_use]
    pub fn checked_add(self, rhs: Quantity) -> Option<Quantity> {
        self.0.checked_add(rhs.0).map(Quantity)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let whole = abs / Self::SCALE.unsigned_abs();
        let frac = abs % Self::SCALE.unsigned_abs();
        if frac == 0 {
            write!(f, "{sign}{whole}")
        } else {
            let frac = format!("{frac:03}");
            write!(f, "{sign}{whole}.{}", frac.trim_end_matches('0'))
        }
    }
}

impl Add for Quantity {
    type Output = Quantity;

    fn add(self, rhs: Quantity) -> Self::Output {
        Quantity(self.0 + rhs.0)
    }
}

impl AddAssign for Quantity {
    fn add_assign(&mut self, rhs: Quantity) {
        self.0 += rhs.0;
    }
}

impl Sub for Quantity {
    type Output = Quantity;

    fn sub(self, rhs: Quantity) -> Self::Output {
        Quantity(self.0 - rhs.0)
    }
}

impl Neg for Quantity {
    type Output = Quantity;

    fn neg(self) -> Self::Output {
        Quantity(-self.0)
    }
}

impl Sum for Quantity {
    fn sum<I: Iterator<Item = Quantity>>(iter: I) -> Self {
        iter.fold(Quantity::ZERO, Add::add)
    }
}

impl FromStr for Quantity {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_fixed_point(s, 3, "quantity").map(Quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_trims_trailing_zeros() {
        assert_eq!(Quantity::units(15).to_string(), "15");
        assert_eq!(Quantity::new(250).to_string(), "0.25");
        assert_eq!(Quantity::new(-1005).to_string(), "-1.005");
    }

    #[test]
    fn parse_up_to_three_decimals() {
        assert_eq!("1.5".parse::<Quantity>().unwrap(), Quantity::new(1500));
        assert_eq!("0,125".parse::<Quantity>().unwrap(), Quantity::new(125));
        assert!("0.0001".parse::<Quantity>().is_err());
    }

    #[test]
    fn checked_arithmetic_reports_overflow() {
        assert_eq!(Quantity::new(250).checked_times(3), Some(Quantity::new(750)));
        assert_eq!(Quantity::new(250).checked_times(i64::MAX), None);
        assert_eq!(Quantity::new(i64::MAX).checked_add(Quantity::new(1)), None);
    }
}
