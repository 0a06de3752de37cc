//! Money in the shop's smallest currency unit.

use core::iter::Sum;
use core::ops::{Add, AddAssign, Sub};

use serde::{Deserialize, Serialize};

use crate::value_object::ValueObject;

/// Amount in centavos.
///
/// Totals, paid amounts and unit price snapshots all use this type so that
/// `quantity × unit_price` aggregation stays exact.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl ValueObject for Money {}

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    pub const fn minor(self) -> i64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Line total for `quantity` units at this unit price.
    ///
    /// Only for amounts already checked with [`Money::checked_times`].
    pub fn times(self, quantity: i64) -> Money {
        Money(self.0 * quantity)
    }

    /// `None` when the product leaves the i64 range.
    pub fn checked_times(self, quantity: i64) -> Option<Money> {
        self.0.checked_mul(quantity).map(Money)
    }

    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
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

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn displays_with_two_decimals() {
        assert_eq!(Money::from_minor(50_000).to_string(), "500.00");
        assert_eq!(Money::from_minor(5).to_string(), "0.05");
        assert_eq!(Money::from_minor(-1234).to_string(), "-12.34");
    }

    #[test]
    fn times_scales_unit_price() {
        assert_eq!(Money::from_minor(2_500).times(3), Money::from_minor(7_500));
    }

    #[test]
    fn checked_arithmetic_reports_overflow() {
        assert_eq!(Money::from_minor(2).checked_times(1 << 62), None);
        assert_eq!(Money::from_minor(i64::MAX).checked_add(Money::from_minor(1)), None);
        assert_eq!(
            Money::from_minor(2_500).checked_times(3),
            Some(Money::from_minor(7_500))
        );
    }

    proptest! {
        #[test]
        fn sum_matches_raw_sum(values in prop::collection::vec(-1_000_000i64..1_000_000i64, 0..20)) {
            let total: Money = values.iter().map(|v| Money::from_minor(*v)).sum();
            prop_assert_eq!(total.minor(), values.iter().sum::<i64>());
        }
    }
}
