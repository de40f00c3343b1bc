//! Amounts in the EUR reporting currency.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};

/// Rounds half away from zero (banking "half-up") to exactly `dp` decimal
/// places, padding the scale when the value has fewer.
#[must_use]
pub fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(dp);
    rounded
}

/// An amount expressed in EUR, the common reporting currency.
///
/// Arithmetic is exact; rounding only happens where a caller asks for it
/// via [`EurAmount::round_to`]. Serialized as a decimal string so values
/// survive JSON round trips bit-for-bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct EurAmount(#[serde(with = "rust_decimal::serde::str")] Decimal);

impl EurAmount {
    /// Wraps a decimal value as EUR.
    #[must_use]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// EUR zero.
    #[must_use]
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// The underlying decimal value.
    #[must_use]
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// True when the amount is exactly zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// True when the amount is below zero.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Rounds half-up to `dp` decimal places.
    #[must_use]
    pub fn round_to(self, dp: u32) -> Self {
        Self(round_half_up(self.0, dp))
    }

    /// Subtracts `other`, flooring the result at zero.
    #[must_use]
    pub fn saturating_sub(self, other: Self) -> Self {
        if other.0 >= self.0 {
            Self::zero()
        } else {
            Self(self.0 - other.0)
        }
    }

    /// This amount as an unrounded percentage (0-100 scale) of `total`.
    ///
    /// Returns zero when `total` is zero.
    #[must_use]
    pub fn percentage_of(&self, total: EurAmount) -> Decimal {
        if total.is_zero() {
            return Decimal::ZERO;
        }
        self.0 / total.0 * Decimal::ONE_HUNDRED
    }
}

impl From<Decimal> for EurAmount {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl Add for EurAmount {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for EurAmount {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for EurAmount {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Sum for EurAmount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), Add::add)
    }
}

impl<'a> Sum<&'a EurAmount> for EurAmount {
    fn sum<I: Iterator<Item = &'a EurAmount>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl fmt::Display for EurAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} EUR", self.0)
    }
}
