//! Monetary amounts using decimal arithmetic.
//!
//! All prices and totals in Colibrí are [`Money`] values. Amounts are stored
//! in the currency's standard unit (pesos, not centavos) and must never be
//! represented as floats.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, AddAssign, Sub};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A monetary amount with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money {
    /// Amount in the currency's standard unit (e.g., pesos, not centavos).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency: CurrencyCode,
}

impl Money {
    /// Create a new amount.
    #[must_use]
    pub const fn new(amount: Decimal, currency: CurrencyCode) -> Self {
        Self { amount, currency }
    }

    /// Create an MXN amount (the storefront's operating currency).
    #[must_use]
    pub const fn mxn(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::MXN)
    }

    /// Create an MXN amount from centavos.
    #[must_use]
    pub fn from_centavos(centavos: i64) -> Self {
        Self::mxn(Decimal::new(centavos, 2))
    }

    /// The amount in the smallest currency unit (centavos/cents), as used by
    /// payment gateways.
    #[must_use]
    pub fn as_minor_units(&self) -> i64 {
        use rust_decimal::prelude::ToPrimitive;
        (self.amount * Decimal::from(100))
            .round()
            .to_i64()
            .unwrap_or(0)
    }

    /// A zero MXN amount.
    #[must_use]
    pub fn zero() -> Self {
        Self::mxn(Decimal::ZERO)
    }

    /// Whether this amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        debug_assert_eq!(self.currency, rhs.currency, "currency mismatch");
        Self::new(self.amount + rhs.amount, self.currency)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        debug_assert_eq!(self.currency, rhs.currency, "currency mismatch");
        Self::new(self.amount - rhs.amount, self.currency)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:.2}", self.currency.symbol(), self.amount)
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    MXN,
    USD,
}

impl CurrencyCode {
    /// Currency symbol for display.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::MXN | Self::USD => "$",
        }
    }

    /// ISO 4217 code string.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MXN => "MXN",
            Self::USD => "USD",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_mxn_display() {
        let price = Money::mxn(dec!(499.90));
        assert_eq!(price.to_string(), "$499.90");
    }

    #[test]
    fn test_from_centavos() {
        let price = Money::from_centavos(12_345);
        assert_eq!(price.amount, dec!(123.45));
    }

    #[test]
    fn test_as_minor_units() {
        assert_eq!(Money::mxn(dec!(123.45)).as_minor_units(), 12_345);
        assert_eq!(Money::zero().as_minor_units(), 0);
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::mxn(dec!(100.50));
        let b = Money::mxn(dec!(49.50));
        assert_eq!((a + b).amount, dec!(150.00));
        assert_eq!((a - b).amount, dec!(51.00));
    }

    #[test]
    fn test_sum() {
        let total: Money = [dec!(1.10), dec!(2.20), dec!(3.30)]
            .into_iter()
            .map(Money::mxn)
            .sum();
        assert_eq!(total.amount, dec!(6.60));
    }
}
