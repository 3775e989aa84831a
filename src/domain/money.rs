//! Money value object
//!
//! An immutable amount expressed in a currency's smallest unit (cents for
//! USD, whole yen for JPY). Decimal input is converted exactly once at the
//! boundary; inside the engine every balance computation is integer
//! arithmetic with explicit overflow checks.

use std::cmp::Ordering;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

use super::currency::{CurrencyCode, CurrencyInfo};

/// A monetary amount in smallest currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    minor: i64,
    currency: CurrencyCode,
}

impl Money {
    /// Build from an amount already expressed in smallest units.
    pub fn from_minor(minor: i64, currency: CurrencyCode) -> Self {
        Self { minor, currency }
    }

    pub fn zero(currency: CurrencyCode) -> Self {
        Self { minor: 0, currency }
    }

    /// Convert a decimal amount into smallest units using the currency's
    /// registered precision.
    ///
    /// Input with more fractional digits than the currency supports is
    /// rejected, never rounded.
    ///
    /// # Errors
    /// - `LedgerError::PrecisionExceeded` on out-of-precision input
    /// - `LedgerError::AmountExceedsMaxSafeInt` if the scaled value leaves
    ///   the signed 64-bit range
    pub fn from_decimal(
        value: Decimal,
        currency: CurrencyCode,
        decimals: u32,
    ) -> LedgerResult<Self> {
        let normalized = value.normalize();
        if normalized.scale() > decimals {
            return Err(LedgerError::PrecisionExceeded { currency, decimals });
        }

        let factor = 10i64
            .checked_pow(decimals)
            .ok_or(LedgerError::AmountExceedsMaxSafeInt)?;
        let minor = normalized
            .checked_mul(Decimal::from(factor))
            .and_then(|scaled| scaled.trunc().to_i64())
            .ok_or(LedgerError::AmountExceedsMaxSafeInt)?;

        Ok(Self { minor, currency })
    }

    pub fn minor(&self) -> i64 {
        self.minor
    }

    pub fn currency(&self) -> CurrencyCode {
        self.currency
    }

    pub fn is_positive(&self) -> bool {
        self.minor > 0
    }

    /// Add another amount of the same currency.
    ///
    /// # Errors
    /// - `LedgerError::CurrencyMismatch` if the currencies differ
    /// - `LedgerError::AmountExceedsMaxSafeInt` on overflow
    pub fn checked_add(&self, other: &Money) -> LedgerResult<Money> {
        self.ensure_same_currency(other)?;
        let minor = self
            .minor
            .checked_add(other.minor)
            .ok_or(LedgerError::AmountExceedsMaxSafeInt)?;
        Ok(Self {
            minor,
            currency: self.currency,
        })
    }

    /// Subtract another amount of the same currency.
    pub fn checked_sub(&self, other: &Money) -> LedgerResult<Money> {
        self.ensure_same_currency(other)?;
        let minor = self
            .minor
            .checked_sub(other.minor)
            .ok_or(LedgerError::AmountExceedsMaxSafeInt)?;
        Ok(Self {
            minor,
            currency: self.currency,
        })
    }

    /// Compare two amounts of the same currency.
    pub fn checked_cmp(&self, other: &Money) -> LedgerResult<Ordering> {
        self.ensure_same_currency(other)?;
        Ok(self.minor.cmp(&other.minor))
    }

    /// Decimal view for display and boundary output. Never feeds back into
    /// balance arithmetic.
    pub fn to_decimal(&self, decimals: u32) -> Decimal {
        Decimal::new(self.minor, decimals)
    }

    /// Human-readable rendering, e.g. `$100.00`.
    pub fn format_with(&self, info: &CurrencyInfo) -> String {
        format!("{}{}", info.symbol, self.to_decimal(info.decimals))
    }

    fn ensure_same_currency(&self, other: &Money) -> LedgerResult<()> {
        if self.currency != other.currency {
            return Err(LedgerError::CurrencyMismatch {
                expected: self.currency,
                actual: other.currency,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn usd() -> CurrencyCode {
        CurrencyCode::new("USD").unwrap()
    }

    fn eur() -> CurrencyCode {
        CurrencyCode::new("EUR").unwrap()
    }

    #[test]
    fn test_from_decimal_to_minor_units() {
        let money = Money::from_decimal(dec!(100.00), usd(), 2).unwrap();
        assert_eq!(money.minor(), 10_000);
        assert_eq!(money.currency(), usd());
    }

    #[test]
    fn test_decimal_round_trip() {
        let money = Money::from_decimal(dec!(123.45), usd(), 2).unwrap();
        assert_eq!(money.to_decimal(2), dec!(123.45));

        let yen = Money::from_decimal(dec!(500), CurrencyCode::new("JPY").unwrap(), 0).unwrap();
        assert_eq!(yen.minor(), 500);
        assert_eq!(yen.to_decimal(0), dec!(500));
    }

    #[test]
    fn test_precision_exceeded_rejected_not_rounded() {
        let result = Money::from_decimal(dec!(1.005), usd(), 2);
        assert!(matches!(
            result,
            Err(LedgerError::PrecisionExceeded { decimals: 2, .. })
        ));
    }

    #[test]
    fn test_trailing_zeros_within_precision() {
        // 1.50 normalizes to scale 1, well inside two decimals
        let money = Money::from_decimal(dec!(1.500), usd(), 2).unwrap();
        assert_eq!(money.minor(), 150);
    }

    #[test]
    fn test_from_decimal_overflow() {
        let result = Money::from_decimal(dec!(99999999999999999999), usd(), 2);
        assert!(matches!(
            result,
            Err(LedgerError::AmountExceedsMaxSafeInt)
        ));
    }

    #[test]
    fn test_checked_add() {
        let a = Money::from_minor(10_000, usd());
        let b = Money::from_minor(5_000, usd());
        assert_eq!(a.checked_add(&b).unwrap().minor(), 15_000);
    }

    #[test]
    fn test_checked_add_currency_mismatch() {
        let a = Money::from_minor(10_000, usd());
        let b = Money::from_minor(5_000, eur());
        assert!(matches!(
            a.checked_add(&b),
            Err(LedgerError::CurrencyMismatch { .. })
        ));
    }

    #[test]
    fn test_checked_add_overflow() {
        let a = Money::from_minor(i64::MAX, usd());
        let b = Money::from_minor(1, usd());
        assert!(matches!(
            a.checked_add(&b),
            Err(LedgerError::AmountExceedsMaxSafeInt)
        ));
    }

    #[test]
    fn test_checked_cmp() {
        let a = Money::from_minor(100, usd());
        let b = Money::from_minor(200, usd());
        assert_eq!(a.checked_cmp(&b).unwrap(), Ordering::Less);

        let c = Money::from_minor(100, eur());
        assert!(a.checked_cmp(&c).is_err());
    }

    #[test]
    fn test_format_with() {
        let info = CurrencyInfo {
            decimals: 2,
            symbol: "$".to_string(),
        };
        let money = Money::from_minor(10_000, usd());
        assert_eq!(money.format_with(&info), "$100.00");
    }
}
