//! Monetary amounts and percentage discounts.
//!
//! Amounts are `Decimal` in the major unit (rupees, dollars). The payment
//! gateway wants integer minor units (paise, cents), which
//! [`Money::to_minor_units`] produces by truncation.

use std::fmt;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Errors for money arithmetic and validation.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    #[error("amount cannot be negative: {0}")]
    Negative(Decimal),
    #[error("amount {0} does not fit in minor units")]
    Overflow(Decimal),
    #[error("discount must be between 0 and 100, got {0}")]
    InvalidDiscount(i64),
}

/// ISO 4217 currency accepted by the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Inr,
    Usd,
    Eur,
    Gbp,
}

impl Currency {
    /// Three-letter currency code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Inr => "INR",
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
        }
    }

    /// Display symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Inr => "₹",
            Self::Usd => "$",
            Self::Eur => "€",
            Self::Gbp => "£",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "INR" => Ok(Self::Inr),
            "USD" => Ok(Self::Usd),
            "EUR" => Ok(Self::Eur),
            "GBP" => Ok(Self::Gbp),
            _ => Err(format!("unsupported currency: {s}")),
        }
    }
}

/// A non-negative amount in a specific currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

impl Money {
    /// Create a new amount.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Negative`] for amounts below zero.
    pub fn new(amount: Decimal, currency: Currency) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(MoneyError::Negative(amount));
        }
        Ok(Self { amount, currency })
    }

    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.amount
    }

    #[must_use]
    pub const fn currency(&self) -> Currency {
        self.currency
    }

    /// Amount in the currency's minor unit, truncating sub-minor fractions.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Overflow`] when the result exceeds `i64`.
    pub fn to_minor_units(&self) -> Result<i64, MoneyError> {
        self.amount
            .checked_mul(Decimal::ONE_HUNDRED)
            .map(|minor| minor.trunc())
            .and_then(|minor| minor.to_i64())
            .ok_or(MoneyError::Overflow(self.amount))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:.2}", self.currency.symbol(), self.amount)
    }
}

/// Whole-number percentage discount in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Discount(u8);

impl Discount {
    pub const NONE: Self = Self(0);

    /// Validate a percentage.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::InvalidDiscount`] outside `0..=100`.
    pub fn new(percent: i64) -> Result<Self, MoneyError> {
        u8::try_from(percent)
            .ok()
            .filter(|p| *p <= 100)
            .map(Self)
            .ok_or(MoneyError::InvalidDiscount(percent))
    }

    #[must_use]
    pub const fn percent(self) -> u8 {
        self.0
    }

    /// `price * (1 - percent / 100)`, rounded to cents.
    #[must_use]
    pub fn apply(self, price: Decimal) -> Decimal {
        let remaining = Decimal::ONE_HUNDRED - Decimal::from(self.0);
        (price * remaining / Decimal::ONE_HUNDRED).round_dp(2)
    }
}

impl<'de> Deserialize<'de> for Discount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let percent = i64::deserialize(deserializer)?;
        Self::new(percent).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_minor_units() {
        let total = Money::new(dec("599.50"), Currency::Inr).unwrap();
        assert_eq!(total.to_minor_units().unwrap(), 59_950);
    }

    #[test]
    fn test_minor_units_truncates() {
        let odd = Money::new(dec("10.999"), Currency::Inr).unwrap();
        assert_eq!(odd.to_minor_units().unwrap(), 1099);
    }

    #[test]
    fn test_negative_rejected() {
        assert_eq!(
            Money::new(dec("-1"), Currency::Usd),
            Err(MoneyError::Negative(dec("-1")))
        );
        assert!(Money::new(Decimal::ZERO, Currency::Usd).is_ok());
    }

    #[test]
    fn test_overflow() {
        let huge = Money::new(Decimal::MAX, Currency::Inr).unwrap();
        assert!(matches!(huge.to_minor_units(), Err(MoneyError::Overflow(_))));
    }

    #[test]
    fn test_discount_bounds() {
        assert!(Discount::new(0).is_ok());
        assert!(Discount::new(100).is_ok());
        assert_eq!(Discount::new(101), Err(MoneyError::InvalidDiscount(101)));
        assert_eq!(Discount::new(-5), Err(MoneyError::InvalidDiscount(-5)));
    }

    #[test]
    fn test_discount_apply() {
        assert_eq!(Discount::new(20).unwrap().apply(dec("1000")), dec("800.00"));
        assert_eq!(Discount::new(15).unwrap().apply(dec("333.33")), dec("283.33"));
        assert_eq!(Discount::new(100).unwrap().apply(dec("49.99")), Decimal::ZERO);
        assert_eq!(Discount::NONE.apply(dec("49.99")), dec("49.99"));
    }

    #[test]
    fn test_discount_deserialize_validates() {
        assert!(serde_json::from_str::<Discount>("30").is_ok());
        assert!(serde_json::from_str::<Discount>("130").is_err());
    }

    #[test]
    fn test_currency_parse() {
        assert_eq!("inr".parse::<Currency>().unwrap(), Currency::Inr);
        assert!("JPY".parse::<Currency>().is_err());
        assert_eq!(Money::new(dec("5"), Currency::Inr).unwrap().to_string(), "₹5.00");
    }
}
