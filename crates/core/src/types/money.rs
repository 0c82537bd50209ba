//! Monetary amounts in minor currency units.
//!
//! Every amount stored or transmitted by Geomancy Shop is an integer count of
//! the currency's smallest denomination (pesewas for GHS, kobo for NGN). The
//! payment gateway expects the same unit, so no scaling happens on the way to
//! it. Major units only appear when parsing human input
//! ([`MinorUnits::from_major_str`]) and when formatting for display
//! ([`MinorUnits::display`]).

use std::iter::Sum;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Errors produced when converting to or from [`MinorUnits`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// The input is not a decimal number.
    #[error("invalid amount: {0}")]
    Invalid(String),
    /// Negative amounts are not representable.
    #[error("amount cannot be negative")]
    Negative,
    /// The input has more fractional digits than the currency allows.
    #[error("amount has more than {max_places} decimal places")]
    TooPrecise {
        /// Decimal places allowed by the currency.
        max_places: u32,
    },
    /// The amount does not fit in 64 bits of minor units.
    #[error("amount overflows")]
    Overflow,
}

/// An amount of money in minor currency units.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MinorUnits(u64);

impl MinorUnits {
    /// Zero.
    pub const ZERO: Self = Self(0);

    /// Wrap a raw minor-unit count.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The raw minor-unit count.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Multiply by a quantity, returning `None` on overflow.
    #[must_use]
    pub fn checked_mul(self, quantity: u32) -> Option<Self> {
        self.0.checked_mul(u64::from(quantity)).map(Self)
    }

    /// Add, returning `None` on overflow.
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    #[must_use]
    pub fn saturating_mul(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(u64::from(quantity)))
    }

    /// Parse an amount written in major units (`"12.50"`) for `currency`.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError`] if the input is not a number, is negative, has
    /// more fractional digits than the currency, or overflows.
    pub fn from_major_str(input: &str, currency: CurrencyCode) -> Result<Self, MoneyError> {
        let value = Decimal::from_str(input.trim())
            .map_err(|_| MoneyError::Invalid(input.to_owned()))?;
        if value.is_sign_negative() && !value.is_zero() {
            return Err(MoneyError::Negative);
        }
        let places = currency.decimal_places();
        if value.normalize().scale() > places {
            return Err(MoneyError::TooPrecise { max_places: places });
        }
        let minor = value
            .checked_mul(Decimal::from(currency.minor_per_major()))
            .ok_or(MoneyError::Overflow)?;
        minor.to_u64().map(Self).ok_or(MoneyError::Overflow)
    }

    /// The amount in major units as an exact decimal.
    #[must_use]
    pub fn to_major(self, currency: CurrencyCode) -> Decimal {
        Decimal::from_i128_with_scale(i128::from(self.0), currency.decimal_places())
    }

    /// Format for display, e.g. `GH₵1,250.00`.
    #[must_use]
    pub fn display(self, currency: CurrencyCode) -> String {
        let places = currency.decimal_places() as usize;
        let major = format!("{:.places$}", self.to_major(currency));
        let (whole, fraction) = major.split_once('.').unwrap_or((major.as_str(), ""));

        let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
        for (i, digit) in whole.chars().enumerate() {
            if i > 0 && (whole.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(digit);
        }

        if fraction.is_empty() {
            format!("{}{grouped}", currency.symbol())
        } else {
            format!("{}{grouped}.{fraction}", currency.symbol())
        }
    }
}

impl From<u64> for MinorUnits {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<MinorUnits> for u64 {
    fn from(value: MinorUnits) -> Self {
        value.0
    }
}

impl std::fmt::Display for MinorUnits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Sum for MinorUnits {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Self::saturating_add)
    }
}

/// ISO 4217 currency codes accepted by the payment gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    GHS,
    NGN,
    KES,
    ZAR,
    USD,
}

impl CurrencyCode {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::GHS => "GH₵",
            Self::NGN => "₦",
            Self::KES => "KSh",
            Self::ZAR => "R",
            Self::USD => "$",
        }
    }

    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::GHS => "GHS",
            Self::NGN => "NGN",
            Self::KES => "KES",
            Self::ZAR => "ZAR",
            Self::USD => "USD",
        }
    }

    /// Number of decimal places between the major and minor unit.
    #[must_use]
    pub const fn decimal_places(self) -> u32 {
        2
    }

    /// Minor units that make up one major unit.
    #[must_use]
    pub const fn minor_per_major(self) -> u64 {
        10_u64.pow(self.decimal_places())
    }
}

impl std::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GHS" => Ok(Self::GHS),
            "NGN" => Ok(Self::NGN),
            "KES" => Ok(Self::KES),
            "ZAR" => Ok(Self::ZAR),
            "USD" => Ok(Self::USD),
            _ => Err(format!("unsupported currency: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_formats_major_units() {
        assert_eq!(MinorUnits::new(1000).display(CurrencyCode::GHS), "GH₵10.00");
        assert_eq!(MinorUnits::new(5).display(CurrencyCode::GHS), "GH₵0.05");
        assert_eq!(
            MinorUnits::new(123_456_789).display(CurrencyCode::NGN),
            "₦1,234,567.89"
        );
        assert_eq!(MinorUnits::ZERO.display(CurrencyCode::USD), "$0.00");
    }

    #[test]
    fn test_from_major_str() {
        let ghs = CurrencyCode::GHS;
        assert_eq!(MinorUnits::from_major_str("12.5", ghs), Ok(MinorUnits::new(1250)));
        assert_eq!(MinorUnits::from_major_str("7", ghs), Ok(MinorUnits::new(700)));
        assert_eq!(MinorUnits::from_major_str("0.01", ghs), Ok(MinorUnits::new(1)));
        assert_eq!(MinorUnits::from_major_str("-1", ghs), Err(MoneyError::Negative));
        assert_eq!(
            MinorUnits::from_major_str("1.005", ghs),
            Err(MoneyError::TooPrecise { max_places: 2 })
        );
        assert!(matches!(
            MinorUnits::from_major_str("abc", ghs),
            Err(MoneyError::Invalid(_))
        ));
    }

    #[test]
    fn test_arithmetic_never_wraps() {
        let max = MinorUnits::new(u64::MAX);
        assert_eq!(max.checked_mul(2), None);
        assert_eq!(max.checked_add(MinorUnits::new(1)), None);
        assert_eq!(max.saturating_add(MinorUnits::new(1)), max);
        let total: MinorUnits = [max, MinorUnits::new(10)].into_iter().sum();
        assert_eq!(total, max);
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!("ghs".parse::<CurrencyCode>(), Ok(CurrencyCode::GHS));
        assert!("XYZ".parse::<CurrencyCode>().is_err());
    }
}
