//! Type-safe price representation using decimal arithmetic.

use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors from price arithmetic and currency parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PriceError {
    /// Two prices in different currencies were combined.
    #[error("cannot combine {0} and {1} amounts")]
    CurrencyMismatch(CurrencyCode, CurrencyCode),
    /// The currency code is not one the storefront sells in.
    #[error("unsupported currency code: {0}")]
    UnsupportedCurrency(String),
}

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (naira, not kobo).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// A zero amount in the given currency.
    #[must_use]
    pub const fn zero(currency_code: CurrencyCode) -> Self {
        Self::new(Decimal::ZERO, currency_code)
    }

    /// Build a price from minor units (kobo, pesewas, cents).
    ///
    /// Paystack reports every amount in the currency's subunit.
    #[must_use]
    pub fn from_minor_units(minor: i64, currency_code: CurrencyCode) -> Self {
        Self::new(Decimal::new(minor, 2), currency_code)
    }

    /// Multiply by a line quantity.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self::new(self.amount * Decimal::from(quantity), self.currency_code)
    }

    /// Add two prices of the same currency.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::CurrencyMismatch`] if the currencies differ.
    pub fn checked_add(self, other: Self) -> Result<Self, PriceError> {
        if self.currency_code != other.currency_code {
            return Err(PriceError::CurrencyMismatch(
                self.currency_code,
                other.currency_code,
            ));
        }
        Ok(Self::new(self.amount + other.amount, self.currency_code))
    }

    /// Format with the currency's own symbol, e.g. `₦18500.00`.
    #[must_use]
    pub fn display(&self) -> String {
        self.display_with(self.currency_code.symbol())
    }

    /// Format with an explicit symbol, always to two decimal places.
    #[must_use]
    pub fn display_with(&self, symbol: &str) -> String {
        let rounded = self
            .amount
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        format!("{symbol}{rounded:.2}")
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// ISO 4217 currency codes the storefront can price in.
///
/// Paystack settles in NGN, GHS, ZAR, KES and USD; EUR and GBP are kept for
/// display of imported catalogue prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    NGN,
    GHS,
    ZAR,
    KES,
    USD,
    EUR,
    GBP,
}

impl CurrencyCode {
    /// Display symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::NGN => "₦",
            Self::GHS => "GH₵",
            Self::ZAR => "R",
            Self::KES => "KSh",
            Self::USD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }

    /// Three-letter code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NGN => "NGN",
            Self::GHS => "GHS",
            Self::ZAR => "ZAR",
            Self::KES => "KES",
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for CurrencyCode {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NGN" => Ok(Self::NGN),
            "GHS" => Ok(Self::GHS),
            "ZAR" => Ok(Self::ZAR),
            "KES" => Ok(Self::KES),
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            _ => Err(PriceError::UnsupportedCurrency(s.to_string())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_two_decimal_places() {
        let price = Price::new(Decimal::new(185, 1), CurrencyCode::NGN);
        assert_eq!(price.display(), "₦18.50");

        let whole = Price::new(Decimal::from(25_000), CurrencyCode::NGN);
        assert_eq!(whole.display(), "₦25000.00");
    }

    #[test]
    fn test_display_rounds_half_away_from_zero() {
        let price = Price::new(Decimal::new(10_005, 3), CurrencyCode::USD);
        assert_eq!(price.display(), "$10.01");
    }

    #[test]
    fn test_display_with_custom_symbol() {
        let price = Price::new(Decimal::from(7), CurrencyCode::NGN);
        assert_eq!(price.display_with("NGN "), "NGN 7.00");
    }

    #[test]
    fn test_from_minor_units() {
        let price = Price::from_minor_units(1_850_000, CurrencyCode::NGN);
        assert_eq!(price.amount, Decimal::from(18_500));
    }

    #[test]
    fn test_times_and_zero() {
        let unit = Price::new(Decimal::new(1_250_050, 2), CurrencyCode::NGN);
        assert_eq!(unit.times(3).display(), "₦37501.50");
        assert_eq!(unit.times(0), Price::zero(CurrencyCode::NGN));
        assert_eq!(Price::zero(CurrencyCode::USD).display(), "$0.00");
    }

    #[test]
    fn test_checked_add_rejects_mixed_currencies() {
        let naira = Price::new(Decimal::ONE, CurrencyCode::NGN);
        let cedi = Price::new(Decimal::ONE, CurrencyCode::GHS);
        assert_eq!(
            naira.checked_add(cedi),
            Err(PriceError::CurrencyMismatch(
                CurrencyCode::NGN,
                CurrencyCode::GHS
            ))
        );
        assert_eq!(
            naira.checked_add(naira).unwrap().amount,
            Decimal::from(2)
        );
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!("ngn".parse::<CurrencyCode>().unwrap(), CurrencyCode::NGN);
        assert_eq!(" GHS ".parse::<CurrencyCode>().unwrap(), CurrencyCode::GHS);
        assert!("XYZ".parse::<CurrencyCode>().is_err());
    }
}
