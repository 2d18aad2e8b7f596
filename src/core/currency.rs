use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Currencies settled in whole units (no minor denomination).
const ZERO_DECIMAL_CURRENCIES: &[&str] = &["CLP", "ISK", "JPY", "KRW", "PYG", "UGX", "VND"];

/// Currencies with three decimal places.
const THREE_DECIMAL_CURRENCIES: &[&str] = &["BHD", "IQD", "JOD", "KWD", "LYD", "OMR", "TND"];

/// ISO 4217-style currency code.
///
/// Each code knows its minor-unit precision, which bounds the scale
/// of every amount stored against it.
///
/// # Examples
///
/// ```
/// use potsplit_engine::core::currency::CurrencyCode;
///
/// assert_eq!(CurrencyCode::new("USD").minor_units(), 2);
/// assert_eq!(CurrencyCode::new("JPY").minor_units(), 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of decimal places of the smallest denomination.
    pub fn minor_units(&self) -> u32 {
        let code = self.0.to_ascii_uppercase();
        if ZERO_DECIMAL_CURRENCIES.contains(&code.as_str()) {
            0
        } else if THREE_DECIMAL_CURRENCIES.contains(&code.as_str()) {
            3
        } else {
            2
        }
    }

    /// The value of one minor unit, e.g. `0.01` for USD.
    pub fn minor_unit(&self) -> Decimal {
        Decimal::new(1, self.minor_units())
    }

    /// True if `amount` is an exact multiple of the minor unit.
    pub fn is_representable(&self, amount: Decimal) -> bool {
        amount.normalize().scale() <= self.minor_units()
    }

    /// Express `amount` as an integer count of minor units.
    ///
    /// Returns `None` if the amount carries more precision than the
    /// currency allows, or if the unit count does not fit in a `Decimal`.
    pub fn to_minor_units(&self, amount: Decimal) -> Option<Decimal> {
        if !self.is_representable(amount) {
            return None;
        }
        amount.checked_div(self.minor_unit()).map(|u| u.trunc())
    }

    pub fn from_minor_units(&self, units: Decimal) -> Decimal {
        units * self.minor_unit()
    }

    /// Round to the currency's precision (banker's rounding).
    pub fn round(&self, amount: Decimal) -> Decimal {
        amount.round_dp(self.minor_units())
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CurrencyCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Errors arising from FX rate operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FxError {
    #[error("no FX rate available for {from} -> {to}")]
    RateNotFound {
        from: CurrencyCode,
        to: CurrencyCode,
    },
    #[error("FX rate must be positive, got {rate} for {from} -> {to}")]
    InvalidRate {
        from: CurrencyCode,
        to: CurrencyCode,
        rate: Decimal,
    },
}

/// FX rate table for presenting balances in a single currency.
///
/// Settlement itself never crosses currencies; conversion is only used
/// to consolidate a multi-currency balance sheet for display.
///
/// # Examples
///
/// ```
/// use potsplit_engine::core::currency::{CurrencyCode, FxRateTable};
/// use rust_decimal_macros::dec;
///
/// let mut rates = FxRateTable::new();
/// rates.set_rate(CurrencyCode::new("EUR"), CurrencyCode::new("USD"), dec!(1.10)).unwrap();
///
/// let converted = rates
///     .convert(dec!(100), &CurrencyCode::new("EUR"), &CurrencyCode::new("USD"))
///     .unwrap();
/// assert_eq!(converted, dec!(110));
/// ```
#[derive(Debug, Clone, Default)]
pub struct FxRateTable {
    /// Direct rates: (from, to) -> rate.
    rates: HashMap<(CurrencyCode, CurrencyCode), Decimal>,
}

impl FxRateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a direct exchange rate: 1 unit of `from` = `rate` units of `to`.
    /// The inverse rate is stored alongside.
    pub fn set_rate(
        &mut self,
        from: CurrencyCode,
        to: CurrencyCode,
        rate: Decimal,
    ) -> Result<(), FxError> {
        if rate <= Decimal::ZERO {
            return Err(FxError::InvalidRate { from, to, rate });
        }
        self.rates.insert((from.clone(), to.clone()), rate);
        self.rates.insert((to, from), Decimal::ONE / rate);
        Ok(())
    }

    pub fn get_rate(&self, from: &CurrencyCode, to: &CurrencyCode) -> Result<Decimal, FxError> {
        if from == to {
            return Ok(Decimal::ONE);
        }
        self.rates
            .get(&(from.clone(), to.clone()))
            .copied()
            .ok_or_else(|| FxError::RateNotFound {
                from: from.clone(),
                to: to.clone(),
            })
    }

    /// Convert an amount without rounding.
    pub fn convert(
        &self,
        amount: Decimal,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Result<Decimal, FxError> {
        let rate = self.get_rate(from, to)?;
        Ok(amount * rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_minor_units_table() {
        assert_eq!(CurrencyCode::new("EUR").minor_units(), 2);
        assert_eq!(CurrencyCode::new("jpy").minor_units(), 0);
        assert_eq!(CurrencyCode::new("KWD").minor_units(), 3);
        assert_eq!(CurrencyCode::new("USD").minor_unit(), dec!(0.01));
    }

    #[test]
    fn test_representable() {
        let usd = CurrencyCode::new("USD");
        assert!(usd.is_representable(dec!(10.50)));
        assert!(usd.is_representable(dec!(10.500)));
        assert!(!usd.is_representable(dec!(10.505)));
        assert!(!CurrencyCode::new("JPY").is_representable(dec!(1.5)));
    }

    #[test]
    fn test_minor_unit_conversion() {
        let usd = CurrencyCode::new("USD");
        assert_eq!(usd.to_minor_units(dec!(12.34)), Some(dec!(1234)));
        assert_eq!(usd.to_minor_units(dec!(0.001)), None);
        assert_eq!(usd.from_minor_units(dec!(1234)), dec!(12.34));
    }

    #[test]
    fn test_minor_units_overflow_is_none() {
        assert_eq!(CurrencyCode::new("USD").to_minor_units(Decimal::MAX), None);
        assert_eq!(CurrencyCode::new("JPY").to_minor_units(Decimal::MAX), Some(Decimal::MAX));
    }

    #[test]
    fn test_fx_rate_table_inverse() {
        let mut table = FxRateTable::new();
        table
            .set_rate(CurrencyCode::new("USD"), CurrencyCode::new("BRL"), dec!(5))
            .unwrap();

        let rate = table
            .get_rate(&CurrencyCode::new("BRL"), &CurrencyCode::new("USD"))
            .unwrap();
        assert_eq!(rate, dec!(0.2));
    }

    #[test]
    fn test_same_currency_rate() {
        let table = FxRateTable::new();
        let rate = table
            .get_rate(&CurrencyCode::new("USD"), &CurrencyCode::new("USD"))
            .unwrap();
        assert_eq!(rate, Decimal::ONE);
    }

    #[test]
    fn test_missing_rate() {
        let table = FxRateTable::new();
        let err = table
            .get_rate(&CurrencyCode::new("USD"), &CurrencyCode::new("GBP"))
            .unwrap_err();
        assert!(matches!(err, FxError::RateNotFound { .. }));
    }

    #[test]
    fn test_invalid_rate() {
        let mut table = FxRateTable::new();
        let result = table.set_rate(CurrencyCode::new("BRL"), CurrencyCode::new("USD"), dec!(-0.5));
        assert!(result.is_err());
    }
}
