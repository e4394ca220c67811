//! The exchange rate provider interface and USD pivot quoting.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use claimflow_core::currency::{ExchangeRate, normalize_currency_code};

use crate::error::RateError;

/// Currency every provider table is quoted against.
pub const PIVOT_CURRENCY: &str = "USD";

/// Resolves the rate between two currencies.
///
/// Implementations may call an external service; callers resolve the rate
/// before submitting an expense.
#[async_trait]
pub trait ExchangeRateProvider: Send + Sync {
    /// Returns the rate converting one unit of `from` into `to`.
    async fn exchange_rate(&self, from: &str, to: &str) -> Result<ExchangeRate, RateError>;
}

/// Normalizes both codes of a pair.
pub(crate) fn normalize_pair(from: &str, to: &str) -> Result<(String, String), RateError> {
    let normalize = |code: &str| {
        normalize_currency_code(code).ok_or_else(|| RateError::InvalidCurrency(code.to_owned()))
    };
    Ok((normalize(from)?, normalize(to)?))
}

/// Derives `from -> to` from a table of `USD -> X` rates.
pub(crate) fn quote_from_pivot_table(
    table: &HashMap<String, Decimal>,
    from: &str,
    to: &str,
    as_of: DateTime<Utc>,
) -> Result<ExchangeRate, RateError> {
    if from == to {
        return Ok(ExchangeRate::identity(from, as_of));
    }

    let leg = |currency: &str| -> Result<ExchangeRate, RateError> {
        if currency == PIVOT_CURRENCY {
            return Ok(ExchangeRate::identity(PIVOT_CURRENCY, as_of));
        }
        table
            .get(currency)
            .filter(|rate| **rate > Decimal::ZERO)
            .map(|rate| ExchangeRate::new(PIVOT_CURRENCY, currency, *rate, as_of))
            .ok_or_else(|| RateError::UnknownCurrency(currency.to_owned()))
    };

    ExchangeRate::cross(&leg(from)?, &leg(to)?)
        .ok_or_else(|| RateError::UnknownCurrency(format!("{from}/{to}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn table() -> HashMap<String, Decimal> {
        HashMap::from([
            ("EUR".to_owned(), dec!(0.8)),
            ("INR".to_owned(), dec!(80)),
            ("XXX".to_owned(), Decimal::ZERO),
        ])
    }

    #[test]
    fn same_currency_is_one() {
        let rate = quote_from_pivot_table(&table(), "JPY", "JPY", Utc::now()).unwrap();
        assert_eq!(rate.rate, Decimal::ONE);
    }

    #[test]
    fn direct_and_inverse_pivot_legs() {
        let now = Utc::now();
        assert_eq!(quote_from_pivot_table(&table(), "USD", "INR", now).unwrap().rate, dec!(80));
        assert_eq!(quote_from_pivot_table(&table(), "EUR", "USD", now).unwrap().rate, dec!(1.25));
    }

    #[test]
    fn triangulates_non_pivot_pair() {
        let rate = quote_from_pivot_table(&table(), "EUR", "INR", Utc::now()).unwrap();
        assert_eq!(rate.from_currency, "EUR");
        assert_eq!(rate.to_currency, "INR");
        assert_eq!(rate.rate, dec!(100));
    }

    #[test]
    fn unknown_or_zero_rate_fails() {
        let now = Utc::now();
        assert!(matches!(
            quote_from_pivot_table(&table(), "GBP", "USD", now),
            Err(RateError::UnknownCurrency(c)) if c == "GBP"
        ));
        assert!(quote_from_pivot_table(&table(), "USD", "XXX", now).is_err());
    }

    #[test]
    fn normalize_pair_rejects_bad_codes() {
        assert_eq!(
            normalize_pair("eur", "usd").unwrap(),
            ("EUR".to_owned(), "USD".to_owned())
        );
        assert!(matches!(normalize_pair("EURO", "USD"), Err(RateError::InvalidCurrency(_))));
    }
}
