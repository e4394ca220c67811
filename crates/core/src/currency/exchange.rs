//! Exchange rates between currency pairs.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Exchange rate between two currencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRate {
    /// Source currency code.
    pub from_currency: String,
    /// Target currency code.
    pub to_currency: String,
    /// 1 `from_currency` = `rate` `to_currency`.
    pub rate: Decimal,
    /// When the rate was obtained.
    pub as_of: DateTime<Utc>,
}

impl ExchangeRate {
    /// Creates a new exchange rate.
    #[must_use]
    pub fn new(
        from_currency: impl Into<String>,
        to_currency: impl Into<String>,
        rate: Decimal,
        as_of: DateTime<Utc>,
    ) -> Self {
        Self {
            from_currency: from_currency.into(),
            to_currency: to_currency.into(),
            rate,
            as_of,
        }
    }

    /// The rate of a currency to itself.
    #[must_use]
    pub fn identity(currency: impl Into<String>, as_of: DateTime<Utc>) -> Self {
        let currency = currency.into();
        Self::new(currency.clone(), currency, Decimal::ONE, as_of)
    }

    /// Returns the inverse rate, or `None` for a zero rate.
    #[must_use]
    pub fn inverse(&self) -> Option<Self> {
        let rate = Decimal::ONE.checked_div(self.rate)?;
        Some(Self::new(
            self.to_currency.clone(),
            self.from_currency.clone(),
            rate,
            self.as_of,
        ))
    }

    /// Derives `from -> to` from two rates quoted against the same pivot.
    ///
    /// `pivot_to_from` is `P -> from`, `pivot_to_to` is `P -> to`. Returns
    /// `None` if the pivots differ or the `from` rate is zero.
    #[must_use]
    pub fn cross(pivot_to_from: &Self, pivot_to_to: &Self) -> Option<Self> {
        if pivot_to_from.from_currency != pivot_to_to.from_currency {
            return None;
        }
        let rate = pivot_to_to.rate.checked_div(pivot_to_from.rate)?;
        Some(Self::new(
            pivot_to_from.to_currency.clone(),
            pivot_to_to.to_currency.clone(),
            rate,
            pivot_to_from.as_of.min(pivot_to_to.as_of),
        ))
    }

    /// Returns true for a usable (strictly positive) rate.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.rate > Decimal::ZERO
    }
}
