//! Rates from a fixed table.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use claimflow_core::currency::ExchangeRate;

use crate::error::RateError;
use crate::provider::{ExchangeRateProvider, normalize_pair, quote_from_pivot_table};

/// A provider backed by a fixed table of `USD -> X` rates.
///
/// Used for offline runs and tests. Pairs not involving USD are triangulated
/// the same way as the HTTP provider does.
#[derive(Debug, Clone)]
pub struct StaticRateProvider {
    usd_rates: HashMap<String, Decimal>,
    as_of: DateTime<Utc>,
}

impl StaticRateProvider {
    /// Create a provider from `(currency, units per USD)` pairs.
    pub fn new<I, S>(usd_rates: I) -> Self
    where
        I: IntoIterator<Item = (S, Decimal)>,
        S: AsRef<str>,
    {
        Self {
            usd_rates: usd_rates
                .into_iter()
                .map(|(code, rate)| (code.as_ref().to_ascii_uppercase(), rate))
                .collect(),
            as_of: Utc::now(),
        }
    }

    /// Number of currencies in the table, USD excluded.
    pub fn len(&self) -> usize {
        self.usd_rates.len()
    }

    /// Returns true if only USD-to-USD conversions are possible.
    pub fn is_empty(&self) -> bool {
        self.usd_rates.is_empty()
    }
}

#[async_trait]
impl ExchangeRateProvider for StaticRateProvider {
    async fn exchange_rate(&self, from: &str, to: &str) -> Result<ExchangeRate, RateError> {
        let (from, to) = normalize_pair(from, to)?;
        quote_from_pivot_table(&self.usd_rates, &from, &to, self.as_of)
    }
}
