//! TTL cache in front of another rate provider.

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use tracing::debug;

use claimflow_core::currency::ExchangeRate;
use claimflow_shared::config::ExchangeRateConfig;

use crate::error::RateError;
use crate::provider::{ExchangeRateProvider, normalize_pair};

/// A bounded, TTL-based rate cache around another provider, backed by [`moka`].
///
/// Keys are normalized currency pairs. Concurrent misses for the same pair
/// coalesce into a single provider call; failures are not cached.
pub struct CachedRateProvider<P> {
    inner: P,
    cache: Cache<(String, String), ExchangeRate>,
}

impl<P: ExchangeRateProvider> CachedRateProvider<P> {
    /// Wraps `inner` with the given capacity and time-to-live.
    pub fn new(inner: P, max_capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(ttl)
            .build();
        Self { inner, cache }
    }

    /// Wraps `inner` using the cache settings of `config`.
    pub fn from_config(inner: P, config: &ExchangeRateConfig) -> Self {
        Self::new(
            inner,
            config.cache_capacity,
            Duration::from_secs(config.cache_ttl_secs),
        )
    }

    /// The wrapped provider.
    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Drops every cached rate.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }
}

#[async_trait]
impl<P: ExchangeRateProvider> ExchangeRateProvider for CachedRateProvider<P> {
    async fn exchange_rate(&self, from: &str, to: &str) -> Result<ExchangeRate, RateError> {
        let key = normalize_pair(from, to)?;
        if let Some(rate) = self.cache.get(&key).await {
            debug!(from = %key.0, to = %key.1, "exchange rate cache hit");
            return Ok(rate);
        }

        let (from, to) = (key.0.clone(), key.1.clone());
        self.cache
            .try_get_with(key, async move { self.inner.exchange_rate(&from, &to).await })
            .await
            .map_err(|e| (*e).clone())
    }
}

impl<P> std::fmt::Debug for CachedRateProvider<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedRateProvider")
            .field("entries", &self.cache.entry_count())
            .finish_non_exhaustive()
    }
}
