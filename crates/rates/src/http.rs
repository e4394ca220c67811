//! Exchange rates fetched from an HTTP API.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{debug, warn};

use claimflow_core::currency::ExchangeRate;
use claimflow_shared::config::ExchangeRateConfig;

use crate::error::RateError;
use crate::provider::{ExchangeRateProvider, PIVOT_CURRENCY, normalize_pair, quote_from_pivot_table};

/// A provider that fetches the USD rate table from an HTTP API.
///
/// Calls `GET {base_url}/USD` and reads the rates from the `rates` or `data`
/// object of the response. Every lookup fetches the table; wrap the provider
/// in a [`CachedRateProvider`](crate::CachedRateProvider) to avoid that.
pub struct HttpRateProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpRateProvider {
    /// Create a new HTTP rate provider from the given configuration.
    pub fn new(config: &ExchangeRateConfig) -> Result<Self, RateError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RateError::Http(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
        })
    }

    async fn fetch_usd_table(&self) -> Result<HashMap<String, Decimal>, RateError> {
        let url = format!("{}/{PIVOT_CURRENCY}", self.base_url);
        debug!(url = %url, "fetching exchange rates");

        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.query(&[("access_key", key)]);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                RateError::Timeout
            } else {
                RateError::Http(e.to_string())
            }
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read body".to_owned());
            warn!(status, "exchange rate API returned an error");
            return Err(RateError::Api { status, body });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| RateError::Parse(e.to_string()))?;
        parse_rate_table(&body)
    }
}

impl std::fmt::Debug for HttpRateProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRateProvider")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ExchangeRateProvider for HttpRateProvider {
    async fn exchange_rate(&self, from: &str, to: &str) -> Result<ExchangeRate, RateError> {
        let (from, to) = normalize_pair(from, to)?;
        if from == to {
            return Ok(ExchangeRate::identity(from, Utc::now()));
        }

        let table = self.fetch_usd_table().await?;
        quote_from_pivot_table(&table, &from, &to, Utc::now())
    }
}

/// Extracts the `currency -> rate` object from an API response.
///
/// Entries that are not numbers are skipped.
pub(crate) fn parse_rate_table(body: &Value) -> Result<HashMap<String, Decimal>, RateError> {
    let rates = body
        .get("rates")
        .or_else(|| body.get("data"))
        .and_then(Value::as_object)
        .ok_or_else(|| RateError::Parse("response has no rates object".to_owned()))?;

    Ok(rates
        .iter()
        .filter_map(|(code, value)| {
            let number = value.as_number()?.to_string();
            let rate = Decimal::from_str(&number)
                .or_else(|_| Decimal::from_scientific(&number))
                .ok()?;
            Some((code.to_ascii_uppercase(), rate))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves one canned HTTP response and returns the base URL.
    async fn serve_once(status_line: &'static str, body: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let _ = socket.read(&mut buf).await.unwrap();
            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{addr}/latest")
    }

    fn provider(base_url: String) -> HttpRateProvider {
        HttpRateProvider::new(&ExchangeRateConfig {
            base_url,
            timeout_secs: 5,
            ..ExchangeRateConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn parses_rates_object() {
        let body = json!({"base": "USD", "rates": {"EUR": 0.8, "INR": 83.12, "note": "x"}});
        let table = parse_rate_table(&body).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table["EUR"], dec!(0.8));
        assert_eq!(table["INR"], dec!(83.12));
    }

    #[test]
    fn parses_data_object_and_scientific_numbers() {
        let body = json!({"data": {"jpy": 1.5e2}});
        let table = parse_rate_table(&body).unwrap();
        assert_eq!(table["JPY"], dec!(150));
    }

    #[test]
    fn missing_rates_object_is_parse_error() {
        assert!(matches!(
            parse_rate_table(&json!({"result": "error"})),
            Err(RateError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn fetches_and_triangulates() {
        let base = serve_once("200 OK", json!({"rates": {"EUR": 0.8, "INR": 80}}).to_string()).await;
        let rate = provider(base).exchange_rate("eur", "inr").await.unwrap();
        assert_eq!(rate.rate, dec!(100));
        assert_eq!(rate.from_currency, "EUR");
    }

    #[tokio::test]
    async fn same_currency_skips_network() {
        // Nothing listens here; the call must not reach the network.
        let rate = provider("http://127.0.0.1:9".to_owned())
            .exchange_rate("GBP", "gbp")
            .await
            .unwrap();
        assert_eq!(rate.rate, Decimal::ONE);
    }

    #[tokio::test]
    async fn non_success_status_is_api_error() {
        let base = serve_once("503 Service Unavailable", "{}".to_owned()).await;
        let err = provider(base).exchange_rate("EUR", "USD").await.unwrap_err();
        assert!(matches!(err, RateError::Api { status: 503, .. }));
    }
}
