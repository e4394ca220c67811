//! Exchange rate providers for Claimflow.
//!
//! Rates are looked up before an expense is planned; the core never performs
//! I/O. Providers are plain values owned by the caller:
//!
//! - [`StaticRateProvider`] - fixed USD-quoted table
//! - [`HttpRateProvider`] - live USD table from an HTTP API
//! - [`CachedRateProvider`] - TTL cache around any provider

pub mod cache;
pub mod error;
pub mod fixed;
pub mod http;
pub mod provider;

pub use cache::CachedRateProvider;
pub use error::RateError;
pub use fixed::StaticRateProvider;
pub use http::HttpRateProvider;
pub use provider::{ExchangeRateProvider, PIVOT_CURRENCY};
