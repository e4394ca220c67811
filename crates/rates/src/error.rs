//! Exchange rate lookup errors.

use thiserror::Error;

use claimflow_core::workflow::ApprovalError;

/// Errors that can occur while resolving an exchange rate.
#[derive(Debug, Clone, Error)]
pub enum RateError {
    /// Not a three-letter currency code.
    #[error("invalid currency code '{0}'")]
    InvalidCurrency(String),

    /// The provider has no rate for the currency.
    #[error("no exchange rate for {0}")]
    UnknownCurrency(String),

    /// An HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The request timed out.
    #[error("exchange rate request timed out")]
    Timeout,

    /// The API answered with a non-success status.
    #[error("API error: status {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, if readable.
        body: String,
    },

    /// Failed to parse the API response.
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<RateError> for ApprovalError {
    fn from(err: RateError) -> Self {
        match err {
            RateError::InvalidCurrency(_) => Self::Validation(err.to_string()),
            other => Self::ExchangeRate(other.to_string()),
        }
    }
}
