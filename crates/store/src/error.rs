//! Storage errors.

use thiserror::Error;

use claimflow_core::workflow::ApprovalError;

/// Errors raised by repositories and audit sinks.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The stored record changed since it was loaded.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A write referenced a record that does not exist.
    #[error("missing record: {0}")]
    Missing(String),

    /// The backend failed.
    #[error("backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for ApprovalError {
    fn from(err: StoreError) -> Self {
        Self::Storage(err.to_string())
    }
}
