//! Workflow error types for expense approval routing.
//!
//! Every failure is recoverable at the caller boundary. The engine never
//! returns an error after mutating state, so callers can rely on "error means
//! nothing changed".

use thiserror::Error;

use claimflow_shared::AppError;
use claimflow_shared::types::{ApprovalRuleId, ExpenseId, UserId};

use crate::workflow::types::ExpenseStatus;

/// Coarse error taxonomy exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Something the caller referenced does not exist.
    NotFound,
    /// The request conflicts with the current workflow state.
    InvalidState,
    /// The actor may not perform this operation.
    PermissionDenied,
    /// The approval rule is malformed.
    Configuration,
    /// The caller's input is malformed.
    Validation,
    /// A collaborator (exchange rates) failed.
    External,
    /// The persistence layer failed.
    Storage,
}

/// Errors that can occur during workflow operations.
#[derive(Debug, Error)]
pub enum ApprovalError {
    /// The actor holds no pending step on the expense.
    #[error("No pending approval action found for user {approver_id} on expense {expense_id}")]
    NoPendingStep {
        /// The expense.
        expense_id: ExpenseId,
        /// The acting user.
        approver_id: UserId,
    },

    /// Expense not found.
    #[error("Expense {0} not found")]
    ExpenseNotFound(ExpenseId),

    /// User not found.
    #[error("User {0} not found")]
    UserNotFound(UserId),

    /// Approval rule not found.
    #[error("Approval rule {0} not found")]
    RuleNotFound(ApprovalRuleId),

    /// A sequential rule has an earlier step still pending.
    #[error("Previous approvals must be completed first: step {blocking_order} is still pending")]
    OutOfSequence {
        /// The step the actor tried to resolve.
        sequence_order: u32,
        /// Lowest pending step blocking it.
        blocking_order: u32,
    },

    /// The expense already has an approval outcome.
    #[error("Expense {expense_id} is already {status}")]
    AlreadyResolved {
        /// The expense.
        expense_id: ExpenseId,
        /// Its current status.
        status: ExpenseStatus,
    },

    /// Attempted an invalid status transition.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// The current status.
        from: ExpenseStatus,
        /// The attempted target status.
        to: ExpenseStatus,
    },

    /// The actor is not entitled to the operation.
    #[error("User {user_id} is not permitted to {operation}")]
    PermissionDenied {
        /// The acting user.
        user_id: UserId,
        /// What was attempted.
        operation: &'static str,
    },

    /// Malformed approval rule.
    #[error("Invalid approval rule: {0}")]
    Configuration(String),

    /// Malformed input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Exchange rate could not be resolved.
    #[error("Exchange rate unavailable: {0}")]
    ExchangeRate(String),

    /// Storage error.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl ApprovalError {
    /// Returns the coarse error category.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoPendingStep { .. }
            | Self::ExpenseNotFound(_)
            | Self::UserNotFound(_)
            | Self::RuleNotFound(_) => ErrorKind::NotFound,

            Self::OutOfSequence { .. }
            | Self::AlreadyResolved { .. }
            | Self::InvalidTransition { .. } => ErrorKind::InvalidState,

            Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Validation(_) => ErrorKind::Validation,
            Self::ExchangeRate(_) => ErrorKind::External,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::NotFound => 404,
            ErrorKind::InvalidState => 409,
            ErrorKind::PermissionDenied => 403,
            ErrorKind::Configuration => 422,
            ErrorKind::Validation => 400,
            ErrorKind::External => 502,
            ErrorKind::Storage => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NoPendingStep { .. } => "NO_PENDING_ACTION",
            Self::ExpenseNotFound(_) => "EXPENSE_NOT_FOUND",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::RuleNotFound(_) => "RULE_NOT_FOUND",
            Self::OutOfSequence { .. } => "OUT_OF_SEQUENCE",
            Self::AlreadyResolved { .. } => "EXPENSE_ALREADY_RESOLVED",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::PermissionDenied { .. } => "PERMISSION_DENIED",
            Self::Configuration(_) => "INVALID_APPROVAL_RULE",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::ExchangeRate(_) => "EXCHANGE_RATE_UNAVAILABLE",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }
}

impl From<ApprovalError> for AppError {
    fn from(err: ApprovalError) -> Self {
        let message = err.to_string();
        match err.kind() {
            ErrorKind::NotFound => Self::NotFound(message),
            ErrorKind::InvalidState => Self::Conflict(message),
            ErrorKind::PermissionDenied => Self::Forbidden(message),
            ErrorKind::Configuration => Self::BusinessRule(message),
            ErrorKind::Validation => Self::Validation(message),
            ErrorKind::External => Self::ExternalService(message),
            ErrorKind::Storage => Self::Storage(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(
        ApprovalError::NoPendingStep { expense_id: ExpenseId::new(), approver_id: UserId::new() },
        ErrorKind::NotFound,
        404,
        "NO_PENDING_ACTION"
    )]
    #[case(
        ApprovalError::OutOfSequence { sequence_order: 1, blocking_order: 0 },
        ErrorKind::InvalidState,
        409,
        "OUT_OF_SEQUENCE"
    )]
    #[case(
        ApprovalError::AlreadyResolved {
            expense_id: ExpenseId::new(),
            status: ExpenseStatus::Rejected,
        },
        ErrorKind::InvalidState,
        409,
        "EXPENSE_ALREADY_RESOLVED"
    )]
    #[case(
        ApprovalError::PermissionDenied { user_id: UserId::new(), operation: "act on expense" },
        ErrorKind::PermissionDenied,
        403,
        "PERMISSION_DENIED"
    )]
    #[case(
        ApprovalError::Configuration("bad".into()),
        ErrorKind::Configuration,
        422,
        "INVALID_APPROVAL_RULE"
    )]
    #[case(
        ApprovalError::Validation("bad".into()),
        ErrorKind::Validation,
        400,
        "VALIDATION_ERROR"
    )]
    #[case(
        ApprovalError::ExchangeRate("down".into()),
        ErrorKind::External,
        502,
        "EXCHANGE_RATE_UNAVAILABLE"
    )]
    fn test_error_mapping(
        #[case] err: ApprovalError,
        #[case] kind: ErrorKind,
        #[case] status: u16,
        #[case] code: &str,
    ) {
        assert_eq!(err.kind(), kind);
        assert_eq!(err.status_code(), status);
        assert_eq!(err.error_code(), code);
    }

    #[test]
    fn test_out_of_sequence_message() {
        let err = ApprovalError::OutOfSequence {
            sequence_order: 2,
            blocking_order: 0,
        };
        assert!(err.to_string().contains("step 0 is still pending"));
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = ApprovalError::InvalidTransition {
            from: ExpenseStatus::Paid,
            to: ExpenseStatus::Rejected,
        };
        assert!(err.to_string().contains("paid"));
        assert!(err.to_string().contains("rejected"));
    }

    #[test]
    fn test_into_app_error() {
        let app: AppError = ApprovalError::OutOfSequence {
            sequence_order: 1,
            blocking_order: 0,
        }
        .into();
        assert_eq!(app.status_code(), 409);

        let app: AppError = ApprovalError::PermissionDenied {
            user_id: UserId::new(),
            operation: "override expense",
        }
        .into();
        assert_eq!(app.error_code(), "FORBIDDEN");
    }
}
