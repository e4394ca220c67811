//! Audit events produced by workflow transitions.
//!
//! The engine only describes what should be recorded; delivering the event to
//! an audit sink is the caller's job.

use serde::{Deserialize, Serialize};
use std::fmt;

use claimflow_shared::types::{ExpenseId, UserId};

/// Kind of audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Expense submitted and planned.
    ExpenseSubmitted,
    /// Expense reached its approval threshold.
    ExpenseApproved,
    /// Expense rejected by an approver.
    ExpenseRejected,
    /// Admin forced the outcome.
    ExpenseOverride,
    /// Expense reimbursed.
    ExpensePaid,
    /// Approval rule created.
    RuleCreated,
    /// Approval rule deactivated or replaced.
    RuleUpdated,
}

impl AuditAction {
    /// Returns the string representation of the action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExpenseSubmitted => "expense_submitted",
            Self::ExpenseApproved => "expense_approved",
            Self::ExpenseRejected => "expense_rejected",
            Self::ExpenseOverride => "expense_override",
            Self::ExpensePaid => "expense_paid",
            Self::RuleCreated => "rule_created",
            Self::RuleUpdated => "rule_updated",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An audit record to be delivered to the sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Who caused the event.
    pub actor_id: UserId,
    /// Expense concerned, if any.
    pub expense_id: Option<ExpenseId>,
    /// What happened.
    pub action: AuditAction,
    /// Human-readable description.
    pub description: String,
}

impl AuditEvent {
    /// Creates an event about an expense.
    #[must_use]
    pub fn for_expense(
        actor_id: UserId,
        expense_id: ExpenseId,
        action: AuditAction,
        description: impl Into<String>,
    ) -> Self {
        Self {
            actor_id,
            expense_id: Some(expense_id),
            action,
            description: description.into(),
        }
    }

    /// Creates an event not tied to an expense.
    #[must_use]
    pub fn standalone(
        actor_id: UserId,
        action: AuditAction,
        description: impl Into<String>,
    ) -> Self {
        Self {
            actor_id,
            expense_id: None,
            action,
            description: description.into(),
        }
    }
}
