//! Expense approval workflow.
//!
//! This module builds approval plans, evaluates approval actions against the
//! pinned policy, and handles the transitions outside the gate (submission,
//! admin override, payment).
//!
//! # Modules
//!
//! - `types` - Workflow domain types (Expense, ApprovalRule, ApprovalStep, User)
//! - `error` - Workflow error taxonomy
//! - `plan` - Approval plan construction
//! - `tracker` - Per-expense step state
//! - `gate` - Approval action evaluation
//! - `permission` - Act/view/manage predicates
//! - `service` - Submission, override and payment
//! - `rules` - Rule drafts and validation
//! - `query` - Listing filters and statistics
//! - `audit` - Audit events emitted by transitions

pub mod audit;
pub mod error;
pub mod gate;
pub mod permission;
pub mod plan;
pub mod query;
pub mod rules;
pub mod service;
pub mod tracker;
pub mod types;

#[cfg(test)]
mod gate_props;
#[cfg(test)]
mod plan_props;
#[cfg(test)]
mod test_support;

pub use audit::{AuditAction, AuditEvent};
pub use error::{ApprovalError, ErrorKind};
pub use gate::{ActionOutcome, GateEvaluator, MAX_COMMENT_LEN};
pub use permission::{can_act, can_manage_rules, can_manage_user, can_view};
pub use plan::PlanBuilder;
pub use query::{ExpenseFilter, ExpenseStatistics, StatusTotals, summarize};
pub use rules::RuleDraft;
pub use service::{ExpenseClaim, StatusChange, Submission, WorkflowService};
pub use tracker::ApprovalTracker;
pub use types::{
    ApprovalPolicy, ApprovalRule, ApprovalStep, Company, Decision, Expense, ExpenseCategory,
    ExpenseStatus, StepSource, StepStatus, User, UserRole,
};
