//! Workflow domain types for expense approval routing.
//!
//! This module defines the entities the engine reasons about: expenses,
//! approval rules, approval steps, and the users acting on them.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use claimflow_shared::types::{ApprovalRuleId, ApprovalStepId, CompanyId, ExpenseId, UserId};

/// Expense status in the approval workflow.
///
/// Valid transitions:
/// - Submitted → PendingApproval (plan has steps)
/// - Submitted → Approved (empty plan, auto-approval)
/// - PendingApproval → Approved (threshold reached)
/// - PendingApproval → Rejected (any rejection)
/// - Approved → Paid
///
/// Admin override may move any non-paid expense to Approved or Rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseStatus {
    /// Claim recorded, plan not yet built.
    Submitted,
    /// Waiting on approval steps.
    PendingApproval,
    /// Accepted.
    Approved,
    /// Refused.
    Rejected,
    /// Reimbursed.
    Paid,
}

impl ExpenseStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::PendingApproval => "pending_approval",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Paid => "paid",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "submitted" => Some(Self::Submitted),
            "pending_approval" => Some(Self::PendingApproval),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "paid" => Some(Self::Paid),
            _ => None,
        }
    }

    /// Returns true once the approval outcome is decided.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected | Self::Paid)
    }
}

impl fmt::Display for ExpenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of a single approval step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// Awaiting the approver's decision.
    Pending,
    /// Approver accepted.
    Approved,
    /// Approver refused.
    Rejected,
    /// Step no longer required.
    Skipped,
}

impl StepStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An approver's decision on a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    /// Accept the expense.
    Approve,
    /// Refuse the expense.
    Reject,
}

impl Decision {
    /// Parses `approve` / `reject`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "approve" => Some(Self::Approve),
            "reject" => Some(Self::Reject),
            _ => None,
        }
    }

    /// The step status this decision produces.
    #[must_use]
    pub fn step_status(self) -> StepStatus {
        match self {
            Self::Approve => StepStatus::Approved,
            Self::Reject => StepStatus::Rejected,
        }
    }

    /// The expense status this decision produces when it is final.
    #[must_use]
    pub fn expense_status(self) -> ExpenseStatus {
        match self {
            Self::Approve => ExpenseStatus::Approved,
            Self::Reject => ExpenseStatus::Rejected,
        }
    }
}

/// User role within a company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Company administrator.
    Admin,
    /// Manages direct reports.
    Manager,
    /// Submits expenses.
    Employee,
}

impl UserRole {
    /// Parse a role from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "manager" => Some(Self::Manager),
            "employee" => Some(Self::Employee),
            _ => None,
        }
    }

    /// Returns the string representation of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Employee => "employee",
        }
    }
}

/// A company member, as seen by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User id.
    pub id: UserId,
    /// Company the user belongs to.
    pub company_id: CompanyId,
    /// Role in the company.
    pub role: UserRole,
    /// Direct manager, if any.
    pub manager_id: Option<UserId>,
    /// Display name.
    pub full_name: String,
    /// Inactive users cannot be configured as rule approvers.
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// A company and its accounting currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    /// Company id.
    pub id: CompanyId,
    /// Display name.
    pub name: String,
    /// ISO 4217 currency every expense is converted into.
    pub base_currency: String,
}

/// Expense category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    /// Travel.
    Travel,
    /// Meals.
    Meals,
    /// Hotels and lodging.
    Accommodation,
    /// Local transport.
    Transport,
    /// Office supplies.
    OfficeSupplies,
    /// Client entertainment.
    Entertainment,
    /// Anything else.
    Other,
}

/// Policy pinned to an expense when its plan is built.
///
/// Later edits to the rule do not affect expenses already in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalPolicy {
    /// Rule the plan was built from.
    pub rule_id: ApprovalRuleId,
    /// Steps must be resolved in ascending sequence order.
    pub sequential: bool,
    /// Percentage of approved steps needed (1-100).
    pub min_approval_percentage: u8,
}

/// A submitted expense claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    /// Expense id.
    pub id: ExpenseId,
    /// Owning company.
    pub company_id: CompanyId,
    /// Employee who submitted the claim.
    pub submitter_id: UserId,
    /// Submitter's direct manager at submission time.
    pub submitter_manager_id: Option<UserId>,
    /// Claimed amount in the claim currency.
    pub amount: Decimal,
    /// ISO 4217 claim currency.
    pub currency: String,
    /// Amount converted to the company base currency.
    pub amount_in_base: Decimal,
    /// Rate used for the conversion.
    pub exchange_rate_to_base: Decimal,
    /// Category.
    pub category: ExpenseCategory,
    /// Free-text description.
    pub description: String,
    /// When the expense was incurred.
    pub expense_date: NaiveDate,
    /// Workflow status.
    pub status: ExpenseStatus,
    /// Policy in force, `None` when the expense was auto-approved.
    pub policy: Option<ApprovalPolicy>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last status change.
    pub updated_at: DateTime<Utc>,
}

/// Company-level approval rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRule {
    /// Rule id.
    pub id: ApprovalRuleId,
    /// Owning company.
    pub company_id: CompanyId,
    /// Human-readable name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Submitter's manager approves first.
    pub requires_manager_first: bool,
    /// Steps are resolved in order.
    pub sequential: bool,
    /// Percentage of approved steps needed (1-100).
    pub min_approval_percentage: u8,
    /// One named approver placed after the manager.
    pub specific_approver_id: Option<UserId>,
    /// Rule approvers in configured order.
    pub approvers: Vec<UserId>,
    /// Inactive rules are never used for new plans.
    pub is_active: bool,
}

impl ApprovalRule {
    /// Returns the policy an expense carries once planned under this rule.
    #[must_use]
    pub fn policy(&self) -> ApprovalPolicy {
        ApprovalPolicy {
            rule_id: self.id,
            sequential: self.sequential,
            min_approval_percentage: self.min_approval_percentage,
        }
    }
}

/// Why a step exists in a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepSource {
    /// Submitter's manager.
    Manager,
    /// The rule's specific approver.
    SpecificApprover,
    /// One of the rule's approvers.
    RuleApprover,
}

/// One approver's decision slot on one expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalStep {
    /// Step id.
    pub id: ApprovalStepId,
    /// Owning expense.
    pub expense_id: ExpenseId,
    /// Who must decide.
    pub approver_id: UserId,
    /// 0-based position, assigned once.
    pub sequence_order: u32,
    /// Where the step came from.
    pub source: StepSource,
    /// Current status.
    pub status: StepStatus,
    /// Approver's comment.
    pub comment: Option<String>,
    /// Set exactly once, on the first non-pending transition.
    pub acted_at: Option<DateTime<Utc>>,
}

impl ApprovalStep {
    /// Creates a pending step.
    #[must_use]
    pub fn pending(
        expense_id: ExpenseId,
        approver_id: UserId,
        sequence_order: u32,
        source: StepSource,
    ) -> Self {
        Self {
            id: ApprovalStepId::new(),
            expense_id,
            approver_id,
            sequence_order,
            source,
            status: StepStatus::Pending,
            comment: None,
            acted_at: None,
        }
    }

    /// Returns true while the step awaits a decision.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == StepStatus::Pending
    }
}
