//! Workflow service for expense lifecycle transitions.
//!
//! Submission, admin override and payment. Approval actions go through
//! [`GateEvaluator`](crate::workflow::gate::GateEvaluator) instead.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use claimflow_shared::types::ExpenseId;

use crate::currency::{convert_amount, normalize_currency_code};
use crate::workflow::audit::{AuditAction, AuditEvent};
use crate::workflow::error::ApprovalError;
use crate::workflow::permission::require_company_admin;
use crate::workflow::plan::PlanBuilder;
use crate::workflow::types::{
    ApprovalRule, ApprovalStep, Company, Decision, Expense, ExpenseCategory, ExpenseStatus, User,
};

/// Maximum length of an expense description, in characters.
pub const MAX_DESCRIPTION_LEN: usize = 1000;

/// An expense claim as entered by the submitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseClaim {
    /// Claimed amount, strictly positive.
    pub amount: Decimal,
    /// ISO 4217 claim currency.
    pub currency: String,
    /// Category.
    pub category: ExpenseCategory,
    /// Free-text description.
    pub description: String,
    /// When the expense was incurred.
    pub expense_date: NaiveDate,
}

/// A newly submitted expense with its plan.
#[derive(Debug, Clone)]
pub struct Submission {
    /// The expense, `PendingApproval` or auto-`Approved`.
    pub expense: Expense,
    /// Its approval steps, empty when auto-approved.
    pub steps: Vec<ApprovalStep>,
    /// The `ExpenseSubmitted` event.
    pub audit: AuditEvent,
}

impl Submission {
    /// Returns true if the expense was approved without any step.
    #[must_use]
    pub fn is_auto_approved(&self) -> bool {
        self.steps.is_empty() && self.expense.status == ExpenseStatus::Approved
    }
}

/// An expense status change outside the approval gate.
#[derive(Debug, Clone)]
pub struct StatusChange {
    /// The expense after the change.
    pub expense: Expense,
    /// Status before the change.
    pub previous: ExpenseStatus,
    /// Event describing the change.
    pub audit: AuditEvent,
}

/// Stateless service for expense lifecycle transitions.
pub struct WorkflowService;

impl WorkflowService {
    /// Validates a claim before submission.
    ///
    /// # Errors
    ///
    /// `Validation` for a non-positive amount, a malformed currency code or a
    /// description that is blank or longer than [`MAX_DESCRIPTION_LEN`].
    pub fn validate_claim(claim: &ExpenseClaim) -> Result<(), ApprovalError> {
        if claim.amount <= Decimal::ZERO {
            return Err(ApprovalError::Validation(
                "amount must be greater than zero".to_string(),
            ));
        }
        if normalize_currency_code(&claim.currency).is_none() {
            return Err(ApprovalError::Validation(format!(
                "'{}' is not a three-letter currency code",
                claim.currency
            )));
        }
        let len = claim.description.trim().chars().count();
        if len == 0 || len > MAX_DESCRIPTION_LEN {
            return Err(ApprovalError::Validation(format!(
                "description must be between 1 and {MAX_DESCRIPTION_LEN} characters"
            )));
        }
        Ok(())
    }

    /// Submits a claim and builds its approval plan.
    ///
    /// `rate_to_base` converts the claim currency into the company base
    /// currency and must already be resolved. `rule` is the company's active
    /// rule, if any.
    ///
    /// # Errors
    ///
    /// * `Validation` for a malformed claim, an amount whose conversion
    ///   overflows, or a submitter outside `company`
    /// * `ExchangeRate` for a non-positive rate
    /// * `Configuration` if the rule cannot be used
    pub fn submit(
        claim: ExpenseClaim,
        submitter: &User,
        company: &Company,
        rate_to_base: Decimal,
        rule: Option<&ApprovalRule>,
        base_scale: u32,
    ) -> Result<Submission, ApprovalError> {
        Self::validate_claim(&claim)?;
        if submitter.company_id != company.id {
            return Err(ApprovalError::Validation(format!(
                "user {} does not belong to company {}",
                submitter.id, company.id
            )));
        }
        if rate_to_base <= Decimal::ZERO {
            return Err(ApprovalError::ExchangeRate(format!(
                "non-positive rate {rate_to_base} for {}",
                claim.currency
            )));
        }

        let amount_in_base = convert_amount(claim.amount, rate_to_base, base_scale)
            .ok_or_else(|| {
                ApprovalError::Validation("amount too large to convert".to_string())
            })?;
        let currency = normalize_currency_code(&claim.currency).unwrap_or_default();
        let now = Utc::now();
        let mut expense = Expense {
            id: ExpenseId::new(),
            company_id: company.id,
            submitter_id: submitter.id,
            submitter_manager_id: submitter.manager_id,
            amount: claim.amount,
            currency,
            amount_in_base,
            exchange_rate_to_base: rate_to_base,
            category: claim.category,
            description: claim.description.trim().to_string(),
            expense_date: claim.expense_date,
            status: ExpenseStatus::Submitted,
            policy: None,
            created_at: now,
            updated_at: now,
        };

        let steps = PlanBuilder::build(&expense, submitter, rule)?;
        if steps.is_empty() {
            expense.status = ExpenseStatus::Approved;
        } else {
            expense.status = ExpenseStatus::PendingApproval;
            expense.policy = rule.map(ApprovalRule::policy);
        }

        let audit = AuditEvent::for_expense(
            submitter.id,
            expense.id,
            AuditAction::ExpenseSubmitted,
            format!("Expense submitted: {}", expense.description),
        );

        Ok(Submission {
            expense,
            steps,
            audit,
        })
    }

    /// Forces an expense to `Approved` or `Rejected`, bypassing the gate.
    ///
    /// Steps are left as they are.
    ///
    /// # Errors
    ///
    /// * `PermissionDenied` unless `actor` is an admin of the expense's company
    /// * `Validation` if `reason` is blank
    /// * `InvalidTransition` if the expense is already paid
    pub fn admin_override(
        expense: &Expense,
        actor: &User,
        decision: Decision,
        reason: &str,
    ) -> Result<StatusChange, ApprovalError> {
        require_company_admin(actor, expense, "override expenses")?;

        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ApprovalError::Validation(
                "override reason is required".to_string(),
            ));
        }

        let target = decision.expense_status();
        if expense.status == ExpenseStatus::Paid {
            return Err(ApprovalError::InvalidTransition {
                from: expense.status,
                to: target,
            });
        }

        let audit = AuditEvent::for_expense(
            actor.id,
            expense.id,
            AuditAction::ExpenseOverride,
            format!("Admin override to {target}: {reason}"),
        );
        Ok(Self::change_status(expense, target, audit))
    }

    /// Marks an approved expense as reimbursed.
    ///
    /// # Errors
    ///
    /// * `PermissionDenied` unless `actor` is an admin of the expense's company
    /// * `InvalidTransition` unless the expense is `Approved`
    pub fn mark_paid(expense: &Expense, actor: &User) -> Result<StatusChange, ApprovalError> {
        require_company_admin(actor, expense, "mark expenses as paid")?;

        if !Self::is_valid_transition(expense.status, ExpenseStatus::Paid) {
            return Err(ApprovalError::InvalidTransition {
                from: expense.status,
                to: ExpenseStatus::Paid,
            });
        }

        let audit = AuditEvent::for_expense(
            actor.id,
            expense.id,
            AuditAction::ExpensePaid,
            format!("Expense paid: {} {}", expense.amount, expense.currency),
        );
        Ok(Self::change_status(expense, ExpenseStatus::Paid, audit))
    }

    fn change_status(expense: &Expense, status: ExpenseStatus, audit: AuditEvent) -> StatusChange {
        let mut updated = expense.clone();
        updated.status = status;
        updated.updated_at = Utc::now();
        StatusChange {
            expense: updated,
            previous: expense.status,
            audit,
        }
    }

    /// Check if a status transition is valid outside admin override.
    ///
    /// Valid transitions:
    /// - Submitted → PendingApproval (plan has steps)
    /// - Submitted → Approved (auto-approval)
    /// - PendingApproval → Approved | Rejected
    /// - Approved → Paid
    #[must_use]
    pub fn is_valid_transition(from: ExpenseStatus, to: ExpenseStatus) -> bool {
        matches!(
            (from, to),
            (
                ExpenseStatus::Submitted,
                ExpenseStatus::PendingApproval | ExpenseStatus::Approved
            ) | (
                ExpenseStatus::PendingApproval,
                ExpenseStatus::Approved | ExpenseStatus::Rejected
            ) | (ExpenseStatus::Approved, ExpenseStatus::Paid)
        )
    }
}
