//! Approval plan construction.
//!
//! A plan is built exactly once per expense, at submission. Step order is
//! fixed: the submitter's manager (when the rule asks for it), then the
//! rule's specific approver, then the rule approvers in configured order.
//! The same person may appear more than once; each occurrence is its own step.

use crate::workflow::error::ApprovalError;
use crate::workflow::types::{ApprovalRule, ApprovalStep, Expense, StepSource, User};

/// Stateless builder for approval plans.
pub struct PlanBuilder;

impl PlanBuilder {
    /// Builds the ordered pending steps for `expense`.
    ///
    /// An empty result means the expense is auto-approved. `rule` must be the
    /// company's active rule; `None` means the company has no rule.
    ///
    /// # Errors
    ///
    /// * `Configuration` if the rule belongs to another company, is inactive,
    ///   or carries a percentage outside 1..=100
    pub fn build(
        expense: &Expense,
        submitter: &User,
        rule: Option<&ApprovalRule>,
    ) -> Result<Vec<ApprovalStep>, ApprovalError> {
        let Some(rule) = rule else {
            return Ok(Vec::new());
        };
        Self::check_rule(expense, rule)?;

        let mut approvers = Vec::with_capacity(rule.approvers.len() + 2);
        if rule.requires_manager_first
            && let Some(manager_id) = submitter.manager_id
        {
            approvers.push((manager_id, StepSource::Manager));
        }
        if let Some(specific) = rule.specific_approver_id {
            approvers.push((specific, StepSource::SpecificApprover));
        }
        approvers.extend(
            rule.approvers
                .iter()
                .map(|id| (*id, StepSource::RuleApprover)),
        );

        let steps = approvers
            .into_iter()
            .zip(0u32..)
            .map(|((approver_id, source), order)| {
                ApprovalStep::pending(expense.id, approver_id, order, source)
            })
            .collect();

        Ok(steps)
    }

    fn check_rule(expense: &Expense, rule: &ApprovalRule) -> Result<(), ApprovalError> {
        if rule.company_id != expense.company_id {
            return Err(ApprovalError::Configuration(format!(
                "rule {} does not belong to the expense's company",
                rule.id
            )));
        }
        if !rule.is_active {
            return Err(ApprovalError::Configuration(format!(
                "rule {} is inactive",
                rule.id
            )));
        }
        validate_percentage(rule.min_approval_percentage)
    }
}

/// Checks that a minimum approval percentage lies in 1..=100.
pub fn validate_percentage(percentage: u8) -> Result<(), ApprovalError> {
    if (1..=100).contains(&percentage) {
        Ok(())
    } else {
        Err(ApprovalError::Configuration(format!(
            "minimum approval percentage must be between 1 and 100, got {percentage}"
        )))
    }
}
