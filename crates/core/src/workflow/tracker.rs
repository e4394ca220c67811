//! Per-expense approval state.

use chrono::{DateTime, Utc};

use claimflow_shared::types::{ApprovalStepId, ExpenseId, UserId};

use crate::workflow::error::ApprovalError;
use crate::workflow::types::{ApprovalStep, StepStatus};

/// The steps of one expense, kept sorted by sequence order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalTracker {
    expense_id: ExpenseId,
    steps: Vec<ApprovalStep>,
}

impl ApprovalTracker {
    /// Wraps the stored steps of an expense.
    ///
    /// # Errors
    ///
    /// `Storage` if the steps belong to different expenses or their sequence
    /// orders are not contiguous from 0.
    pub fn new(expense_id: ExpenseId, mut steps: Vec<ApprovalStep>) -> Result<Self, ApprovalError> {
        steps.sort_by_key(|s| s.sequence_order);

        if let Some(stray) = steps.iter().find(|s| s.expense_id != expense_id) {
            return Err(ApprovalError::Storage(format!(
                "step {} belongs to expense {}, not {expense_id}",
                stray.id, stray.expense_id
            )));
        }
        for (expected, step) in (0u32..).zip(&steps) {
            if step.sequence_order != expected {
                return Err(ApprovalError::Storage(format!(
                    "expense {expense_id} has a gap in step order at {expected}"
                )));
            }
        }

        Ok(Self { expense_id, steps })
    }

    /// The expense these steps belong to.
    #[must_use]
    pub fn expense_id(&self) -> ExpenseId {
        self.expense_id
    }

    /// All steps, in sequence order.
    #[must_use]
    pub fn steps(&self) -> &[ApprovalStep] {
        &self.steps
    }

    /// Consumes the tracker, returning the steps.
    #[must_use]
    pub fn into_steps(self) -> Vec<ApprovalStep> {
        self.steps
    }

    /// Total number of steps ever created for the expense.
    #[must_use]
    pub fn total(&self) -> usize {
        self.steps.len()
    }

    /// Number of approved steps.
    #[must_use]
    pub fn approved_count(&self) -> usize {
        self.count(StepStatus::Approved)
    }

    /// Number of steps still pending.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.count(StepStatus::Pending)
    }

    fn count(&self, status: StepStatus) -> usize {
        self.steps.iter().filter(|s| s.status == status).count()
    }

    /// Percentage of approved steps, truncated toward zero.
    ///
    /// Returns 0 for an empty plan.
    #[must_use]
    pub fn approval_percentage(&self) -> usize {
        match self.total() {
            0 => 0,
            total => self.approved_count() * 100 / total,
        }
    }

    /// The lowest-ordered pending step assigned to `approver_id`.
    #[must_use]
    pub fn pending_step_for(&self, approver_id: UserId) -> Option<&ApprovalStep> {
        self.steps
            .iter()
            .find(|s| s.approver_id == approver_id && s.is_pending())
    }

    /// The lowest-ordered pending step placed before `sequence_order`.
    #[must_use]
    pub fn first_pending_before(&self, sequence_order: u32) -> Option<&ApprovalStep> {
        self.steps
            .iter()
            .take_while(|s| s.sequence_order < sequence_order)
            .find(|s| s.is_pending())
    }

    /// Resolves a pending step.
    ///
    /// # Errors
    ///
    /// * `Validation` if `status` is `Pending`
    /// * `Storage` if the step is unknown
    /// * `NoPendingStep` if the step was already resolved
    pub fn resolve(
        &mut self,
        step_id: ApprovalStepId,
        status: StepStatus,
        comment: Option<String>,
        acted_at: DateTime<Utc>,
    ) -> Result<&ApprovalStep, ApprovalError> {
        if status == StepStatus::Pending {
            return Err(ApprovalError::Validation(
                "a step cannot be resolved back to pending".to_string(),
            ));
        }

        let expense_id = self.expense_id;
        let step = self
            .steps
            .iter_mut()
            .find(|s| s.id == step_id)
            .ok_or_else(|| {
                ApprovalError::Storage(format!("step {step_id} not found on expense {expense_id}"))
            })?;

        if !step.is_pending() {
            return Err(ApprovalError::NoPendingStep {
                expense_id,
                approver_id: step.approver_id,
            });
        }

        step.status = status;
        step.comment = comment;
        step.acted_at = Some(acted_at);
        Ok(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::types::StepSource;

    fn steps_for(expense_id: ExpenseId, approvers: &[UserId]) -> Vec<ApprovalStep> {
        (0u32..)
            .zip(approvers)
            .map(|(order, id)| ApprovalStep::pending(expense_id, *id, order, StepSource::RuleApprover))
            .collect()
    }

    #[test]
    fn test_new_sorts_and_validates() {
        let expense_id = ExpenseId::new();
        let mut steps = steps_for(expense_id, &[UserId::new(), UserId::new(), UserId::new()]);
        steps.reverse();

        let tracker = ApprovalTracker::new(expense_id, steps).unwrap();
        let orders: Vec<_> = tracker.steps().iter().map(|s| s.sequence_order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
        assert_eq!(tracker.total(), 3);
        assert_eq!(tracker.pending_count(), 3);
    }

    #[test]
    fn test_new_rejects_gap() {
        let expense_id = ExpenseId::new();
        let mut steps = steps_for(expense_id, &[UserId::new(), UserId::new()]);
        steps[1].sequence_order = 2;

        assert!(matches!(
            ApprovalTracker::new(expense_id, steps),
            Err(ApprovalError::Storage(_))
        ));
    }

    #[test]
    fn test_new_rejects_foreign_step() {
        let expense_id = ExpenseId::new();
        let steps = steps_for(ExpenseId::new(), &[UserId::new()]);

        assert!(ApprovalTracker::new(expense_id, steps).is_err());
    }

    #[test]
    fn test_percentage_truncates() {
        let expense_id = ExpenseId::new();
        let approvers = [UserId::new(), UserId::new(), UserId::new()];
        let mut tracker = ApprovalTracker::new(expense_id, steps_for(expense_id, &approvers)).unwrap();
        assert_eq!(tracker.approval_percentage(), 0);

        for step_id in [tracker.steps()[0].id, tracker.steps()[2].id] {
            tracker
                .resolve(step_id, StepStatus::Approved, None, Utc::now())
                .unwrap();
        }
        // 200 / 3 = 66.67, truncated
        assert_eq!(tracker.approval_percentage(), 66);
        assert_eq!(tracker.approved_count(), 2);
    }

    #[test]
    fn test_pending_lookups() {
        let expense_id = ExpenseId::new();
        let dup = UserId::new();
        let other = UserId::new();
        let mut tracker =
            ApprovalTracker::new(expense_id, steps_for(expense_id, &[other, dup, dup])).unwrap();

        assert_eq!(tracker.pending_step_for(dup).unwrap().sequence_order, 1);
        assert_eq!(tracker.first_pending_before(2).unwrap().sequence_order, 0);
        assert!(tracker.first_pending_before(0).is_none());

        let first = tracker.steps()[0].id;
        tracker
            .resolve(first, StepStatus::Approved, None, Utc::now())
            .unwrap();
        assert_eq!(tracker.first_pending_before(2).unwrap().sequence_order, 1);
        assert!(tracker.pending_step_for(other).is_none());
    }

    #[test]
    fn test_resolve_is_write_once() {
        let expense_id = ExpenseId::new();
        let mut tracker =
            ApprovalTracker::new(expense_id, steps_for(expense_id, &[UserId::new()])).unwrap();
        let step_id = tracker.steps()[0].id;

        let acted = Utc::now();
        let step = tracker
            .resolve(step_id, StepStatus::Rejected, Some("no receipt".into()), acted)
            .unwrap();
        assert_eq!(step.status, StepStatus::Rejected);
        assert_eq!(step.acted_at, Some(acted));
        assert_eq!(step.comment.as_deref(), Some("no receipt"));

        let again = tracker.resolve(step_id, StepStatus::Approved, None, Utc::now());
        assert!(matches!(again, Err(ApprovalError::NoPendingStep { .. })));
        assert_eq!(tracker.steps()[0].status, StepStatus::Rejected);
        assert_eq!(tracker.steps()[0].acted_at, Some(acted));
    }

    #[test]
    fn test_resolve_rejects_pending_target() {
        let expense_id = ExpenseId::new();
        let mut tracker =
            ApprovalTracker::new(expense_id, steps_for(expense_id, &[UserId::new()])).unwrap();
        let step_id = tracker.steps()[0].id;

        assert!(matches!(
            tracker.resolve(step_id, StepStatus::Pending, None, Utc::now()),
            Err(ApprovalError::Validation(_))
        ));
    }
}
