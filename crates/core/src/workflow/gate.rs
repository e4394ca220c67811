//! Gate evaluation for approval actions.
//!
//! Decides whether an actor may record a decision now and what the expense
//! status becomes afterwards. The evaluator is pure: it works on copies and
//! hands back the new state, so a failed call leaves the caller's state as it
//! was and a successful one can be committed atomically.

use chrono::Utc;

use claimflow_shared::types::ApprovalStepId;

use crate::workflow::audit::{AuditAction, AuditEvent};
use crate::workflow::error::ApprovalError;
use crate::workflow::permission::can_act;
use crate::workflow::tracker::ApprovalTracker;
use crate::workflow::types::{
    ApprovalPolicy, ApprovalStep, Decision, Expense, ExpenseStatus, User,
};

/// Maximum length of an approver comment, in characters.
pub const MAX_COMMENT_LEN: usize = 500;

/// Result of a recorded approval action.
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    /// The expense after the action.
    pub expense: Expense,
    /// All steps of the expense after the action.
    pub steps: Vec<ApprovalStep>,
    /// The step that was resolved.
    pub step_id: ApprovalStepId,
    /// Present only when the action moved the expense to a final status.
    pub audit: Option<AuditEvent>,
}

impl ActionOutcome {
    /// The resolved step.
    #[must_use]
    pub fn step(&self) -> Option<&ApprovalStep> {
        self.steps.iter().find(|s| s.id == self.step_id)
    }

    /// Returns true if this action decided the expense.
    #[must_use]
    pub fn is_decisive(&self) -> bool {
        self.audit.is_some()
    }
}

/// Stateless evaluator for approval actions.
pub struct GateEvaluator;

impl GateEvaluator {
    /// Records `decision` by `actor` on `expense`.
    ///
    /// Checks, in order: comment length, permission, a pending step for the
    /// actor, the expense still awaiting approval, and (for sequential
    /// policies) no earlier step pending. A rejection decides the expense at
    /// once; an approval decides it when the truncated approval percentage
    /// reaches the policy minimum.
    ///
    /// # Errors
    ///
    /// * `Validation` if the comment is too long
    /// * `PermissionDenied` if the actor may not act on the expense
    /// * `NoPendingStep` if the actor has no pending step
    /// * `AlreadyResolved` if the expense is no longer pending approval
    /// * `OutOfSequence` if an earlier step of a sequential policy is pending
    /// * `Storage` if the stored steps are inconsistent
    pub fn record_action(
        expense: &Expense,
        steps: &[ApprovalStep],
        actor: &User,
        decision: Decision,
        comment: Option<String>,
    ) -> Result<ActionOutcome, ApprovalError> {
        if let Some(text) = &comment
            && text.chars().count() > MAX_COMMENT_LEN
        {
            return Err(ApprovalError::Validation(format!(
                "comment must be at most {MAX_COMMENT_LEN} characters"
            )));
        }

        let mut tracker = ApprovalTracker::new(expense.id, steps.to_vec())?;
        let (step_id, policy) = Self::check_eligibility(expense, &tracker, actor)?;

        let now = Utc::now();
        tracker.resolve(step_id, decision.step_status(), comment.clone(), now)?;

        let mut updated = expense.clone();
        let audit = match decision {
            Decision::Reject => {
                updated.status = ExpenseStatus::Rejected;
                Some(AuditEvent::for_expense(
                    actor.id,
                    expense.id,
                    AuditAction::ExpenseRejected,
                    match &comment {
                        Some(text) => format!("Expense rejected: {text}"),
                        None => "Expense rejected".to_string(),
                    },
                ))
            }
            Decision::Approve => {
                updated.status = Self::aggregate_status(&tracker, &policy);
                (updated.status == ExpenseStatus::Approved).then(|| {
                    AuditEvent::for_expense(
                        actor.id,
                        expense.id,
                        AuditAction::ExpenseApproved,
                        format!(
                            "Expense approved: {}% of {} steps approved",
                            tracker.approval_percentage(),
                            tracker.total()
                        ),
                    )
                })
            }
        };
        updated.updated_at = now;

        Ok(ActionOutcome {
            expense: updated,
            steps: tracker.into_steps(),
            step_id,
            audit,
        })
    }

    /// Returns the step `actor` would resolve right now, with the policy in force.
    ///
    /// # Errors
    ///
    /// Same as [`GateEvaluator::record_action`], minus comment validation.
    pub fn check_eligibility(
        expense: &Expense,
        tracker: &ApprovalTracker,
        actor: &User,
    ) -> Result<(ApprovalStepId, ApprovalPolicy), ApprovalError> {
        if !can_act(actor, expense) {
            return Err(ApprovalError::PermissionDenied {
                user_id: actor.id,
                operation: "act on this expense",
            });
        }

        let step = tracker
            .pending_step_for(actor.id)
            .ok_or(ApprovalError::NoPendingStep {
                expense_id: expense.id,
                approver_id: actor.id,
            })?;

        if expense.status != ExpenseStatus::PendingApproval {
            return Err(ApprovalError::AlreadyResolved {
                expense_id: expense.id,
                status: expense.status,
            });
        }

        let policy = expense.policy.ok_or_else(|| {
            ApprovalError::Storage(format!(
                "expense {} is pending approval without a policy",
                expense.id
            ))
        })?;

        if policy.sequential
            && let Some(blocking) = tracker.first_pending_before(step.sequence_order)
        {
            return Err(ApprovalError::OutOfSequence {
                sequence_order: step.sequence_order,
                blocking_order: blocking.sequence_order,
            });
        }

        Ok((step.id, policy))
    }

    /// Status implied by the approvals recorded so far.
    ///
    /// `PendingApproval` until `100 * approved / total` (integer division)
    /// reaches the policy minimum, then `Approved`.
    #[must_use]
    pub fn aggregate_status(tracker: &ApprovalTracker, policy: &ApprovalPolicy) -> ExpenseStatus {
        if tracker.total() > 0
            && tracker.approval_percentage() >= usize::from(policy.min_approval_percentage)
        {
            ExpenseStatus::Approved
        } else {
            ExpenseStatus::PendingApproval
        }
    }
}
