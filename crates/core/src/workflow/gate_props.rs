//! Property-based tests for the gate evaluator.

use proptest::prelude::*;

use claimflow_shared::types::CompanyId;

use crate::workflow::error::ApprovalError;
use crate::workflow::gate::GateEvaluator;
use crate::workflow::plan::PlanBuilder;
use crate::workflow::test_support::{admins, expense_for, rule, user};
use crate::workflow::types::{
    ApprovalStep, Decision, Expense, ExpenseStatus, StepStatus, User, UserRole,
};

/// Number of approvers and the order in which they act.
fn arb_acting_order() -> impl Strategy<Value = (usize, Vec<usize>)> {
    (1usize..8).prop_flat_map(|n| (Just(n), Just((0..n).collect::<Vec<_>>()).prop_shuffle()))
}

fn planned(sequential: bool, pct: u8, n: usize) -> (Vec<User>, Expense, Vec<ApprovalStep>) {
    let company = CompanyId::new();
    let employee = user(company, UserRole::Employee, None);
    let approvers = admins(company, n);
    let r = rule(company, false, sequential, pct, approvers.iter().map(|u| u.id).collect());
    let mut expense = expense_for(&employee);
    let steps = PlanBuilder::build(&expense, &employee, Some(&r)).unwrap();
    expense.status = ExpenseStatus::PendingApproval;
    expense.policy = Some(r.policy());
    (approvers, expense, steps)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // =========================================================================
    // Parallel rules: any order, first threshold crossing decides
    // =========================================================================

    /// The expense becomes Approved on the first approval reaching the
    /// threshold, and no later action changes it.
    #[test]
    fn prop_parallel_threshold_crossing(
        (n, order) in arb_acting_order(),
        pct in 1u8..=100,
    ) {
        let (approvers, mut expense, mut steps) = planned(false, pct, n);
        let needed = (1..=n).find(|k| k * 100 / n >= usize::from(pct)).unwrap();

        for (acted, idx) in (1..).zip(&order) {
            let result =
                GateEvaluator::record_action(&expense, &steps, &approvers[*idx], Decision::Approve, None);
            if acted <= needed {
                let outcome = result.unwrap();
                prop_assert_eq!(outcome.is_decisive(), acted == needed);
                expense = outcome.expense;
                steps = outcome.steps;
            } else {
                let is_resolved = matches!(result, Err(ApprovalError::AlreadyResolved { .. }));
                prop_assert!(is_resolved);
            }
        }

        prop_assert_eq!(expense.status, ExpenseStatus::Approved);
        let approved = steps.iter().filter(|s| s.status == StepStatus::Approved).count();
        prop_assert_eq!(approved, needed);
    }

    // =========================================================================
    // Sequential rules: a later step never moves before an earlier one
    // =========================================================================

    /// Acting on step k while a lower step is pending fails and changes nothing.
    #[test]
    fn prop_sequential_blocks_out_of_order(
        (n, order) in arb_acting_order(),
    ) {
        let (approvers, mut expense, mut steps) = planned(true, 100, n);
        let mut next = 0usize;

        for idx in order {
            let result =
                GateEvaluator::record_action(&expense, &steps, &approvers[idx], Decision::Approve, None);
            if idx == next {
                let outcome = result.unwrap();
                expense = outcome.expense;
                steps = outcome.steps;
                next += 1;
            } else {
                let blocked = matches!(result, Err(ApprovalError::OutOfSequence { .. }));
                prop_assert!(blocked);
            }
        }

        // resolved steps always form a prefix
        prop_assert!(steps.iter().skip_while(|s| !s.is_pending()).all(ApprovalStep::is_pending));
        prop_assert_eq!(expense.status == ExpenseStatus::Approved, next == n);
    }

    // =========================================================================
    // Rejection is final
    // =========================================================================

    /// One rejection decides the expense; nobody can approve it afterwards.
    #[test]
    fn prop_rejection_is_final(
        (n, order) in arb_acting_order(),
        reject_at in 0usize..8,
        pct in 1u8..=100,
    ) {
        let (approvers, mut expense, mut steps) = planned(false, pct, n);
        let reject_at = reject_at % n;
        let needed = (1..=n).find(|k| k * 100 / n >= usize::from(pct)).unwrap();

        for (i, idx) in order.iter().enumerate() {
            let decision = if i == reject_at { Decision::Reject } else { Decision::Approve };
            match GateEvaluator::record_action(&expense, &steps, &approvers[*idx], decision, None) {
                Ok(outcome) => {
                    expense = outcome.expense;
                    steps = outcome.steps;
                }
                Err(err) => {
                    let is_resolved = matches!(err, ApprovalError::AlreadyResolved { .. });
                    prop_assert!(is_resolved);
                }
            }
        }

        if reject_at < needed {
            prop_assert_eq!(expense.status, ExpenseStatus::Rejected);
        } else {
            prop_assert_eq!(expense.status, ExpenseStatus::Approved);
        }
    }
}
