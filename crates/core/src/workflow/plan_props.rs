//! Property-based tests for plan construction and submission.

use proptest::prelude::*;
use rust_decimal::Decimal;

use claimflow_shared::types::{CompanyId, UserId};

use crate::workflow::plan::PlanBuilder;
use crate::workflow::service::{ExpenseClaim, WorkflowService};
use crate::workflow::test_support::{expense_for, rule, user};
use crate::workflow::types::{Company, ExpenseCategory, ExpenseStatus, StepSource, UserRole};

/// Shape of a rule: manager gate, submitter has a manager, specific approver, approver count.
fn arb_shape() -> impl Strategy<Value = (bool, bool, bool, usize)> {
    (any::<bool>(), any::<bool>(), any::<bool>(), 0usize..6)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Orders run 0..n in construction order and n matches the rule shape.
    #[test]
    fn prop_plan_orders_are_contiguous(
        (manager_first, has_manager, has_specific, count) in arb_shape(),
        sequential in any::<bool>(),
        pct in 1u8..=100,
    ) {
        let company = CompanyId::new();
        let manager = user(company, UserRole::Manager, None);
        let employee = user(company, UserRole::Employee, has_manager.then_some(manager.id));
        let expense = expense_for(&employee);
        let approvers: Vec<_> = (0..count).map(|_| UserId::new()).collect();
        let mut r = rule(company, manager_first, sequential, pct, approvers.clone());
        r.specific_approver_id = has_specific.then(UserId::new);

        let steps = PlanBuilder::build(&expense, &employee, Some(&r)).unwrap();

        let expected = usize::from(manager_first && has_manager) + usize::from(has_specific) + count;
        prop_assert_eq!(steps.len(), expected);
        for (order, step) in (0u32..).zip(&steps) {
            prop_assert_eq!(step.sequence_order, order);
            prop_assert!(step.is_pending());
        }
        let tail: Vec<_> = steps
            .iter()
            .filter(|s| s.source == StepSource::RuleApprover)
            .map(|s| s.approver_id)
            .collect();
        prop_assert_eq!(tail, approvers);
        if let Some(first) = steps.first()
            && manager_first
            && has_manager
        {
            prop_assert_eq!(first.approver_id, manager.id);
        }
    }

    /// A submission is auto-approved exactly when its plan is empty.
    #[test]
    fn prop_empty_plan_means_auto_approval(
        (manager_first, has_manager, has_specific, count) in arb_shape(),
        with_rule in any::<bool>(),
        cents in 1i64..10_000_000,
    ) {
        let company = Company {
            id: CompanyId::new(),
            name: "Acme".to_string(),
            base_currency: "USD".to_string(),
        };
        let manager = user(company.id, UserRole::Manager, None);
        let employee = user(company.id, UserRole::Employee, has_manager.then_some(manager.id));
        let mut r = rule(company.id, manager_first, false, 100, (0..count).map(|_| UserId::new()).collect());
        r.specific_approver_id = has_specific.then(UserId::new);
        let claim = ExpenseClaim {
            amount: Decimal::new(cents, 2),
            currency: "USD".to_string(),
            category: ExpenseCategory::Other,
            description: "Supplies".to_string(),
            expense_date: chrono::NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
        };

        let submission = WorkflowService::submit(
            claim,
            &employee,
            &company,
            Decimal::ONE,
            with_rule.then_some(&r),
            2,
        )
        .unwrap();

        if submission.steps.is_empty() {
            prop_assert_eq!(submission.expense.status, ExpenseStatus::Approved);
            prop_assert!(submission.expense.policy.is_none());
        } else {
            prop_assert_eq!(submission.expense.status, ExpenseStatus::PendingApproval);
            prop_assert_eq!(submission.expense.policy, Some(r.policy()));
        }
        prop_assert_eq!(submission.expense.amount_in_base, Decimal::new(cents, 2));
    }
}
