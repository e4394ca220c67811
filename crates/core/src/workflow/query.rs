//! Expense listing filters and per-status statistics.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use claimflow_shared::types::UserId;

use crate::workflow::error::ApprovalError;
use crate::workflow::permission::can_view;
use crate::workflow::types::{Expense, ExpenseCategory, ExpenseStatus, User};

/// Optional criteria for listing expenses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseFilter {
    /// Only this status.
    #[serde(default)]
    pub status: Option<ExpenseStatus>,
    /// Only this category.
    #[serde(default)]
    pub category: Option<ExpenseCategory>,
    /// Only this submitter.
    #[serde(default)]
    pub submitter_id: Option<UserId>,
}

impl ExpenseFilter {
    /// Returns true if `expense` satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, expense: &Expense) -> bool {
        self.status.is_none_or(|s| s == expense.status)
            && self.category.is_none_or(|c| c == expense.category)
            && self.submitter_id.is_none_or(|id| id == expense.submitter_id)
    }

    /// Expenses `actor` may view that match the filter, newest first.
    #[must_use]
    pub fn visible<'a>(
        &self,
        actor: &User,
        expenses: impl IntoIterator<Item = &'a Expense>,
    ) -> Vec<&'a Expense> {
        let mut visible: Vec<_> = expenses
            .into_iter()
            .filter(|e| can_view(actor, e) && self.matches(e))
            .collect();
        visible.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        visible
    }
}

/// Count and base-currency total of expenses in one status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTotals {
    /// Number of expenses.
    pub count: usize,
    /// Sum of `amount_in_base`.
    pub total_amount: Decimal,
}

/// Per-status totals, keyed by status name.
pub type ExpenseStatistics = BTreeMap<String, StatusTotals>;

/// Groups expenses by status. Statuses with no expense are absent.
///
/// # Errors
///
/// `Validation` if a status total does not fit in a `Decimal`.
pub fn summarize<'a>(
    expenses: impl IntoIterator<Item = &'a Expense>,
) -> Result<ExpenseStatistics, ApprovalError> {
    let mut stats = ExpenseStatistics::new();
    for expense in expenses {
        let entry = stats.entry(expense.status.as_str().to_string()).or_default();
        entry.count += 1;
        entry.total_amount = entry
            .total_amount
            .checked_add(expense.amount_in_base)
            .ok_or_else(|| {
                ApprovalError::Validation(format!("{} total overflows", expense.status))
            })?;
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::test_support::{expense_for, user};
    use crate::workflow::types::UserRole;
    use chrono::Duration;
    use claimflow_shared::types::CompanyId;
    use rust_decimal_macros::dec;

    #[test]
    fn test_filter_matches() {
        let employee = user(CompanyId::new(), UserRole::Employee, None);
        let expense = expense_for(&employee);

        assert!(ExpenseFilter::default().matches(&expense));
        let by_status = ExpenseFilter {
            status: Some(ExpenseStatus::Submitted),
            ..ExpenseFilter::default()
        };
        assert!(by_status.matches(&expense));
        let by_category = ExpenseFilter {
            category: Some(ExpenseCategory::Meals),
            ..ExpenseFilter::default()
        };
        assert!(!by_category.matches(&expense));
        let by_other = ExpenseFilter {
            submitter_id: Some(UserId::new()),
            ..ExpenseFilter::default()
        };
        assert!(!by_other.matches(&expense));
    }

    #[test]
    fn test_visible_respects_permissions_and_order() {
        let company = CompanyId::new();
        let manager = user(company, UserRole::Manager, None);
        let report = user(company, UserRole::Employee, Some(manager.id));
        let stranger = user(company, UserRole::Employee, None);

        let older = expense_for(&report);
        let mut newer = expense_for(&report);
        newer.created_at = older.created_at + Duration::minutes(5);
        let unrelated = expense_for(&stranger);
        let all = [older.clone(), unrelated.clone(), newer.clone()];

        let seen = ExpenseFilter::default().visible(&manager, &all);
        let ids: Vec<_> = seen.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);

        let own = ExpenseFilter::default().visible(&stranger, &all);
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].id, unrelated.id);
    }

    #[test]
    fn test_summarize() {
        let employee = user(CompanyId::new(), UserRole::Employee, None);
        let mut a = expense_for(&employee);
        a.amount_in_base = dec!(10.50);
        let mut b = expense_for(&employee);
        b.amount_in_base = dec!(4.25);
        let mut c = expense_for(&employee);
        c.status = ExpenseStatus::Paid;
        c.amount_in_base = dec!(99);

        let stats = summarize([&a, &b, &c]).unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats["submitted"].count, 2);
        assert_eq!(stats["submitted"].total_amount, dec!(14.75));
        assert_eq!(stats["paid"].count, 1);
        assert!(!stats.contains_key("approved"));
    }

    #[test]
    fn test_summarize_overflow_is_an_error() {
        let employee = user(CompanyId::new(), UserRole::Employee, None);
        let mut a = expense_for(&employee);
        a.amount_in_base = Decimal::MAX;
        let mut b = expense_for(&employee);
        b.amount_in_base = dec!(1);

        let err = summarize([&a, &b]).unwrap_err();
        assert_eq!(err.kind(), crate::workflow::error::ErrorKind::Validation);
    }
}
