//! Fixtures shared by the workflow unit and property tests.

use chrono::{NaiveDate, Utc};
use rust_decimal_macros::dec;

use claimflow_shared::types::{ApprovalRuleId, CompanyId, ExpenseId, UserId};

use super::types::{
    ApprovalRule, Expense, ExpenseCategory, ExpenseStatus, User, UserRole,
};

pub fn user(company_id: CompanyId, role: UserRole, manager_id: Option<UserId>) -> User {
    User {
        id: UserId::new(),
        company_id,
        role,
        manager_id,
        full_name: format!("{} user", role.as_str()),
        is_active: true,
    }
}

/// A freshly submitted expense; the plan has not been attached yet.
pub fn expense_for(submitter: &User) -> Expense {
    let now = Utc::now();
    Expense {
        id: ExpenseId::new(),
        company_id: submitter.company_id,
        submitter_id: submitter.id,
        submitter_manager_id: submitter.manager_id,
        amount: dec!(120.00),
        currency: "USD".to_string(),
        amount_in_base: dec!(120.00),
        exchange_rate_to_base: dec!(1),
        category: ExpenseCategory::Travel,
        description: "Taxi to client site".to_string(),
        expense_date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
        status: ExpenseStatus::Submitted,
        policy: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn rule(
    company_id: CompanyId,
    requires_manager_first: bool,
    sequential: bool,
    min_approval_percentage: u8,
    approvers: Vec<UserId>,
) -> ApprovalRule {
    ApprovalRule {
        id: ApprovalRuleId::new(),
        company_id,
        name: "Default".to_string(),
        description: None,
        requires_manager_first,
        sequential,
        min_approval_percentage,
        specific_approver_id: None,
        approvers,
        is_active: true,
    }
}

/// Admins in `company`; admins pass the permission check on any expense.
pub fn admins(company_id: CompanyId, count: usize) -> Vec<User> {
    (0..count)
        .map(|_| user(company_id, UserRole::Admin, None))
        .collect()
}
