//! Persistence interface for the approval workflow.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use claimflow_core::workflow::{ApprovalRule, ApprovalStep, Company, Expense, User};
use claimflow_shared::types::{ApprovalRuleId, CompanyId, ExpenseId, UserId};

use crate::error::StoreError;

/// One state change of one expense, committed as a unit.
#[derive(Debug, Clone)]
pub struct Transition {
    /// The expense after the change.
    pub expense: Expense,
    /// Steps to insert or replace, matched by id.
    pub steps: Vec<ApprovalStep>,
    /// `updated_at` the caller loaded; `None` for a new expense.
    pub expected_updated_at: Option<DateTime<Utc>>,
}

impl Transition {
    /// A newly submitted expense and its plan.
    #[must_use]
    pub fn create(expense: Expense, steps: Vec<ApprovalStep>) -> Self {
        Self {
            expense,
            steps,
            expected_updated_at: None,
        }
    }

    /// A change to an expense last seen with `loaded_at` as its `updated_at`.
    #[must_use]
    pub fn update(expense: Expense, steps: Vec<ApprovalStep>, loaded_at: DateTime<Utc>) -> Self {
        Self {
            expense,
            steps,
            expected_updated_at: Some(loaded_at),
        }
    }
}

/// Storage for companies, users, rules, expenses and approval steps.
///
/// `commit` must apply the expense and all of its steps atomically and fail
/// without writing anything when `expected_updated_at` does not match.
#[async_trait]
pub trait ApprovalRepository: Send + Sync {
    /// Fetches a company.
    async fn load_company(&self, id: CompanyId) -> Result<Option<Company>, StoreError>;

    /// Fetches a user.
    async fn load_user(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// Fetches an expense.
    async fn load_expense(&self, id: ExpenseId) -> Result<Option<Expense>, StoreError>;

    /// Fetches the steps of an expense in sequence order.
    async fn load_steps(&self, expense_id: ExpenseId) -> Result<Vec<ApprovalStep>, StoreError>;

    /// Fetches every active rule of a company; more than one is a misconfiguration.
    async fn load_active_rules(
        &self,
        company_id: CompanyId,
    ) -> Result<Vec<ApprovalRule>, StoreError>;

    /// Fetches every expense of a company.
    async fn list_expenses(&self, company_id: CompanyId) -> Result<Vec<Expense>, StoreError>;

    /// Inserts or replaces a company.
    async fn save_company(&self, company: Company) -> Result<(), StoreError>;

    /// Inserts or replaces a user.
    async fn save_user(&self, user: User) -> Result<(), StoreError>;

    /// Stores a rule. When it is active, every other active rule of the same
    /// company is deactivated in the same write; their ids are returned.
    async fn save_rule(&self, rule: ApprovalRule) -> Result<Vec<ApprovalRuleId>, StoreError>;

    /// Applies a transition atomically.
    async fn commit(&self, transition: Transition) -> Result<(), StoreError>;
}
