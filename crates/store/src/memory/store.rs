//! In-memory approval repository.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use claimflow_core::workflow::{ApprovalRule, ApprovalStep, Company, Expense, User};
use claimflow_shared::types::{ApprovalRuleId, CompanyId, ExpenseId, UserId};

use crate::error::StoreError;
use crate::repository::{ApprovalRepository, Transition};

/// An expense together with its steps, so both change under one entry lock.
#[derive(Debug, Clone)]
struct ExpenseRecord {
    expense: Expense,
    steps: Vec<ApprovalStep>,
}

/// In-memory [`ApprovalRepository`].
///
/// Expenses and their steps live in one map entry, and all rules of a company
/// in another, so a commit or a rule swap is a single entry write.
#[derive(Debug, Default)]
pub struct MemoryStore {
    companies: DashMap<CompanyId, Company>,
    users: DashMap<UserId, User>,
    rules: DashMap<CompanyId, Vec<ApprovalRule>>,
    expenses: DashMap<ExpenseId, ExpenseRecord>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored expenses.
    pub fn expense_count(&self) -> usize {
        self.expenses.len()
    }
}

fn merge_steps(stored: &mut Vec<ApprovalStep>, updates: Vec<ApprovalStep>) {
    for step in updates {
        match stored.iter_mut().find(|s| s.id == step.id) {
            Some(existing) => *existing = step,
            None => stored.push(step),
        }
    }
    stored.sort_by_key(|s| s.sequence_order);
}

#[async_trait]
impl ApprovalRepository for MemoryStore {
    async fn load_company(&self, id: CompanyId) -> Result<Option<Company>, StoreError> {
        Ok(self.companies.get(&id).map(|c| c.value().clone()))
    }

    async fn load_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    async fn load_expense(&self, id: ExpenseId) -> Result<Option<Expense>, StoreError> {
        Ok(self.expenses.get(&id).map(|r| r.expense.clone()))
    }

    async fn load_steps(&self, expense_id: ExpenseId) -> Result<Vec<ApprovalStep>, StoreError> {
        Ok(self
            .expenses
            .get(&expense_id)
            .map(|r| r.steps.clone())
            .unwrap_or_default())
    }

    async fn load_active_rules(
        &self,
        company_id: CompanyId,
    ) -> Result<Vec<ApprovalRule>, StoreError> {
        Ok(self
            .rules
            .get(&company_id)
            .map(|rules| rules.iter().filter(|r| r.is_active).cloned().collect())
            .unwrap_or_default())
    }

    async fn list_expenses(&self, company_id: CompanyId) -> Result<Vec<Expense>, StoreError> {
        Ok(self
            .expenses
            .iter()
            .filter(|r| r.expense.company_id == company_id)
            .map(|r| r.expense.clone())
            .collect())
    }

    async fn save_company(&self, company: Company) -> Result<(), StoreError> {
        self.companies.insert(company.id, company);
        Ok(())
    }

    async fn save_user(&self, user: User) -> Result<(), StoreError> {
        self.users.insert(user.id, user);
        Ok(())
    }

    async fn save_rule(&self, rule: ApprovalRule) -> Result<Vec<ApprovalRuleId>, StoreError> {
        let mut rules = self.rules.entry(rule.company_id).or_default();

        let mut deactivated = Vec::new();
        if rule.is_active {
            for other in rules.iter_mut().filter(|r| r.is_active && r.id != rule.id) {
                other.is_active = false;
                deactivated.push(other.id);
            }
        }
        match rules.iter_mut().find(|r| r.id == rule.id) {
            Some(existing) => *existing = rule,
            None => rules.push(rule),
        }
        Ok(deactivated)
    }

    async fn commit(&self, transition: Transition) -> Result<(), StoreError> {
        let Transition {
            expense,
            steps,
            expected_updated_at,
        } = transition;

        if let Some(step) = steps.iter().find(|s| s.expense_id != expense.id) {
            return Err(StoreError::Conflict(format!(
                "step {} does not belong to expense {}",
                step.id, expense.id
            )));
        }

        match (self.expenses.entry(expense.id), expected_updated_at) {
            (Entry::Vacant(slot), None) => {
                let mut record = ExpenseRecord {
                    expense,
                    steps: Vec::new(),
                };
                merge_steps(&mut record.steps, steps);
                slot.insert(record);
                Ok(())
            }
            (Entry::Vacant(_), Some(_)) => {
                Err(StoreError::Missing(format!("expense {}", expense.id)))
            }
            (Entry::Occupied(_), None) => Err(StoreError::Conflict(format!(
                "expense {} already exists",
                expense.id
            ))),
            (Entry::Occupied(mut slot), Some(expected)) => {
                let record = slot.get_mut();
                if record.expense.updated_at != expected {
                    return Err(StoreError::Conflict(format!(
                        "expense {} was modified concurrently",
                        expense.id
                    )));
                }
                merge_steps(&mut record.steps, steps);
                record.expense = expense;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, Utc};
    use claimflow_core::workflow::{
        ExpenseCategory, ExpenseStatus, StepSource, StepStatus, UserRole,
    };
    use rust_decimal_macros::dec;

    fn expense(company_id: CompanyId) -> Expense {
        let now = Utc::now();
        Expense {
            id: ExpenseId::new(),
            company_id,
            submitter_id: UserId::new(),
            submitter_manager_id: None,
            amount: dec!(10),
            currency: "USD".to_owned(),
            amount_in_base: dec!(10),
            exchange_rate_to_base: dec!(1),
            category: ExpenseCategory::Other,
            description: "Parking".to_owned(),
            expense_date: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            status: ExpenseStatus::PendingApproval,
            policy: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn rule(company_id: CompanyId, name: &str) -> ApprovalRule {
        ApprovalRule {
            id: ApprovalRuleId::new(),
            company_id,
            name: name.to_owned(),
            description: None,
            requires_manager_first: true,
            sequential: false,
            min_approval_percentage: 100,
            specific_approver_id: None,
            approvers: vec![UserId::new()],
            is_active: true,
        }
    }

    #[tokio::test]
    async fn saving_active_rule_deactivates_previous() {
        let store = MemoryStore::new();
        let company = CompanyId::new();
        let first = rule(company, "first");
        let second = rule(company, "second");

        assert!(store.save_rule(first.clone()).await.unwrap().is_empty());
        let deactivated = store.save_rule(second.clone()).await.unwrap();
        assert_eq!(deactivated, vec![first.id]);

        let active = store.load_active_rules(company).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, second.id);

        // other companies are untouched
        let other = rule(CompanyId::new(), "other");
        assert!(store.save_rule(other).await.unwrap().is_empty());
        assert_eq!(store.load_active_rules(company).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn commit_creates_then_updates() {
        let store = MemoryStore::new();
        let mut e = expense(CompanyId::new());
        let approver = UserId::new();
        let step = ApprovalStep::pending(e.id, approver, 0, StepSource::RuleApprover);

        store
            .commit(Transition::create(e.clone(), vec![step.clone()]))
            .await
            .unwrap();
        assert_eq!(store.expense_count(), 1);

        let loaded_at = e.updated_at;
        let mut resolved = step.clone();
        resolved.status = StepStatus::Approved;
        resolved.acted_at = Some(Utc::now());
        e.status = ExpenseStatus::Approved;
        e.updated_at = loaded_at + Duration::seconds(1);
        store
            .commit(Transition::update(e.clone(), vec![resolved], loaded_at))
            .await
            .unwrap();

        assert_eq!(
            store.load_expense(e.id).await.unwrap().unwrap().status,
            ExpenseStatus::Approved
        );
        let steps = store.load_steps(e.id).await.unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].status, StepStatus::Approved);
    }

    #[tokio::test]
    async fn stale_commit_is_rejected_without_writing() {
        let store = MemoryStore::new();
        let e = expense(CompanyId::new());
        store.commit(Transition::create(e.clone(), vec![])).await.unwrap();

        let mut changed = e.clone();
        changed.status = ExpenseStatus::Rejected;
        let stale = e.updated_at - Duration::seconds(5);
        let err = store
            .commit(Transition::update(changed, vec![], stale))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(
            store.load_expense(e.id).await.unwrap().unwrap().status,
            ExpenseStatus::PendingApproval
        );
    }

    #[tokio::test]
    async fn duplicate_create_and_missing_update_fail() {
        let store = MemoryStore::new();
        let e = expense(CompanyId::new());
        store.commit(Transition::create(e.clone(), vec![])).await.unwrap();

        assert!(matches!(
            store.commit(Transition::create(e.clone(), vec![])).await,
            Err(StoreError::Conflict(_))
        ));

        let ghost = expense(CompanyId::new());
        let at = ghost.updated_at;
        assert!(matches!(
            store.commit(Transition::update(ghost, vec![], at)).await,
            Err(StoreError::Missing(_))
        ));
    }

    #[tokio::test]
    async fn lists_by_company_and_loads_users() {
        let store = MemoryStore::new();
        let company = CompanyId::new();
        store.commit(Transition::create(expense(company), vec![])).await.unwrap();
        store.commit(Transition::create(expense(company), vec![])).await.unwrap();
        store
            .commit(Transition::create(expense(CompanyId::new()), vec![]))
            .await
            .unwrap();
        assert_eq!(store.list_expenses(company).await.unwrap().len(), 2);

        let user = User {
            id: UserId::new(),
            company_id: company,
            role: UserRole::Admin,
            manager_id: None,
            full_name: "Ada".to_owned(),
            is_active: true,
        };
        store.save_user(user.clone()).await.unwrap();
        assert_eq!(store.load_user(user.id).await.unwrap(), Some(user));
        assert!(store.load_user(UserId::new()).await.unwrap().is_none());
    }
}
