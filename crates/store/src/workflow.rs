//! Transactional approval workflow.
//!
//! `ExpenseWorkflow` loads state from the repository, asks the core engine for
//! a decision, commits the result and records the audit trail. Every state
//! change of an expense runs under that expense's lock, held from the first
//! load to the commit.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use claimflow_core::currency::normalize_currency_code;
use claimflow_core::workflow::{
    ActionOutcome, ApprovalError, ApprovalRule, ApprovalStep, ApprovalTracker, AuditAction,
    AuditEvent, Company, Decision, Expense, ExpenseClaim, ExpenseFilter, ExpenseStatistics,
    GateEvaluator, RuleDraft, StatusChange, Submission, User, WorkflowService, can_manage_rules,
    can_view, summarize,
};
use claimflow_rates::ExchangeRateProvider;
use claimflow_shared::config::WorkflowConfig;
use claimflow_shared::types::{CompanyId, ExpenseId, PageRequest, PageResponse, UserId};

use crate::audit::{AuditEntry, AuditQuery, AuditSink};
use crate::repository::{ApprovalRepository, Transition};

/// An approval step with its approver's name.
#[derive(Debug, Clone, Serialize)]
pub struct StepDetails {
    /// The step.
    #[serde(flatten)]
    pub step: ApprovalStep,
    /// Approver's display name, if the user still exists.
    pub approver_name: Option<String>,
}

/// An expense with everything needed to display it.
#[derive(Debug, Clone, Serialize)]
pub struct ExpenseDetails {
    /// The expense.
    #[serde(flatten)]
    pub expense: Expense,
    /// Submitter's display name.
    pub submitter_name: Option<String>,
    /// Company name.
    pub company_name: Option<String>,
    /// Steps in sequence order.
    pub steps: Vec<StepDetails>,
    /// Truncated percentage of approved steps.
    pub approval_percentage: usize,
}

/// Holds one expense's lock; the map entry goes away with the last holder.
struct ExpenseGuard<'a> {
    locks: &'a DashMap<ExpenseId, Arc<Mutex<()>>>,
    expense_id: ExpenseId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ExpenseGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks
            .remove_if(&self.expense_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Transactional orchestrator over a repository, an audit sink and a rate provider.
pub struct ExpenseWorkflow<R, A> {
    repo: R,
    audit: A,
    rates: Arc<dyn ExchangeRateProvider>,
    config: WorkflowConfig,
    locks: DashMap<ExpenseId, Arc<Mutex<()>>>,
}

impl<R: ApprovalRepository, A: AuditSink> ExpenseWorkflow<R, A> {
    /// Creates a workflow over the given collaborators.
    pub fn new(
        repo: R,
        audit: A,
        rates: Arc<dyn ExchangeRateProvider>,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            repo,
            audit,
            rates,
            config,
            locks: DashMap::new(),
        }
    }

    /// The underlying repository.
    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// The underlying audit sink.
    pub fn audit_sink(&self) -> &A {
        &self.audit
    }

    /// Submits a claim on behalf of `submitter_id`.
    ///
    /// Resolves the exchange rate into the company base currency, builds the
    /// plan from the company's active rule and stores the expense.
    pub async fn submit_expense(
        &self,
        submitter_id: UserId,
        claim: ExpenseClaim,
    ) -> Result<Submission, ApprovalError> {
        WorkflowService::validate_claim(&claim)?;
        let submitter = self.user(submitter_id).await?;
        let company = self.company(submitter.company_id).await?;

        let currency = normalize_currency_code(&claim.currency)
            .ok_or_else(|| {
                ApprovalError::Validation(format!("invalid currency {}", claim.currency))
            })?;
        let rate = self
            .rates
            .exchange_rate(&currency, &company.base_currency)
            .await?;
        let rule = self.active_rule(company.id).await?;

        let submission = WorkflowService::submit(
            claim,
            &submitter,
            &company,
            rate.rate,
            rule.as_ref(),
            self.config.base_currency_scale,
        )?;

        self.repo
            .commit(Transition::create(
                submission.expense.clone(),
                submission.steps.clone(),
            ))
            .await?;

        info!(
            expense_id = %submission.expense.id,
            submitter_id = %submitter.id,
            status = %submission.expense.status,
            steps = submission.steps.len(),
            amount_in_base = %submission.expense.amount_in_base,
            "expense submitted"
        );
        self.deliver(company.id, submission.audit.clone()).await;
        Ok(submission)
    }

    /// Records an approve or reject decision by `actor_id`.
    pub async fn record_action(
        &self,
        expense_id: ExpenseId,
        actor_id: UserId,
        decision: Decision,
        comment: Option<String>,
    ) -> Result<ActionOutcome, ApprovalError> {
        let _guard = self.lock_expense(expense_id).await?;

        let expense = self.expense(expense_id).await?;
        let actor = self.user(actor_id).await?;
        let steps = self.repo.load_steps(expense_id).await?;

        let outcome = GateEvaluator::record_action(&expense, &steps, &actor, decision, comment)
            .inspect_err(|e| {
                debug!(
                    expense_id = %expense_id,
                    actor_id = %actor_id,
                    error = %e,
                    "approval action refused"
                );
            })?;

        let acted: Vec<_> = outcome.step().cloned().into_iter().collect();
        self.repo
            .commit(Transition::update(
                outcome.expense.clone(),
                acted,
                expense.updated_at,
            ))
            .await?;

        info!(
            expense_id = %expense_id,
            actor_id = %actor_id,
            step_id = %outcome.step_id,
            decision = ?decision,
            status = %outcome.expense.status,
            "approval action recorded"
        );
        if let Some(event) = outcome.audit.clone() {
            self.deliver(expense.company_id, event).await;
        }
        Ok(outcome)
    }

    /// Forces an expense to approved or rejected. Admins only.
    pub async fn admin_override(
        &self,
        expense_id: ExpenseId,
        actor_id: UserId,
        decision: Decision,
        reason: &str,
    ) -> Result<StatusChange, ApprovalError> {
        let _guard = self.lock_expense(expense_id).await?;

        let expense = self.expense(expense_id).await?;
        let actor = self.user(actor_id).await?;
        let change = WorkflowService::admin_override(&expense, &actor, decision, reason)?;
        self.apply_status_change(&expense, &change).await?;

        warn!(
            expense_id = %expense_id,
            actor_id = %actor_id,
            from = %change.previous,
            to = %change.expense.status,
            "expense status overridden by admin"
        );
        self.deliver(expense.company_id, change.audit.clone()).await;
        Ok(change)
    }

    /// Marks an approved expense as paid. Admins only.
    pub async fn mark_paid(
        &self,
        expense_id: ExpenseId,
        actor_id: UserId,
    ) -> Result<StatusChange, ApprovalError> {
        let _guard = self.lock_expense(expense_id).await?;

        let expense = self.expense(expense_id).await?;
        let actor = self.user(actor_id).await?;
        let change = WorkflowService::mark_paid(&expense, &actor)?;
        self.apply_status_change(&expense, &change).await?;

        info!(expense_id = %expense_id, actor_id = %actor_id, "expense paid");
        self.deliver(expense.company_id, change.audit.clone()).await;
        Ok(change)
    }

    /// Creates the company's new active rule, replacing the previous one.
    pub async fn create_rule(
        &self,
        actor_id: UserId,
        draft: RuleDraft,
    ) -> Result<ApprovalRule, ApprovalError> {
        let actor = self.user(actor_id).await?;
        if !can_manage_rules(&actor) {
            return Err(ApprovalError::PermissionDenied {
                user_id: actor.id,
                operation: "manage approval rules",
            });
        }
        draft.validate()?;

        let mut directory = HashMap::new();
        for user_id in draft.referenced_users() {
            if let Some(user) = self.repo.load_user(user_id).await? {
                directory.insert(user_id, user);
            }
        }
        let rule = draft.into_rule(actor.company_id, |id| directory.get(&id).cloned())?;

        let replaced = self.repo.save_rule(rule.clone()).await?;
        info!(
            rule_id = %rule.id,
            company_id = %rule.company_id,
            replaced = replaced.len(),
            "approval rule created"
        );

        for old in replaced {
            self.deliver(
                actor.company_id,
                AuditEvent::standalone(
                    actor.id,
                    AuditAction::RuleUpdated,
                    format!("Approval rule {old} deactivated"),
                ),
            )
            .await;
        }
        self.deliver(
            actor.company_id,
            AuditEvent::standalone(
                actor.id,
                AuditAction::RuleCreated,
                format!("Approval rule created: {}", rule.name),
            ),
        )
        .await;
        Ok(rule)
    }

    /// An expense with its steps, as seen by `actor_id`.
    pub async fn expense_details(
        &self,
        expense_id: ExpenseId,
        actor_id: UserId,
    ) -> Result<ExpenseDetails, ApprovalError> {
        let expense = self.expense(expense_id).await?;
        let actor = self.user(actor_id).await?;
        if !can_view(&actor, &expense) {
            return Err(ApprovalError::PermissionDenied {
                user_id: actor.id,
                operation: "view this expense",
            });
        }

        let tracker = ApprovalTracker::new(expense.id, self.repo.load_steps(expense_id).await?)?;
        let approval_percentage = tracker.approval_percentage();

        let mut names: HashMap<UserId, Option<String>> = HashMap::new();
        for id in tracker
            .steps()
            .iter()
            .map(|s| s.approver_id)
            .chain([expense.submitter_id])
        {
            if !names.contains_key(&id) {
                let name = self.repo.load_user(id).await?.map(|u| u.full_name);
                names.insert(id, name);
            }
        }

        let company_name = self
            .repo
            .load_company(expense.company_id)
            .await?
            .map(|c| c.name);
        let steps = tracker
            .into_steps()
            .into_iter()
            .map(|step| StepDetails {
                approver_name: names.get(&step.approver_id).cloned().flatten(),
                step,
            })
            .collect();

        Ok(ExpenseDetails {
            submitter_name: names.get(&expense.submitter_id).cloned().flatten(),
            company_name,
            steps,
            approval_percentage,
            expense,
        })
    }

    /// Expenses `actor_id` may view, newest first.
    pub async fn list_expenses(
        &self,
        actor_id: UserId,
        filter: &ExpenseFilter,
        page: PageRequest,
    ) -> Result<PageResponse<Expense>, ApprovalError> {
        let actor = self.user(actor_id).await?;
        let expenses = self.repo.list_expenses(actor.company_id).await?;
        let visible = filter
            .visible(&actor, &expenses)
            .into_iter()
            .cloned()
            .collect();
        Ok(PageResponse::from_items(visible, page))
    }

    /// Per-status counts and base-currency totals for the actor's company. Admins only.
    pub async fn expense_statistics(
        &self,
        actor_id: UserId,
    ) -> Result<ExpenseStatistics, ApprovalError> {
        let actor = self.company_admin(actor_id, "view expense statistics").await?;
        let expenses = self.repo.list_expenses(actor.company_id).await?;
        summarize(&expenses)
    }

    /// The actor's company audit trail, oldest first. Admins only.
    pub async fn audit_log(
        &self,
        actor_id: UserId,
        expense_id: Option<ExpenseId>,
        page: PageRequest,
    ) -> Result<PageResponse<AuditEntry>, ApprovalError> {
        let actor = self.company_admin(actor_id, "read the audit log").await?;
        let entries = self
            .audit
            .query(&AuditQuery {
                company_id: actor.company_id,
                expense_id,
            })
            .await?;
        Ok(PageResponse::from_items(entries, page))
    }

    /// Serializes state changes of one expense. Unknown expenses never get a lock.
    async fn lock_expense(
        &self,
        expense_id: ExpenseId,
    ) -> Result<ExpenseGuard<'_>, ApprovalError> {
        self.expense(expense_id).await?;
        let lock = Arc::clone(self.locks.entry(expense_id).or_default().value());
        Ok(ExpenseGuard {
            locks: &self.locks,
            expense_id,
            guard: Some(lock.lock_owned().await),
        })
    }

    #[cfg(test)]
    pub(crate) fn held_locks(&self) -> usize {
        self.locks.len()
    }

    async fn apply_status_change(
        &self,
        loaded: &Expense,
        change: &StatusChange,
    ) -> Result<(), ApprovalError> {
        self.repo
            .commit(Transition::update(
                change.expense.clone(),
                Vec::new(),
                loaded.updated_at,
            ))
            .await?;
        Ok(())
    }

    /// Hands an event to the audit sink; failures are logged, never returned.
    async fn deliver(&self, company_id: CompanyId, event: AuditEvent) {
        let action = event.action;
        let entry = AuditEntry::from_event(company_id, event);
        if let Err(e) = self.audit.record(entry).await {
            warn!(
                error = %e,
                action = %action,
                company_id = %company_id,
                "failed to record audit entry"
            );
        }
    }

    async fn active_rule(
        &self,
        company_id: CompanyId,
    ) -> Result<Option<ApprovalRule>, ApprovalError> {
        let mut rules = self.repo.load_active_rules(company_id).await?;
        if rules.len() > 1 {
            return Err(ApprovalError::Configuration(format!(
                "company {company_id} has {} active approval rules",
                rules.len()
            )));
        }
        Ok(rules.pop())
    }

    async fn company_admin(
        &self,
        actor_id: UserId,
        operation: &'static str,
    ) -> Result<User, ApprovalError> {
        let actor = self.user(actor_id).await?;
        if can_manage_rules(&actor) {
            Ok(actor)
        } else {
            Err(ApprovalError::PermissionDenied {
                user_id: actor.id,
                operation,
            })
        }
    }

    async fn user(&self, id: UserId) -> Result<User, ApprovalError> {
        self.repo
            .load_user(id)
            .await?
            .ok_or(ApprovalError::UserNotFound(id))
    }

    async fn expense(&self, id: ExpenseId) -> Result<Expense, ApprovalError> {
        self.repo
            .load_expense(id)
            .await?
            .ok_or(ApprovalError::ExpenseNotFound(id))
    }

    async fn company(&self, id: CompanyId) -> Result<Company, ApprovalError> {
        self.repo
            .load_company(id)
            .await?
            .ok_or_else(|| ApprovalError::Storage(format!("company {id} not found")))
    }
}
