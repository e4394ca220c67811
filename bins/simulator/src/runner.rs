//! Runs a scenario through `ExpenseWorkflow` on the in-memory store.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use tracing::{info, warn};

use claimflow_core::workflow::{
    ApprovalError, Company, ExpenseClaim, ExpenseStatistics, ExpenseStatus, RuleDraft, User,
    UserRole,
};
use claimflow_rates::ExchangeRateProvider;
use claimflow_shared::config::WorkflowConfig;
use claimflow_shared::types::{CompanyId, ExpenseId, PageRequest, UserId};
use claimflow_store::{
    ApprovalRepository, AuditEntry, ExpenseDetails, ExpenseWorkflow, MemoryAuditSink, MemoryStore,
};

use crate::scenario::{ActionKind, ActionEntry, Scenario};

/// Outcome of one scenario action.
#[derive(Debug, Clone, Serialize)]
pub struct ActionReport {
    /// Expense key.
    pub expense: String,
    /// Actor key.
    pub actor: String,
    /// What was attempted.
    pub kind: String,
    /// Expense status after the action, when it succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ExpenseStatus>,
    /// Stable error code, when it failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
    /// Error message, when it failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything the simulator prints.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    /// Final state of every expense, in submission order.
    pub expenses: Vec<ExpenseDetails>,
    /// Per-action results.
    pub actions: Vec<ActionReport>,
    /// Per-status totals.
    pub statistics: ExpenseStatistics,
    /// The company audit trail.
    pub audit_trail: Vec<AuditEntry>,
}

/// Runs `scenario` against a fresh in-memory store.
///
/// Setup problems (unknown keys, bad rules, failed submissions) abort the run.
/// Action failures are part of the simulation and end up in the report.
pub async fn run(
    scenario: Scenario,
    rates: Arc<dyn ExchangeRateProvider>,
    config: WorkflowConfig,
) -> Result<SimulationReport> {
    let store = MemoryStore::new();
    let company = Company {
        id: CompanyId::new(),
        name: scenario.company.name.clone(),
        base_currency: scenario.company.base_currency.to_ascii_uppercase(),
    };
    store.save_company(company.clone()).await?;

    let users = register_users(&store, &scenario, company.id).await?;
    let admin = scenario
        .users
        .iter()
        .find(|u| u.role == UserRole::Admin)
        .map(|u| users[&u.key])
        .ok_or_else(|| anyhow!("scenario needs at least one admin"))?;

    let workflow = ExpenseWorkflow::new(store, MemoryAuditSink::new(), rates, config);

    for entry in &scenario.rules {
        let by = lookup(&users, &entry.by)?;
        let mut draft = RuleDraft::new(
            entry.name.clone(),
            entry.approvers
                .iter()
                .map(|key| lookup(&users, key))
                .collect::<Result<Vec<_>>>()?,
        );
        draft.description.clone_from(&entry.description);
        if let Some(flag) = entry.requires_manager_first {
            draft.requires_manager_first = flag;
        }
        if let Some(flag) = entry.sequential {
            draft.sequential = flag;
        }
        if let Some(pct) = entry.min_approval_percentage {
            draft.min_approval_percentage = pct;
        }
        draft.specific_approver_id = entry
            .specific_approver
            .as_deref()
            .map(|key| lookup(&users, key))
            .transpose()?;

        let rule = workflow
            .create_rule(by, draft)
            .await
            .with_context(|| format!("creating rule '{}'", entry.name))?;
        info!(rule = %entry.name, rule_id = %rule.id, "rule created");
    }

    let mut expenses: Vec<(String, ExpenseId)> = Vec::with_capacity(scenario.expenses.len());
    for entry in &scenario.expenses {
        let submitter = lookup(&users, &entry.submitter)?;
        let claim = ExpenseClaim {
            amount: entry.amount,
            currency: entry.currency.clone(),
            category: entry.category,
            description: entry.description.clone(),
            expense_date: entry.date,
        };
        let submission = workflow
            .submit_expense(submitter, claim)
            .await
            .with_context(|| format!("submitting expense '{}'", entry.key))?;
        expenses.push((entry.key.clone(), submission.expense.id));
    }
    let expense_ids: HashMap<_, _> = expenses.iter().cloned().collect();

    let mut actions = Vec::with_capacity(scenario.actions.len());
    for entry in &scenario.actions {
        let expense_id = *expense_ids
            .get(&entry.expense)
            .ok_or_else(|| anyhow!("unknown expense '{}'", entry.expense))?;
        let actor = lookup(&users, &entry.actor)?;
        let result = apply(&workflow, expense_id, actor, entry).await;
        actions.push(report(entry, result));
    }

    let mut details = Vec::with_capacity(expenses.len());
    for (_, id) in &expenses {
        details.push(workflow.expense_details(*id, admin).await?);
    }
    let statistics = workflow.expense_statistics(admin).await?;
    let audit_trail = workflow
        .audit_log(
            admin,
            None,
            PageRequest {
                page: 1,
                per_page: claimflow_shared::types::MAX_PER_PAGE,
            },
        )
        .await?
        .data;

    Ok(SimulationReport {
        expenses: details,
        actions,
        statistics,
        audit_trail,
    })
}

async fn register_users(
    store: &MemoryStore,
    scenario: &Scenario,
    company_id: CompanyId,
) -> Result<HashMap<String, UserId>> {
    let ids: HashMap<String, UserId> = scenario
        .users
        .iter()
        .map(|u| (u.key.clone(), UserId::new()))
        .collect();
    if ids.len() != scenario.users.len() {
        return Err(anyhow!("user keys must be unique"));
    }

    for entry in &scenario.users {
        let manager_id = entry
            .manager
            .as_deref()
            .map(|key| lookup(&ids, key))
            .transpose()?;
        store
            .save_user(User {
                id: ids[&entry.key],
                company_id,
                role: entry.role,
                manager_id,
                full_name: entry.name.clone(),
                is_active: entry.active,
            })
            .await?;
    }
    Ok(ids)
}

async fn apply(
    workflow: &ExpenseWorkflow<MemoryStore, MemoryAuditSink>,
    expense_id: ExpenseId,
    actor: UserId,
    action: &ActionEntry,
) -> Result<ExpenseStatus, ApprovalError> {
    match (action.kind, action.kind.decision()) {
        (ActionKind::Approve | ActionKind::Reject, Some(decision)) => workflow
            .record_action(expense_id, actor, decision, action.comment.clone())
            .await
            .map(|o| o.expense.status),
        (ActionKind::OverrideApprove | ActionKind::OverrideReject, Some(decision)) => workflow
            .admin_override(
                expense_id,
                actor,
                decision,
                action.comment.as_deref().unwrap_or_default(),
            )
            .await
            .map(|c| c.expense.status),
        _ => workflow
            .mark_paid(expense_id, actor)
            .await
            .map(|c| c.expense.status),
    }
}

fn report(action: &ActionEntry, result: Result<ExpenseStatus, ApprovalError>) -> ActionReport {
    let mut report = ActionReport {
        expense: action.expense.clone(),
        actor: action.actor.clone(),
        kind: format!("{:?}", action.kind),
        status: None,
        error_code: None,
        error: None,
    };
    match result {
        Ok(status) => report.status = Some(status),
        Err(e) => {
            warn!(
                expense = %action.expense,
                actor = %action.actor,
                error = %e,
                "scenario action failed"
            );
            report.error_code = Some(e.error_code());
            report.error = Some(e.to_string());
        }
    }
    report
}

fn lookup(ids: &HashMap<String, UserId>, key: &str) -> Result<UserId> {
    ids.get(key)
        .copied()
        .ok_or_else(|| anyhow!("unknown user '{key}'"))
}
