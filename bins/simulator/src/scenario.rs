//! Scenario file format.
//!
//! A scenario names users by short keys and refers to them by key everywhere
//! else; the runner assigns real ids.

use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use claimflow_core::workflow::{Decision, ExpenseCategory, UserRole};

/// A complete simulation input.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// The company everything happens in.
    pub company: CompanyEntry,
    /// Units of each currency per USD. When absent, rates come from the HTTP API.
    #[serde(default)]
    pub rates: Option<HashMap<String, Decimal>>,
    /// Company members.
    pub users: Vec<UserEntry>,
    /// Rules created in order; the last one stays active.
    #[serde(default)]
    pub rules: Vec<RuleEntry>,
    /// Claims submitted in order.
    #[serde(default)]
    pub expenses: Vec<ExpenseEntry>,
    /// Actions applied in order after all claims are submitted.
    #[serde(default)]
    pub actions: Vec<ActionEntry>,
}

/// Company settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CompanyEntry {
    /// Display name.
    pub name: String,
    /// ISO 4217 base currency.
    pub base_currency: String,
}

/// One company member.
#[derive(Debug, Clone, Deserialize)]
pub struct UserEntry {
    /// Key used by the rest of the scenario.
    pub key: String,
    /// Display name.
    pub name: String,
    /// Role.
    pub role: UserRole,
    /// Key of the direct manager.
    #[serde(default)]
    pub manager: Option<String>,
    /// Inactive users cannot be rule approvers.
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// An approval rule, created by an admin.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleEntry {
    /// Key of the admin creating the rule.
    pub by: String,
    /// Rule name.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Route through the submitter's manager first.
    #[serde(default)]
    pub requires_manager_first: Option<bool>,
    /// Resolve steps in order.
    #[serde(default)]
    pub sequential: Option<bool>,
    /// Percentage of approved steps needed.
    #[serde(default)]
    pub min_approval_percentage: Option<u8>,
    /// Key of the specific approver.
    #[serde(default)]
    pub specific_approver: Option<String>,
    /// Keys of the rule approvers, in order.
    pub approvers: Vec<String>,
}

/// One expense claim.
#[derive(Debug, Clone, Deserialize)]
pub struct ExpenseEntry {
    /// Key used by actions.
    pub key: String,
    /// Key of the submitter.
    pub submitter: String,
    /// Claimed amount.
    pub amount: Decimal,
    /// Claim currency.
    pub currency: String,
    /// Category.
    pub category: ExpenseCategory,
    /// Description.
    pub description: String,
    /// Date incurred.
    pub date: NaiveDate,
}

/// What an action does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Approve through the gate.
    Approve,
    /// Reject through the gate.
    Reject,
    /// Admin override to approved.
    OverrideApprove,
    /// Admin override to rejected.
    OverrideReject,
    /// Mark as paid.
    Pay,
}

impl ActionKind {
    /// The gate or override decision, if the action carries one.
    #[must_use]
    pub fn decision(self) -> Option<Decision> {
        match self {
            Self::Approve | Self::OverrideApprove => Some(Decision::Approve),
            Self::Reject | Self::OverrideReject => Some(Decision::Reject),
            Self::Pay => None,
        }
    }
}

/// One action on one expense.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionEntry {
    /// Expense key.
    pub expense: String,
    /// Actor key.
    pub actor: String,
    /// What to do.
    pub kind: ActionKind,
    /// Comment for gate actions, reason for overrides.
    #[serde(default)]
    pub comment: Option<String>,
}

impl Scenario {
    /// Loads a scenario file; the format follows the extension (TOML, JSON, YAML...).
    pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from(path))
            .build()?
            .try_deserialize()
    }

    /// Parses a TOML scenario.
    #[cfg(test)]
    pub fn from_toml(source: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}
