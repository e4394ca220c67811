//! Approval rule drafts.

use serde::{Deserialize, Serialize};

use claimflow_shared::types::{ApprovalRuleId, CompanyId, UserId};

use crate::workflow::error::ApprovalError;
use crate::workflow::plan::validate_percentage;
use crate::workflow::types::{ApprovalRule, User};

/// Maximum rule name length, in characters.
pub const MAX_RULE_NAME_LEN: usize = 100;
/// Maximum rule description length, in characters.
pub const MAX_RULE_DESCRIPTION_LEN: usize = 500;

/// An approval rule as entered by an admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDraft {
    /// Rule name.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Route through the submitter's manager first.
    #[serde(default = "default_manager_first")]
    pub requires_manager_first: bool,
    /// Resolve steps in order.
    #[serde(default)]
    pub sequential: bool,
    /// Percentage of approved steps needed.
    #[serde(default = "default_percentage")]
    pub min_approval_percentage: u8,
    /// Optional named approver placed after the manager.
    #[serde(default)]
    pub specific_approver_id: Option<UserId>,
    /// Rule approvers in order.
    pub approvers: Vec<UserId>,
}

fn default_manager_first() -> bool {
    true
}

fn default_percentage() -> u8 {
    100
}

impl RuleDraft {
    /// Creates a draft with default flags.
    #[must_use]
    pub fn new(name: impl Into<String>, approvers: Vec<UserId>) -> Self {
        Self {
            name: name.into(),
            description: None,
            requires_manager_first: default_manager_first(),
            sequential: false,
            min_approval_percentage: default_percentage(),
            specific_approver_id: None,
            approvers,
        }
    }

    /// Checks the draft's own fields.
    ///
    /// # Errors
    ///
    /// `Configuration` describing the first invalid field.
    pub fn validate(&self) -> Result<(), ApprovalError> {
        let name_len = self.name.trim().chars().count();
        if name_len == 0 || name_len > MAX_RULE_NAME_LEN {
            return Err(ApprovalError::Configuration(format!(
                "name must be between 1 and {MAX_RULE_NAME_LEN} characters"
            )));
        }
        if let Some(description) = &self.description
            && description.chars().count() > MAX_RULE_DESCRIPTION_LEN
        {
            return Err(ApprovalError::Configuration(format!(
                "description must be at most {MAX_RULE_DESCRIPTION_LEN} characters"
            )));
        }
        validate_percentage(self.min_approval_percentage)?;
        if self.approvers.is_empty() {
            return Err(ApprovalError::Configuration(
                "at least one approver is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Every user the draft names, specific approver first.
    pub fn referenced_users(&self) -> impl Iterator<Item = UserId> + '_ {
        self.specific_approver_id
            .into_iter()
            .chain(self.approvers.iter().copied())
    }

    /// Validates the draft and turns it into an active rule of `company_id`.
    ///
    /// `lookup` resolves the users the draft names; each must exist, be active
    /// and belong to `company_id`.
    ///
    /// # Errors
    ///
    /// `Configuration` if the draft or any referenced user is invalid.
    pub fn into_rule<F>(
        self,
        company_id: CompanyId,
        lookup: F,
    ) -> Result<ApprovalRule, ApprovalError>
    where
        F: Fn(UserId) -> Option<User>,
    {
        self.validate()?;

        for user_id in self.referenced_users() {
            match lookup(user_id) {
                Some(user) if user.company_id == company_id && user.is_active => {}
                Some(user) if !user.is_active => {
                    return Err(ApprovalError::Configuration(format!(
                        "approver {user_id} is inactive"
                    )));
                }
                _ => {
                    return Err(ApprovalError::Configuration(format!(
                        "approver {user_id} is not a member of company {company_id}"
                    )));
                }
            }
        }

        Ok(ApprovalRule {
            id: ApprovalRuleId::new(),
            company_id,
            name: self.name.trim().to_string(),
            description: self.description,
            requires_manager_first: self.requires_manager_first,
            sequential: self.sequential,
            min_approval_percentage: self.min_approval_percentage,
            specific_approver_id: self.specific_approver_id,
            approvers: self.approvers,
            is_active: true,
        })
    }
}
