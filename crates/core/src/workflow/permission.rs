//! Permission checks for expense access.
//!
//! Pure predicates over the entities passed in; no lookups, no side effects.
//! Managers only reach their direct reports, never transitive ones.

use crate::workflow::error::ApprovalError;
use crate::workflow::types::{Expense, User, UserRole};

/// Returns true if `actor` may record an approval action on `expense`.
#[must_use]
pub fn can_act(actor: &User, expense: &Expense) -> bool {
    if actor.company_id != expense.company_id {
        return false;
    }

    actor.role == UserRole::Admin || expense.submitter_manager_id == Some(actor.id)
}

/// Returns true if `actor` may see `expense`.
#[must_use]
pub fn can_view(actor: &User, expense: &Expense) -> bool {
    if actor.company_id != expense.company_id {
        return false;
    }

    actor.role == UserRole::Admin
        || actor.id == expense.submitter_id
        || (actor.role == UserRole::Manager && expense.submitter_manager_id == Some(actor.id))
}

/// Returns true if `actor` may create or change approval rules.
#[must_use]
pub fn can_manage_rules(actor: &User) -> bool {
    actor.role == UserRole::Admin
}

/// Returns true if `actor` may manage `target`'s account.
#[must_use]
pub fn can_manage_user(actor: &User, target: &User) -> bool {
    if actor.id == target.id {
        return true;
    }
    if actor.company_id != target.company_id {
        return false;
    }

    match actor.role {
        UserRole::Admin => true,
        UserRole::Manager => target.role == UserRole::Employee,
        UserRole::Employee => false,
    }
}

/// Fails with `PermissionDenied` unless `actor` is an admin of the expense's company.
pub(crate) fn require_company_admin(
    actor: &User,
    expense: &Expense,
    operation: &'static str,
) -> Result<(), ApprovalError> {
    if actor.role == UserRole::Admin && actor.company_id == expense.company_id {
        Ok(())
    } else {
        Err(ApprovalError::PermissionDenied {
            user_id: actor.id,
            operation,
        })
    }
}
