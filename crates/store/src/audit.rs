//! Audit trail entries and sinks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use claimflow_core::workflow::{AuditAction, AuditEvent};
use claimflow_shared::types::{AuditEntryId, CompanyId, ExpenseId, UserId};

use crate::error::StoreError;

/// A recorded audit event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Entry id.
    pub id: AuditEntryId,
    /// Company the event belongs to.
    pub company_id: CompanyId,
    /// Who caused the event.
    pub actor_id: UserId,
    /// Expense concerned, if any.
    pub expense_id: Option<ExpenseId>,
    /// What happened.
    pub action: AuditAction,
    /// Human-readable description.
    pub description: String,
    /// When it was recorded.
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Stamps an engine event with an id and time.
    #[must_use]
    pub fn from_event(company_id: CompanyId, event: AuditEvent) -> Self {
        Self {
            id: AuditEntryId::new(),
            company_id,
            actor_id: event.actor_id,
            expense_id: event.expense_id,
            action: event.action,
            description: event.description,
            created_at: Utc::now(),
        }
    }
}

/// Filter for reading the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditQuery {
    /// Company whose trail is read.
    pub company_id: CompanyId,
    /// Only entries about this expense.
    pub expense_id: Option<ExpenseId>,
}

/// Destination for audit entries.
///
/// Recording is fire-and-forget from the workflow's point of view: a failed
/// `record` is logged and never undoes the transition it describes.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Appends an entry.
    async fn record(&self, entry: AuditEntry) -> Result<(), StoreError>;

    /// Entries matching `query`, oldest first.
    async fn query(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, StoreError>;
}
