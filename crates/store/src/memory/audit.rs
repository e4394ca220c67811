//! In-memory audit sink.

use async_trait::async_trait;
use dashmap::DashMap;

use claimflow_shared::types::CompanyId;

use crate::audit::{AuditEntry, AuditQuery, AuditSink};
use crate::error::StoreError;

/// In-memory [`AuditSink`] using `DashMap`.
///
/// Entries are kept per company in append order.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    entries: DashMap<CompanyId, Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    /// Create a new empty in-memory audit sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of recorded entries.
    pub fn len(&self) -> usize {
        self.entries.iter().map(|e| e.value().len()).sum()
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, entry: AuditEntry) -> Result<(), StoreError> {
        self.entries.entry(entry.company_id).or_default().push(entry);
        Ok(())
    }

    async fn query(&self, query: &AuditQuery) -> Result<Vec<AuditEntry>, StoreError> {
        let Some(entries) = self.entries.get(&query.company_id) else {
            return Ok(Vec::new());
        };
        Ok(entries
            .iter()
            .filter(|e| query.expense_id.is_none_or(|id| e.expense_id == Some(id)))
            .cloned()
            .collect())
    }
}
