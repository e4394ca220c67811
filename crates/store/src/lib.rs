//! Persistence, audit trail and transactional workflow for Claimflow.
//!
//! The core crate decides; this crate loads state, serializes the decisions
//! per expense, commits them and records the audit trail.
//!
//! # Modules
//!
//! - `repository` - Persistence interface and atomic transitions
//! - `audit` - Audit entries and the audit sink interface
//! - `memory` - DashMap-backed implementations
//! - `workflow` - `ExpenseWorkflow`, the transactional orchestrator

pub mod audit;
pub mod error;
pub mod memory;
pub mod repository;
pub mod workflow;


pub use audit::{AuditEntry, AuditQuery, AuditSink};
pub use error::StoreError;
pub use memory::{MemoryAuditSink, MemoryStore};
pub use repository::{ApprovalRepository, Transition};
pub use workflow::{ExpenseDetails, ExpenseWorkflow, StepDetails};
