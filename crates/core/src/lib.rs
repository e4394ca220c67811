//! Core approval routing logic for Claimflow.
//!
//! This crate contains pure business logic with ZERO I/O dependencies.
//! Plan construction, gate evaluation, permissions and currency conversion
//! live here; persistence and exchange-rate lookups are the callers' job.
//!
//! # Modules
//!
//! - `workflow` - Approval plans, gate evaluation, permissions, lifecycle
//! - `currency` - Currency codes, exchange rates and base conversion

pub mod currency;
pub mod workflow;
