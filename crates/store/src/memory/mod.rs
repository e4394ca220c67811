//! In-memory implementations backed by `DashMap`. Suitable for development,
//! simulation and tests.

mod audit;
mod store;

pub use audit::MemoryAuditSink;
pub use store::MemoryStore;
