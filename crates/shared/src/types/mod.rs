//! Common types used across the application.

pub mod id;
pub mod pagination;

#[cfg(test)]
mod pagination_tests;

pub use id::*;
pub use pagination::{MAX_PER_PAGE, PageMeta, PageRequest, PageResponse};
