//! Repository trait definitions for the domain layer.
//!
//! - Traits define the contract for store operations
//! - Implementations live in `crate::infrastructure::persistence`
//! - Mock implementations are auto-generated via `mockall` for testing
//!
//! # Available Repositories
//!
//! - [`LinkRepository`] - Durable short link records
//! - [`MetricsRepository`] - Path and host usage counters

pub mod link_repository;
pub mod metrics_repository;

pub use link_repository::LinkRepository;
pub use metrics_repository::MetricsRepository;

#[cfg(test)]
pub use link_repository::MockLinkRepository;
#[cfg(test)]
pub use metrics_repository::MockMetricsRepository;
