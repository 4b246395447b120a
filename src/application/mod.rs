//! Application layer services implementing business logic.
//!
//! Services consume repository traits and infrastructure adapters and are
//! used both by the redirect path and by the consumer pipeline.
//!
//! # Available Services
//!
//! - [`services::RedirectCoordinator`] - Cache-first redirect resolution and write-through
//! - [`services::ShortenService`] - Short link creation
//! - [`services::VisitHandler`] - Durable budget and last-visit updates (`read` handler)
//! - [`services::MetricsAggregator`] - Path and host counters (`read` and `create` handler)
//! - [`services::MetricsQueryService`] - Lookup of aggregated counters

pub mod services;
