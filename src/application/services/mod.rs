//! Business logic services for the application layer.

pub mod metrics_aggregator;
pub mod metrics_query_service;
pub mod redirect_coordinator;
pub mod shorten_service;
pub mod visit_handler;

pub use metrics_aggregator::MetricsAggregator;
pub use metrics_query_service::MetricsQueryService;
pub use redirect_coordinator::{RedirectCoordinator, Resolution};
pub use shorten_service::ShortenService;
pub use visit_handler::VisitHandler;
