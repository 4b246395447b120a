//! Repository trait for path and host usage counters.

use async_trait::async_trait;

use crate::domain::entities::{CounterDelta, HostMetric, PathMetric, PathUpsert};
use crate::error::AppError;

/// Store of [`PathMetric`] and [`HostMetric`] counters.
///
/// Each upsert is an atomic read-modify-write on one record. The two kinds
/// are never updated inside a shared transaction.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetricsRepository: Send + Sync {
    /// Adds `delta` to the counters of `url`, creating the record if needed.
    async fn upsert_path(&self, url: &str, delta: CounterDelta) -> Result<PathUpsert, AppError>;

    /// Adds `delta` to the counters of `host`, creating the record if needed,
    /// and links `new_path_id` into its path set when given.
    async fn upsert_host(
        &self,
        host: &str,
        delta: CounterDelta,
        new_path_id: Option<i64>,
    ) -> Result<HostMetric, AppError>;

    async fn find_path(&self, url: &str) -> Result<Option<PathMetric>, AppError>;

    async fn find_host(&self, host: &str) -> Result<Option<HostMetric>, AppError>;

    /// Lists hosts whose name contains `query` (all hosts when empty),
    /// most redirected first.
    async fn search_hosts(&self, query: &str, limit: i64) -> Result<Vec<HostMetric>, AppError>;
}
