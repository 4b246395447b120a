//! Cache service trait and error types.

use async_trait::async_trait;

use crate::domain::entities::CacheEntry;

/// Errors that can occur during cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache connection error: {0}")]
    ConnectionError(String),
    #[error("Cache operation error: {0}")]
    OperationError(String),
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Key-value store holding [`CacheEntry`] snapshots keyed by short code.
///
/// Implementations must be thread-safe. Production implementations fail
/// open: a broken cache degrades to durable-store lookups instead of failing
/// redirects.
///
/// # Implementations
///
/// - [`crate::infrastructure::cache::RedisCache`] - Redis-backed cache with TTL support
/// - [`crate::infrastructure::cache::MemoryCache`] - In-process map with deadlines
/// - [`crate::infrastructure::cache::NullCache`] - No-op implementation for disabled caching
#[async_trait]
pub trait CacheService: Send + Sync {
    /// Returns the snapshot for `code`, or `None` on miss.
    async fn get_entry(&self, code: &str) -> CacheResult<Option<CacheEntry>>;

    /// Stores a snapshot for `code`.
    ///
    /// `ttl_seconds` overrides the implementation default when given.
    async fn set_entry(
        &self,
        code: &str,
        entry: &CacheEntry,
        ttl_seconds: Option<u64>,
    ) -> CacheResult<()>;

    /// Removes the snapshot for `code`, if any.
    async fn invalidate(&self, code: &str) -> CacheResult<()>;

    /// Checks if the cache backend is reachable.
    async fn health_check(&self) -> bool;
}
