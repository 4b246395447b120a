//! No-op cache implementation for disabled caching.

use super::service::{CacheResult, CacheService};
use crate::domain::entities::CacheEntry;
use async_trait::async_trait;
use tracing::debug;

/// A cache that stores nothing.
///
/// Every lookup misses, so each resolve consults the durable store. Budget
/// accounting stays correct; only the fast path is lost.
pub struct NullCache;

impl NullCache {
    pub fn new() -> Self {
        debug!("Using NullCache (caching disabled)");
        Self
    }
}

impl Default for NullCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheService for NullCache {
    async fn get_entry(&self, _code: &str) -> CacheResult<Option<CacheEntry>> {
        Ok(None)
    }

    async fn set_entry(
        &self,
        _code: &str,
        _entry: &CacheEntry,
        _ttl_seconds: Option<u64>,
    ) -> CacheResult<()> {
        Ok(())
    }

    async fn invalidate(&self, _code: &str) -> CacheResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}
