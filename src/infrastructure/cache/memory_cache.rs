//! In-process cache with per-entry deadlines.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::service::{CacheResult, CacheService};
use crate::domain::entities::CacheEntry;

/// Cache kept in a local map.
///
/// Expired entries are dropped on lookup and swept out on every write. A
/// TTL past the clock's range never expires. Useful for single-process
/// deployments and for tests that need a real cache without Redis.
pub struct MemoryCache {
    entries: RwLock<HashMap<String, (CacheEntry, Option<Instant>)>>,
    default_ttl: Duration,
}

impl MemoryCache {
    pub fn new(default_ttl_seconds: u64) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_ttl: Duration::from_secs(default_ttl_seconds),
        }
    }

    /// Number of entries currently held, including stale ones not yet swept.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl CacheService for MemoryCache {
    async fn get_entry(&self, code: &str) -> CacheResult<Option<CacheEntry>> {
        {
            let entries = self.entries.read().await;
            match entries.get(code) {
                Some((entry, deadline)) if is_live(*deadline, Instant::now()) => {
                    debug!("Cache HIT: {}", code);
                    return Ok(Some(entry.clone()));
                }
                Some(_) => {}
                None => {
                    debug!("Cache MISS: {}", code);
                    return Ok(None);
                }
            }
        }

        let mut entries = self.entries.write().await;
        if entries
            .get(code)
            .is_some_and(|(_, deadline)| !is_live(*deadline, Instant::now()))
        {
            entries.remove(code);
        }
        debug!("Cache MISS (stale): {}", code);
        Ok(None)
    }

    async fn set_entry(
        &self,
        code: &str,
        entry: &CacheEntry,
        ttl_seconds: Option<u64>,
    ) -> CacheResult<()> {
        let ttl = ttl_seconds
            .map(Duration::from_secs)
            .unwrap_or(self.default_ttl);

        let now = Instant::now();

        let mut entries = self.entries.write().await;
        entries.retain(|_, (_, deadline)| is_live(*deadline, now));
        entries.insert(code.to_string(), (entry.clone(), now.checked_add(ttl)));
        Ok(())
    }

    async fn invalidate(&self, code: &str) -> CacheResult<()> {
        self.entries.write().await.remove(code);
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}

fn is_live(deadline: Option<Instant>, now: Instant) -> bool {
    deadline.is_none_or(|deadline| now < deadline)
}
