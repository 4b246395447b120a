//! Redis-backed cache implementation.

use super::service::{CacheError, CacheResult, CacheService};
use crate::domain::entities::CacheEntry;
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use tracing::{debug, error, info, warn};

/// Redis cache of redirect snapshots.
///
/// Entries are stored as JSON strings under `link:<code>` with an expiry.
/// All operations are fail-open: errors are logged and reported as misses or
/// successful writes.
pub struct RedisCache {
    client: ConnectionManager,
    default_ttl: u64,
    key_prefix: String,
}

impl RedisCache {
    /// Connects to Redis and validates the connection with a PING.
    ///
    /// # Arguments
    ///
    /// - `redis_url` - Redis connection string (e.g., `"redis://localhost:6379"`)
    /// - `default_ttl_seconds` - Lifetime applied when [`CacheService::set_entry`]
    ///   is called without an explicit TTL
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::ConnectionError`] if the URL is invalid, the connection cannot
    /// be established, or the PING fails.
    pub async fn connect(redis_url: &str, default_ttl_seconds: u64) -> CacheResult<Self> {
        info!("Connecting cache to Redis");

        let client = Client::open(redis_url).map_err(|e| {
            CacheError::ConnectionError(format!("Failed to create Redis client: {}", e))
        })?;

        let manager = ConnectionManager::new(client).await.map_err(|e| {
            CacheError::ConnectionError(format!("Failed to connect to Redis: {}", e))
        })?;

        let mut test_conn = manager.clone();
        test_conn
            .ping::<()>()
            .await
            .map_err(|e| CacheError::ConnectionError(format!("Redis PING failed: {}", e)))?;

        info!("Cache connected to Redis");

        Ok(Self::from_manager(manager, default_ttl_seconds))
    }

    /// Builds a cache on top of an existing connection.
    pub fn from_manager(manager: ConnectionManager, default_ttl_seconds: u64) -> Self {
        Self {
            client: manager,
            default_ttl: default_ttl_seconds,
            key_prefix: "link:".to_string(),
        }
    }

    fn build_key(&self, code: &str) -> String {
        format!("{}{}", self.key_prefix, code)
    }
}

#[async_trait]
impl CacheService for RedisCache {
    async fn get_entry(&self, code: &str) -> CacheResult<Option<CacheEntry>> {
        let key = self.build_key(code);
        let mut conn = self.client.clone();

        let raw = match conn.get::<_, Option<String>>(&key).await {
            Ok(raw) => raw,
            Err(e) => {
                error!("Redis GET error for {}: {}", code, e);
                return Ok(None);
            }
        };

        let Some(raw) = raw else {
            debug!("Cache MISS: {}", code);
            return Ok(None);
        };

        match serde_json::from_str::<CacheEntry>(&raw) {
            Ok(entry) => {
                debug!("Cache HIT: {} -> {} (budget: {:?})", code, entry.url, entry.budget);
                Ok(Some(entry))
            }
            Err(e) => {
                warn!("Discarding unreadable cache entry for {}: {}", code, e);
                let _ = conn.del::<_, i32>(&key).await;
                Ok(None)
            }
        }
    }

    async fn set_entry(
        &self,
        code: &str,
        entry: &CacheEntry,
        ttl_seconds: Option<u64>,
    ) -> CacheResult<()> {
        let key = self.build_key(code);
        let mut conn = self.client.clone();
        let ttl_seconds = ttl_seconds.unwrap_or(self.default_ttl);

        let value = serde_json::to_string(entry)
            .map_err(|e| CacheError::OperationError(format!("Failed to encode entry: {}", e)))?;

        match conn.set_ex::<_, _, ()>(&key, value, ttl_seconds).await {
            Ok(_) => {
                debug!(
                    "Cache SET: {} -> {} (budget: {:?}, TTL: {}s)",
                    code, entry.url, entry.budget, ttl_seconds
                );
                Ok(())
            }
            Err(e) => {
                warn!("Redis SET error for {}: {}", code, e);
                Ok(())
            }
        }
    }

    async fn invalidate(&self, code: &str) -> CacheResult<()> {
        let key = self.build_key(code);
        let mut conn = self.client.clone();

        match conn.del::<_, i32>(&key).await {
            Ok(deleted) => {
                if deleted > 0 {
                    debug!("Cache INVALIDATE: {}", code);
                }
                Ok(())
            }
            Err(e) => {
                warn!("Redis DEL error for {}: {}", code, e);
                Ok(())
            }
        }
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.client.clone();
        conn.ping::<()>().await.is_ok()
    }
}
