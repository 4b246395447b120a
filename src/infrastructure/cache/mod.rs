//! Caching layer for fast redirect lookups.
//!
//! Provides a [`CacheService`] trait with three implementations:
//! - [`RedisCache`] - Production Redis-backed cache
//! - [`MemoryCache`] - In-process map for single-node runs and tests
//! - [`NullCache`] - No-op implementation for disabled caching
//!
//! Writes issued from the redirect path go through [`CacheWriteQueue`].

mod memory_cache;
mod null_cache;
mod redis_cache;
mod service;
mod write_queue;

pub use memory_cache::MemoryCache;
pub use null_cache::NullCache;
pub use redis_cache::RedisCache;
pub use service::{CacheError, CacheResult, CacheService};
pub use write_queue::{CacheTask, CacheWriteQueue, run_cache_worker};
