//! Core domain entities.
//!
//! - [`ShortLink`] - Durable short link record with budget and TTL
//! - [`CacheEntry`] - Cached redirect snapshot
//! - [`PathMetric`] / [`HostMetric`] - Aggregated usage counters
//!
//! Creation inputs live next to their entity (`NewShortLink`).

pub mod cache_entry;
pub mod metrics;
pub mod short_link;

pub use cache_entry::CacheEntry;
pub use metrics::{CounterDelta, HostMetric, PathMetric, PathUpsert};
pub use short_link::{NewShortLink, ShortLink};
