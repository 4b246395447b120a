//! Redirect resolution on top of the snapshot cache.

use chrono::{DateTime, Utc};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::entities::{CacheEntry, ShortLink};
use crate::domain::events::LifecycleEvent;
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::infrastructure::cache::{CacheService, CacheTask, CacheWriteQueue};
use crate::infrastructure::messaging::EventPublisher;

/// Outcome of resolving a short code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved { url: String, from_cache: bool },
    /// No link with this code exists.
    NotFound,
    /// The link exists but its budget is used up or its TTL has elapsed.
    Exhausted,
}

impl Resolution {
    /// Redirect target; callers treat every other outcome as not found.
    pub fn target(&self) -> Option<&str> {
        match self {
            Resolution::Resolved { url, .. } => Some(url),
            Resolution::NotFound | Resolution::Exhausted => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved { .. })
    }
}

/// Resolves short codes through the cache and keeps snapshots in step.
///
/// The cache only holds advisory budget snapshots. The durable budget is
/// decremented by the consumer when it processes the `read` events emitted
/// here; the coordinator never writes it. Snapshot rewrites and evictions are
/// queued and applied in the background, so their ordering relative to later
/// resolves is best effort.
pub struct RedirectCoordinator<L: LinkRepository> {
    links: Arc<L>,
    cache: Arc<dyn CacheService>,
    queue: CacheWriteQueue,
    publisher: Arc<dyn EventPublisher>,
    cache_ttl_seconds: u64,
}

impl<L: LinkRepository> RedirectCoordinator<L> {
    pub fn new(
        links: Arc<L>,
        cache: Arc<dyn CacheService>,
        queue: CacheWriteQueue,
        publisher: Arc<dyn EventPublisher>,
        cache_ttl_seconds: u64,
    ) -> Self {
        Self {
            links,
            cache,
            queue,
            publisher,
            cache_ttl_seconds,
        }
    }

    /// Resolves `code` to its target URL.
    ///
    /// Internal failures are logged and reported as [`Resolution::NotFound`];
    /// this method never returns an error.
    ///
    /// # Cache hit
    ///
    /// | snapshot budget | action                                   |
    /// |-----------------|------------------------------------------|
    /// | unlimited       | serve, keep entry                        |
    /// | `n > 1`         | serve, queue rewrite with `n - 1`        |
    /// | `1`             | serve, queue eviction                    |
    /// | `0`             | queue eviction, report exhausted         |
    ///
    /// # Cache miss
    ///
    /// The durable record decides. An active link is served and a snapshot
    /// of the record, budget as stored, is queued for the cache.
    ///
    /// Every served redirect publishes a `read` event.
    pub async fn resolve(&self, code: &str) -> Resolution {
        let now = Utc::now();

        match self.cache.get_entry(code).await {
            Ok(Some(entry)) => {
                if let Some(resolution) = self.resolve_snapshot(code, entry, now).await {
                    return resolution;
                }
            }
            Ok(None) => {}
            Err(e) => warn!(code, error = %e, "cache lookup failed"),
        }

        self.resolve_durable(code, now).await
    }

    async fn resolve_snapshot(
        &self,
        code: &str,
        entry: CacheEntry,
        now: DateTime<Utc>,
    ) -> Option<Resolution> {
        if entry.is_expired_at(now) {
            debug!(code, "cached snapshot outlived its link");
            self.queue.schedule(CacheTask::Evict { code: code.into() });
            return None;
        }

        match entry.budget {
            None => {}
            Some(0) => {
                self.queue.schedule(CacheTask::Evict { code: code.into() });
                return Some(Resolution::Exhausted);
            }
            Some(1) => {
                self.queue.schedule(CacheTask::Evict { code: code.into() });
            }
            Some(budget) => {
                self.queue.schedule(CacheTask::Refresh {
                    code: code.into(),
                    entry: entry.with_budget(budget - 1),
                    ttl_seconds: Some(self.snapshot_ttl(entry.expires_at(), now)),
                });
            }
        }

        self.emit(LifecycleEvent::read(entry.to_link(code), entry.budget))
            .await;

        Some(Resolution::Resolved {
            url: entry.url,
            from_cache: true,
        })
    }

    async fn resolve_durable(&self, code: &str, now: DateTime<Utc>) -> Resolution {
        let link = match self.links.find_by_code(code).await {
            Ok(Some(link)) => link,
            Ok(None) => return Resolution::NotFound,
            Err(e) => {
                warn!(code, error = %e, "link lookup failed");
                return Resolution::NotFound;
            }
        };

        if !link.is_active_at(now) {
            return Resolution::Exhausted;
        }

        self.queue.schedule(CacheTask::Refresh {
            code: code.into(),
            entry: CacheEntry::from_link(&link),
            ttl_seconds: Some(self.snapshot_ttl(link.expires_at(), now)),
        });

        let budget = link.remaining_redirects;
        let url = link.url.clone();
        self.emit(LifecycleEvent::read(link, budget)).await;

        Resolution::Resolved {
            url,
            from_cache: false,
        }
    }

    /// Writes the initial snapshot of a new link and publishes `create`.
    ///
    /// The cache write is awaited so the first resolve already hits. Links
    /// that are born inactive are not cached.
    pub async fn announce_created(&self, link: &ShortLink) {
        let now = Utc::now();

        if link.is_active_at(now) {
            let ttl = self.snapshot_ttl(link.expires_at(), now);
            if let Err(e) = self
                .cache
                .set_entry(&link.code, &CacheEntry::from_link(link), Some(ttl))
                .await
            {
                warn!(code = %link.code, error = %e, "cache write-through failed");
            }
        }

        self.emit(LifecycleEvent::created(link.clone())).await;
    }

    /// Returns the durable record for `code`.
    ///
    /// Unexpired links have their snapshot refreshed from the record.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the code is unknown.
    pub async fn details(&self, code: &str) -> Result<ShortLink, AppError> {
        let link = self
            .links
            .find_by_code(code)
            .await?
            .ok_or_else(|| AppError::not_found("Short link not found", json!({ "code": code })))?;

        let now = Utc::now();
        if link.is_active_at(now) {
            let ttl = self.snapshot_ttl(link.expires_at(), now);
            if let Err(e) = self
                .cache
                .set_entry(code, &CacheEntry::from_link(&link), Some(ttl))
                .await
            {
                warn!(code, error = %e, "cache refresh failed");
            }
        }

        Ok(link)
    }

    /// Cache lifetime for a snapshot, never past the link's own expiry.
    fn snapshot_ttl(&self, expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> u64 {
        match expires_at {
            Some(deadline) => {
                let remaining = (deadline - now).num_seconds().max(1);
                self.cache_ttl_seconds.min(remaining.unsigned_abs())
            }
            None => self.cache_ttl_seconds,
        }
    }

    async fn emit(&self, event: LifecycleEvent) {
        let payload = match event.encode() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "failed to encode lifecycle event");
                return;
            }
        };

        if let Err(e) = self
            .publisher
            .publish(&event.topic(), event.key(), payload)
            .await
        {
            warn!(topic = %event.topic(), code = event.key(), error = %e, "failed to publish lifecycle event");
        }
    }
}
