//! Short link creation.

use chrono::{SubsecRound, Utc};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use super::redirect_coordinator::RedirectCoordinator;
use crate::domain::entities::{NewShortLink, ShortLink};
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;
use crate::utils::code_generator::{generate_code, validate_custom_code};
use crate::utils::url_normalizer::normalize_url;

/// Upper bound on links created by one [`ShortenService::shorten_many`] call.
pub const MAX_BULK_ITEMS: usize = 4096;

const MAX_CODE_ATTEMPTS: usize = 5;

/// Creates short links and announces them.
///
/// A new link is inserted into the durable store, written through to the
/// cache and published as a `create` event.
pub struct ShortenService<L: LinkRepository> {
    links: Arc<L>,
    coordinator: Arc<RedirectCoordinator<L>>,
}

impl<L: LinkRepository> ShortenService<L> {
    pub fn new(links: Arc<L>, coordinator: Arc<RedirectCoordinator<L>>) -> Self {
        Self { links, coordinator }
    }

    /// Creates one short link.
    ///
    /// # Code Generation
    ///
    /// - A custom code is validated and used as is; a taken code is a conflict
    /// - Otherwise a random code is generated, retrying on collision
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if the URL or custom code is invalid,
    /// [`AppError::Conflict`] if the custom code is taken, and
    /// [`AppError::Internal`] if no free random code was found.
    pub async fn shorten(&self, request: NewShortLink) -> Result<ShortLink, AppError> {
        let url = validate_request(&request)?;
        let stored = self.insert(request, url).await?;

        info!(code = %stored.code, url = %stored.url, budget = ?stored.remaining_redirects, "short link created");
        self.coordinator.announce_created(&stored).await;

        Ok(stored)
    }

    /// Creates up to [`MAX_BULK_ITEMS`] links.
    ///
    /// Every item is validated before anything is inserted. Items are then
    /// created in order; the first failure stops the batch and links created
    /// before it are kept.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] for an empty or oversized batch or an
    /// invalid item, otherwise the error of the first failed creation.
    pub async fn shorten_many(
        &self,
        requests: Vec<NewShortLink>,
    ) -> Result<Vec<ShortLink>, AppError> {
        if requests.is_empty() || requests.len() > MAX_BULK_ITEMS {
            return Err(AppError::bad_request(
                format!("Batch must contain 1-{} items", MAX_BULK_ITEMS),
                json!({ "provided": requests.len() }),
            ));
        }

        for (index, request) in requests.iter().enumerate() {
            validate_request(request).map_err(|e| {
                AppError::bad_request(
                    format!("Item {} is invalid: {}", index, e),
                    json!({ "index": index }),
                )
            })?;
        }

        let mut created = Vec::with_capacity(requests.len());
        for request in requests {
            created.push(self.shorten(request).await?);
        }
        Ok(created)
    }

    async fn insert(&self, request: NewShortLink, url: String) -> Result<ShortLink, AppError> {
        let created_at = Utc::now().trunc_subsecs(3);

        if let Some(code) = request.custom_code {
            let link = ShortLink::new(
                code,
                url,
                request.remaining_redirects,
                request.ttl_hours,
                created_at,
            );
            return self.links.insert(&link).await;
        }

        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let link = ShortLink::new(
                generate_code()?,
                url.clone(),
                request.remaining_redirects,
                request.ttl_hours,
                created_at,
            );

            match self.links.insert(&link).await {
                Ok(stored) => return Ok(stored),
                Err(e) if e.is_conflict() => {
                    warn!(attempt, "code collision, retrying");
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::internal(
            "Failed to generate unique code",
            json!({ "reason": "Too many collisions" }),
        ))
    }
}

/// Checks a request and returns its normalized URL.
fn validate_request(request: &NewShortLink) -> Result<String, AppError> {
    if let Some(code) = &request.custom_code {
        validate_custom_code(code)?;
    }

    normalize_url(&request.url).map_err(|e| {
        AppError::bad_request("Invalid URL format", json!({ "reason": e.to_string() }))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repositories::MockLinkRepository;
    use crate::infrastructure::cache::{CacheService, CacheWriteQueue, MemoryCache};
    use crate::infrastructure::messaging::MockEventPublisher;

    fn service(
        links: MockLinkRepository,
        publisher: MockEventPublisher,
        cache: Arc<MemoryCache>,
    ) -> ShortenService<MockLinkRepository> {
        let links = Arc::new(links);
        let (queue, _rx) = CacheWriteQueue::new(16);
        let coordinator = Arc::new(RedirectCoordinator::new(
            links.clone(),
            cache,
            queue,
            Arc::new(publisher),
            120,
        ));
        ShortenService::new(links, coordinator)
    }

    fn publisher(times: usize) -> MockEventPublisher {
        let mut publisher = MockEventPublisher::new();
        publisher
            .expect_publish()
            .withf(|topic, _, _| topic == "URL.create")
            .times(times)
            .returning(|_, _, _| Ok(()));
        publisher
    }

    #[tokio::test]
    async fn test_shorten_normalizes_and_announces() {
        let mut links = MockLinkRepository::new();
        links
            .expect_insert()
            .withf(|link| link.url == "https://example.com/path" && link.remaining_redirects == Some(3))
            .times(1)
            .returning(|link| Ok(link.clone()));
        let cache = Arc::new(MemoryCache::new(120));

        let service = service(links, publisher(1), cache.clone());

        let link = service
            .shorten(NewShortLink::new("HTTPS://Example.COM/path#frag").with_budget(3))
            .await
            .unwrap();

        assert_eq!(link.code.len(), 16);
        let cached = cache.get_entry(&link.code).await.unwrap().unwrap();
        assert_eq!(cached.budget, Some(3));
    }

    #[tokio::test]
    async fn test_shorten_with_maximal_ttl_is_cached_without_expiry() {
        let mut links = MockLinkRepository::new();
        links
            .expect_insert()
            .times(1)
            .returning(|link| Ok(link.clone()));
        let cache = Arc::new(MemoryCache::new(120));

        let service = service(links, publisher(1), cache.clone());

        let link = service
            .shorten(NewShortLink::new("https://example.com").with_ttl_hours(u32::MAX))
            .await
            .unwrap();

        assert!(link.expires_at().is_none());
        let cached = cache.get_entry(&link.code).await.unwrap().unwrap();
        assert_eq!(cached.ttl_hours, Some(u32::MAX));
    }

    #[tokio::test]
    async fn test_custom_code_conflict_is_returned() {
        let mut links = MockLinkRepository::new();
        links
            .expect_insert()
            .times(1)
            .returning(|_| Err(AppError::conflict("taken", json!({}))));

        let service = service(links, publisher(0), Arc::new(MemoryCache::new(120)));

        let err = service
            .shorten(NewShortLink::new("https://example.com").with_code("my-link"))
            .await
            .unwrap_err();

        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_generated_code_collision_is_retried() {
        let mut links = MockLinkRepository::new();
        let mut calls = 0;
        links.expect_insert().times(2).returning(move |link| {
            calls += 1;
            if calls == 1 {
                Err(AppError::conflict("taken", json!({})))
            } else {
                Ok(link.clone())
            }
        });

        let service = service(links, publisher(1), Arc::new(MemoryCache::new(120)));

        assert!(service.shorten(NewShortLink::new("https://example.com")).await.is_ok());
    }

    #[tokio::test]
    async fn test_collisions_exhaust_attempts() {
        let mut links = MockLinkRepository::new();
        links
            .expect_insert()
            .times(MAX_CODE_ATTEMPTS)
            .returning(|_| Err(AppError::conflict("taken", json!({}))));

        let service = service(links, publisher(0), Arc::new(MemoryCache::new(120)));

        let err = service
            .shorten(NewShortLink::new("https://example.com"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "internal_error");
    }

    #[tokio::test]
    async fn test_invalid_input_is_rejected_before_insert() {
        let mut links = MockLinkRepository::new();
        links.expect_insert().never();

        let service = service(links, publisher(0), Arc::new(MemoryCache::new(120)));

        for request in [
            NewShortLink::new("ftp://example.com/file"),
            NewShortLink::new("not a url"),
            NewShortLink::new("https://example.com").with_code("no"),
        ] {
            let err = service.shorten(request).await.unwrap_err();
            assert_eq!(err.code(), "validation_error");
        }
    }

    #[tokio::test]
    async fn test_bulk_limits() {
        let mut links = MockLinkRepository::new();
        links.expect_insert().never();
        let service = service(links, publisher(0), Arc::new(MemoryCache::new(120)));

        assert!(service.shorten_many(Vec::new()).await.is_err());

        let too_many = vec![NewShortLink::new("https://example.com"); MAX_BULK_ITEMS + 1];
        assert!(service.shorten_many(too_many).await.is_err());

        let one_bad = vec![
            NewShortLink::new("https://example.com"),
            NewShortLink::new("javascript:alert(1)"),
        ];
        assert!(service.shorten_many(one_bad).await.is_err());
    }

    #[tokio::test]
    async fn test_bulk_creates_in_order() {
        let mut links = MockLinkRepository::new();
        links
            .expect_insert()
            .times(3)
            .returning(|link| Ok(link.clone()));

        let service = service(links, publisher(3), Arc::new(MemoryCache::new(120)));

        let created = service
            .shorten_many(vec![
                NewShortLink::new("https://a.example/1"),
                NewShortLink::new("https://b.example/2"),
                NewShortLink::new("https://c.example/3"),
            ])
            .await
            .unwrap();

        let urls: Vec<_> = created.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://a.example/1", "https://b.example/2", "https://c.example/3"]
        );
    }
}
