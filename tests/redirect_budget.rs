mod common;

use chrono::{Duration, Utc};
use common::{Harness, eventually};
use url_shortener_pipeline::application::services::Resolution;
use url_shortener_pipeline::domain::entities::NewShortLink;
use url_shortener_pipeline::domain::repositories::{LinkRepository, MetricsRepository};
use url_shortener_pipeline::infrastructure::cache::CacheService;

#[tokio::test]
async fn test_budget_of_two_serves_twice_then_stops() {
    let harness = Harness::start();
    let h = &harness;

    let link = h
        .shortener
        .shorten(NewShortLink::new("http://a.example/x").with_budget(2))
        .await
        .unwrap();
    let code = link.code.as_str();
    assert_eq!(h.cached_budget(code).await, Some(Some(2)));

    let first = h.coordinator.resolve(code).await;
    assert_eq!(
        first,
        Resolution::Resolved {
            url: "http://a.example/x".into(),
            from_cache: true,
        }
    );
    eventually(|| async move { h.cached_budget(code).await == Some(Some(1)) }).await;

    let second = h.coordinator.resolve(code).await;
    assert_eq!(second.target(), Some("http://a.example/x"));
    eventually(|| async move { h.cached_budget(code).await.is_none() }).await;
    eventually(|| async move { h.stored(code).await.remaining_redirects == Some(0) }).await;

    let third = h.coordinator.resolve(code).await;
    assert!(!third.is_resolved());

    let path = h
        .metrics
        .find_path("http://a.example/x")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(path.creation_count, 1);
    assert_eq!(path.redirect_count, 2);

    let host = h.metrics.find_host("a.example").await.unwrap().unwrap();
    assert_eq!(host.redirect_count, 2);
    assert_eq!(host.creation_count, 1);
    assert_eq!(host.path_ids, vec![path.id]);

    assert_eq!(harness.shutdown().await, 3);
}

#[tokio::test]
async fn test_single_use_link_is_not_cached_after_first_visit() {
    let harness = Harness::start();
    let h = &harness;

    let link = h
        .shortener
        .shorten(NewShortLink::new("http://once.example/").with_budget(1))
        .await
        .unwrap();
    let code = link.code.as_str();

    assert!(h.coordinator.resolve(code).await.is_resolved());

    eventually(|| async move { h.cached_budget(code).await.is_none() }).await;
    eventually(|| async move { h.stored(code).await.remaining_redirects == Some(0) }).await;

    assert!(!h.coordinator.resolve(code).await.is_resolved());
    assert_eq!(h.cached_budget(code).await, None);
}

#[tokio::test]
async fn test_unlimited_link_keeps_resolving() {
    let harness = Harness::start();
    let h = &harness;

    let link = h
        .shortener
        .shorten(NewShortLink::new("https://www.c.example/docs"))
        .await
        .unwrap();
    let code = link.code.as_str();

    for _ in 0..100 {
        let resolution = h.coordinator.resolve(code).await;
        assert_eq!(resolution.target(), Some("https://www.c.example/docs"));
    }

    eventually(|| async move {
        h.metrics
            .find_path("https://www.c.example/docs")
            .await
            .unwrap()
            .is_some_and(|p| p.redirect_count == 100)
    })
    .await;

    let stored = h.stored(code).await;
    assert_eq!(stored.remaining_redirects, None);
    assert!(stored.last_visit_at.is_some());

    let host = h.metrics.find_host("c.example").await.unwrap().unwrap();
    assert_eq!(host.redirect_count, 100);
    assert_eq!(host.creation_count, 1);
}

#[tokio::test]
async fn test_unknown_code_is_not_found() {
    let harness = Harness::start();

    assert_eq!(
        harness.coordinator.resolve("missing").await,
        Resolution::NotFound
    );
    assert_eq!(harness.shutdown().await, 0);
}

#[tokio::test]
async fn test_details_restores_evicted_snapshot() {
    let h = Harness::start();

    let link = h
        .shortener
        .shorten(NewShortLink::new("http://d.example/").with_budget(5))
        .await
        .unwrap();
    h.cache.invalidate(&link.code).await.unwrap();

    let details = h.coordinator.details(&link.code).await.unwrap();

    assert_eq!(details.remaining_redirects, Some(5));
    assert_eq!(h.cached_budget(&link.code).await, Some(Some(5)));
}

#[tokio::test]
async fn test_expired_link_does_not_resolve() {
    let h = Harness::start();

    let mut link = common::link("old123", "http://e.example/", None);
    link.ttl_hours = Some(1);
    link.created_at = Utc::now() - Duration::hours(2);
    h.links.insert(&link).await.unwrap();

    assert_eq!(h.coordinator.resolve("old123").await, Resolution::Exhausted);
    assert_eq!(h.cached_budget("old123").await, None);
}

#[tokio::test]
async fn test_miss_caches_stored_budget() {
    let harness = Harness::start();
    let h = &harness;

    h.links
        .insert(&common::link("cold01", "http://f.example/", Some(3)))
        .await
        .unwrap();

    assert_eq!(
        h.coordinator.resolve("cold01").await,
        Resolution::Resolved {
            url: "http://f.example/".into(),
            from_cache: false,
        }
    );
    eventually(|| async move { h.cached_budget("cold01").await == Some(Some(3)) }).await;

    let second = h.coordinator.resolve("cold01").await;
    assert_eq!(
        second,
        Resolution::Resolved {
            url: "http://f.example/".into(),
            from_cache: true,
        }
    );
}
