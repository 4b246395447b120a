#![allow(dead_code)]

use chrono::{DateTime, SubsecRound, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use url_shortener_pipeline::application::services::{RedirectCoordinator, ShortenService};
use url_shortener_pipeline::domain::entities::ShortLink;
use url_shortener_pipeline::domain::events::{LifecycleEvent, RawMessage};
use url_shortener_pipeline::domain::repositories::LinkRepository;
use url_shortener_pipeline::error::AppError;
use url_shortener_pipeline::infrastructure::cache::{
    CacheService, CacheWriteQueue, MemoryCache, run_cache_worker,
};
use url_shortener_pipeline::infrastructure::messaging::channel;
use url_shortener_pipeline::infrastructure::persistence::{
    InMemoryLinkRepository, InMemoryMetricsRepository,
};
use url_shortener_pipeline::pipeline::{Consumer, TimingUnit};
use url_shortener_pipeline::server::lifecycle_handlers;

/// Redirect path and consumer wired together in process.
///
/// Events published by the coordinator travel over a channel to a consumer
/// task; cache tasks are applied by a background worker.
pub struct Harness {
    pub links: Arc<InMemoryLinkRepository>,
    pub metrics: Arc<InMemoryMetricsRepository>,
    pub cache: Arc<MemoryCache>,
    pub coordinator: Arc<RedirectCoordinator<InMemoryLinkRepository>>,
    pub shortener: ShortenService<InMemoryLinkRepository>,
    consumer: JoinHandle<Result<u64, AppError>>,
    cache_worker: JoinHandle<()>,
}

impl Harness {
    pub fn start() -> Self {
        let links = Arc::new(InMemoryLinkRepository::new());
        let metrics = Arc::new(InMemoryMetricsRepository::new());
        let cache = Arc::new(MemoryCache::new(120));

        let (publisher, mut source) = channel(1024);
        let consumer = Consumer::standard(
            lifecycle_handlers(links.clone(), metrics.clone()),
            TimingUnit::Millis,
        );
        let consumer = tokio::spawn(async move { consumer.run(&mut source).await });

        let (queue, rx) = CacheWriteQueue::new(1024);
        let cache_worker = tokio::spawn(run_cache_worker(rx, cache.clone()));

        let coordinator = Arc::new(RedirectCoordinator::new(
            links.clone(),
            cache.clone(),
            queue,
            Arc::new(publisher),
            120,
        ));
        let shortener = ShortenService::new(links.clone(), coordinator.clone());

        Self {
            links,
            metrics,
            cache,
            coordinator,
            shortener,
            consumer,
            cache_worker,
        }
    }

    pub async fn stored(&self, code: &str) -> ShortLink {
        self.links.find_by_code(code).await.unwrap().unwrap()
    }

    pub async fn cached_budget(&self, code: &str) -> Option<Option<u32>> {
        self.cache
            .get_entry(code)
            .await
            .unwrap()
            .map(|entry| entry.budget)
    }

    /// Stops both background tasks once everything queued has been handled.
    pub async fn shutdown(self) -> u64 {
        drop(self.shortener);
        drop(self.coordinator);
        self.cache_worker.await.unwrap();
        self.consumer.await.unwrap().unwrap()
    }
}

/// Polls `check` until it holds, failing the test after about two seconds.
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

pub fn link(code: &str, url: &str, budget: Option<u32>) -> ShortLink {
    ShortLink::new(
        code.into(),
        url.into(),
        budget,
        None,
        Utc::now().trunc_subsecs(3),
    )
}

pub fn read_message(link: &ShortLink, at: DateTime<Utc>) -> RawMessage {
    let event = LifecycleEvent::read(link.clone(), link.remaining_redirects);
    message(&event, at)
}

pub fn create_message(link: &ShortLink) -> RawMessage {
    let event = LifecycleEvent::created(link.clone());
    message(&event, event.emitted_at)
}

fn message(event: &LifecycleEvent, at: DateTime<Utc>) -> RawMessage {
    RawMessage {
        topic: event.topic(),
        key: Some(event.key().to_string()),
        timestamp: at,
        partition: 0,
        offset: "0".into(),
        payload: event.encode().unwrap(),
    }
}
