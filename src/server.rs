//! Consumer process wiring.
//!
//! Handles database and Redis connections, handler registration and the
//! consumer lifecycle.

use crate::application::services::{MetricsAggregator, VisitHandler};
use crate::config::Config;
use crate::domain::events::EventAction;
use crate::domain::repositories::{LinkRepository, MetricsRepository};
use crate::infrastructure::cache::{CacheService, NullCache, RedisCache};
use crate::infrastructure::messaging::{RedisStreamsSource, StreamSubscription};
use crate::infrastructure::persistence::{
    PgLinkRepository, PgMetricsRepository, connect_pool, run_migrations,
};
use crate::pipeline::{Consumer, HandlerRegistry};

use anyhow::{Context, Result};
use std::sync::Arc;

/// Registers the lifecycle handlers.
///
/// - `URL.read`: [`VisitHandler`] and [`MetricsAggregator`]
/// - `URL.create`: [`MetricsAggregator`]
pub fn lifecycle_handlers<L, M>(links: Arc<L>, metrics: Arc<M>) -> HandlerRegistry
where
    L: LinkRepository + 'static,
    M: MetricsRepository + 'static,
{
    let aggregator = Arc::new(MetricsAggregator::new(metrics));
    let mut registry = HandlerRegistry::new();

    registry
        .register(EventAction::Read.topic(), Arc::new(VisitHandler::new(links)))
        .register(EventAction::Read.topic(), aggregator.clone())
        .register(EventAction::Create.topic(), aggregator);

    registry
}

/// Builds the redirect cache, falling back to [`NullCache`] when Redis is
/// not configured or unreachable.
pub async fn connect_cache(config: &Config) -> Arc<dyn CacheService> {
    if let Some(redis_url) = &config.redis_url {
        match RedisCache::connect(redis_url, config.cache_ttl_seconds).await {
            Ok(redis) => {
                tracing::info!("Cache enabled (Redis)");
                Arc::new(redis)
            }
            Err(e) => {
                tracing::warn!("Failed to connect to Redis: {}. Using NullCache.", e);
                Arc::new(NullCache::new())
            }
        }
    } else {
        tracing::info!("Cache disabled (NullCache)");
        Arc::new(NullCache::new())
    }
}

/// Runs the consumer until Ctrl-C.
///
/// Initializes:
/// - PostgreSQL connection pool
/// - Apply migrations
/// - Handler registry
/// - Redis stream subscription
///
/// # Errors
///
/// Returns an error if:
/// - Redis is not configured
/// - Database or Redis connection fails
/// - The event source fails after its retries
pub async fn run(config: Config) -> Result<()> {
    let redis_url = config
        .redis_url
        .clone()
        .context("Redis is required by the consumer (set REDIS_URL or REDIS_HOST)")?;

    let pool = Arc::new(
        connect_pool(&config)
            .await
            .context("Failed to connect to database")?,
    );
    run_migrations(&pool)
        .await
        .context("Failed to apply migrations")?;

    let registry = lifecycle_handlers(
        Arc::new(PgLinkRepository::new(pool.clone())),
        Arc::new(PgMetricsRepository::new(pool.clone())),
    );
    let consumer = Consumer::standard(registry, config.timing_unit);

    let mut source = RedisStreamsSource::connect(
        &redis_url,
        &consumer.topics(),
        StreamSubscription::from_config(&config),
    )
    .await
    .context("Failed to subscribe to event streams")?;

    tracing::info!(
        group = %config.stream_group,
        consumer_id = %config.consumer_id,
        "Consumer started"
    );

    let consumed = consumer
        .run_until(&mut source, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    tracing::info!(consumed, "Consumer stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::{InMemoryLinkRepository, InMemoryMetricsRepository};

    #[test]
    fn test_lifecycle_handlers_layout() {
        let registry = lifecycle_handlers(
            Arc::new(InMemoryLinkRepository::new()),
            Arc::new(InMemoryMetricsRepository::new()),
        );

        assert_eq!(registry.topics(), vec!["URL.create", "URL.read"]);
        assert_eq!(registry.handler_count("URL.read"), 2);
        assert_eq!(registry.handler_count("URL.create"), 1);
    }
}
