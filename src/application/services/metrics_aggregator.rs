//! Path and host usage counters fed by lifecycle events.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use crate::domain::entities::CounterDelta;
use crate::domain::events::Envelope;
use crate::domain::repositories::MetricsRepository;
use crate::error::AppError;
use crate::pipeline::Handler;
use crate::utils::url_normalizer::metric_host;

/// Counts creations and redirects per target URL and per host.
///
/// The path record is upserted first; when that upsert created it, its id is
/// linked into the host record by the second upsert. The two writes are not
/// transactional, so a failure in between leaves the path counted but not
/// linked to its host. Redelivered events are counted again.
pub struct MetricsAggregator<M: MetricsRepository> {
    metrics: Arc<M>,
}

impl<M: MetricsRepository> MetricsAggregator<M> {
    pub fn new(metrics: Arc<M>) -> Self {
        Self { metrics }
    }
}

#[async_trait]
impl<M: MetricsRepository + 'static> Handler for MetricsAggregator<M> {
    fn name(&self) -> &str {
        "metrics_aggregator"
    }

    async fn handle(&self, envelope: &Envelope) -> Result<(), AppError> {
        let event = envelope.lifecycle_event()?;
        let url = &event.link().url;
        let host = metric_host(url).map_err(|e| {
            AppError::bad_request(
                "Event URL has no usable host",
                json!({ "url": url, "reason": e.to_string() }),
            )
        })?;
        let delta = CounterDelta::for_action(event.action);

        let path = self.metrics.upsert_path(url, delta).await?;
        let new_path_id = path.inserted.then_some(path.metric.id);
        let host_metric = self.metrics.upsert_host(&host, delta, new_path_id).await?;

        debug!(
            action = %event.action,
            url = %url,
            host = %host_metric.host,
            path_redirects = path.metric.redirect_count,
            host_redirects = host_metric.redirect_count,
            "metrics updated"
        );
        Ok(())
    }
}
