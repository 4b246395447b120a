//! Read side of the usage counters.

use serde_json::json;
use std::sync::Arc;

use crate::domain::entities::{HostMetric, PathMetric};
use crate::domain::repositories::MetricsRepository;
use crate::error::AppError;
use crate::utils::url_normalizer::{metric_host, normalize_url};

/// Largest page returned by [`MetricsQueryService::search_hosts`].
pub const MAX_SEARCH_LIMIT: i64 = 50;

/// Looks up aggregated path and host counters.
pub struct MetricsQueryService<M: MetricsRepository> {
    metrics: Arc<M>,
}

impl<M: MetricsRepository> MetricsQueryService<M> {
    pub fn new(metrics: Arc<M>) -> Self {
        Self { metrics }
    }

    /// Counters for a host. Accepts a bare host name or a full URL.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if nothing was recorded for the host.
    pub async fn host(&self, host: &str) -> Result<HostMetric, AppError> {
        let key = host_key(host);
        self.metrics
            .find_host(&key)
            .await?
            .ok_or_else(|| AppError::not_found("No metrics for host", json!({ "host": key })))
    }

    /// Counters for an exact target URL.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] for a malformed URL and
    /// [`AppError::NotFound`] if nothing was recorded for it.
    pub async fn path(&self, url: &str) -> Result<PathMetric, AppError> {
        let url = normalize_url(url).map_err(|e| {
            AppError::bad_request("Invalid URL format", json!({ "reason": e.to_string() }))
        })?;

        self.metrics
            .find_path(&url)
            .await?
            .ok_or_else(|| AppError::not_found("No metrics for path", json!({ "url": url })))
    }

    /// Hosts containing `query`, most redirected first.
    ///
    /// `limit` defaults to and is capped at [`MAX_SEARCH_LIMIT`].
    pub async fn search_hosts(
        &self,
        query: &str,
        limit: Option<i64>,
    ) -> Result<Vec<HostMetric>, AppError> {
        let limit = limit.unwrap_or(MAX_SEARCH_LIMIT).clamp(1, MAX_SEARCH_LIMIT);
        self.metrics
            .search_hosts(query.trim().to_lowercase().as_str(), limit)
            .await
    }
}

fn host_key(input: &str) -> String {
    let input = input.trim();
    if input.contains("://")
        && let Ok(host) = metric_host(input)
    {
        return host;
    }

    let host = input.to_ascii_lowercase();
    match host.strip_prefix("www.") {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => host,
    }
}
