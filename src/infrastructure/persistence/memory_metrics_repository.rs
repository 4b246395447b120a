//! In-process metrics store.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::domain::entities::{CounterDelta, HostMetric, PathMetric, PathUpsert};
use crate::domain::repositories::MetricsRepository;
use crate::error::AppError;

#[derive(Default)]
struct Tables {
    paths: HashMap<String, PathMetric>,
    hosts: HashMap<String, HostMetric>,
    next_id: i64,
}

impl Tables {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// [`MetricsRepository`] keeping counters in local maps.
#[derive(Default)]
pub struct InMemoryMetricsRepository {
    tables: Mutex<Tables>,
}

impl InMemoryMetricsRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetricsRepository for InMemoryMetricsRepository {
    async fn upsert_path(&self, url: &str, delta: CounterDelta) -> Result<PathUpsert, AppError> {
        let mut tables = self.tables.lock().await;

        let inserted = !tables.paths.contains_key(url);
        if inserted {
            let id = tables.allocate_id();
            tables.paths.insert(
                url.to_string(),
                PathMetric {
                    id,
                    url: url.to_string(),
                    redirect_count: 0,
                    creation_count: 0,
                },
            );
        }

        let metric = tables
            .paths
            .get_mut(url)
            .ok_or_else(|| AppError::internal("path metric vanished", serde_json::json!({})))?;
        metric.redirect_count += delta.redirects;
        metric.creation_count += delta.creations;

        Ok(PathUpsert {
            metric: metric.clone(),
            inserted,
        })
    }

    async fn upsert_host(
        &self,
        host: &str,
        delta: CounterDelta,
        new_path_id: Option<i64>,
    ) -> Result<HostMetric, AppError> {
        let mut tables = self.tables.lock().await;

        if !tables.hosts.contains_key(host) {
            let id = tables.allocate_id();
            tables.hosts.insert(
                host.to_string(),
                HostMetric {
                    id,
                    host: host.to_string(),
                    redirect_count: 0,
                    creation_count: 0,
                    path_ids: Vec::new(),
                },
            );
        }

        let metric = tables
            .hosts
            .get_mut(host)
            .ok_or_else(|| AppError::internal("host metric vanished", serde_json::json!({})))?;
        metric.redirect_count += delta.redirects;
        metric.creation_count += delta.creations;
        if let Some(path_id) = new_path_id
            && !metric.path_ids.contains(&path_id)
        {
            metric.path_ids.push(path_id);
        }

        Ok(metric.clone())
    }

    async fn find_path(&self, url: &str) -> Result<Option<PathMetric>, AppError> {
        Ok(self.tables.lock().await.paths.get(url).cloned())
    }

    async fn find_host(&self, host: &str) -> Result<Option<HostMetric>, AppError> {
        Ok(self.tables.lock().await.hosts.get(host).cloned())
    }

    async fn search_hosts(&self, query: &str, limit: i64) -> Result<Vec<HostMetric>, AppError> {
        let needle = query.to_lowercase();
        let tables = self.tables.lock().await;

        let mut hosts: Vec<HostMetric> = tables
            .hosts
            .values()
            .filter(|h| h.host.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        hosts.sort_by(|a, b| {
            b.redirect_count
                .cmp(&a.redirect_count)
                .then_with(|| a.host.cmp(&b.host))
        });
        hosts.truncate(usize::try_from(limit).unwrap_or(0));

        Ok(hosts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::EventAction;

    #[tokio::test]
    async fn test_path_upsert_reports_insertion_once() {
        let repo = InMemoryMetricsRepository::new();
        let read = CounterDelta::for_action(EventAction::Read);

        let first = repo.upsert_path("http://a.example/x", read).await.unwrap();
        let second = repo.upsert_path("http://a.example/x", read).await.unwrap();

        assert!(first.inserted);
        assert!(!second.inserted);
        assert_eq!(first.metric.id, second.metric.id);
        assert_eq!(second.metric.redirect_count, 2);
    }

    #[tokio::test]
    async fn test_host_path_ids_have_no_duplicates() {
        let repo = InMemoryMetricsRepository::new();
        let create = CounterDelta::for_action(EventAction::Create);

        repo.upsert_host("a.example", create, Some(7)).await.unwrap();
        repo.upsert_host("a.example", create, Some(7)).await.unwrap();
        let host = repo.upsert_host("a.example", create, None).await.unwrap();

        assert_eq!(host.path_ids, vec![7]);
        assert_eq!(host.creation_count, 3);
        assert_eq!(host.redirect_count, 0);
    }

    #[tokio::test]
    async fn test_search_orders_by_redirects_and_limits() {
        let repo = InMemoryMetricsRepository::new();
        let read = CounterDelta::for_action(EventAction::Read);

        repo.upsert_host("a.example", read, None).await.unwrap();
        for _ in 0..3 {
            repo.upsert_host("b.example", read, None).await.unwrap();
        }
        repo.upsert_host("other.org", read, None).await.unwrap();

        let found = repo.search_hosts("EXAMPLE", 10).await.unwrap();
        let names: Vec<_> = found.iter().map(|h| h.host.as_str()).collect();
        assert_eq!(names, vec!["b.example", "a.example"]);

        assert_eq!(repo.search_hosts("", 1).await.unwrap().len(), 1);
    }
}
