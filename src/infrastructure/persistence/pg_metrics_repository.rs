//! PostgreSQL implementation of the metrics repository.

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{CounterDelta, HostMetric, PathMetric, PathUpsert};
use crate::domain::repositories::MetricsRepository;
use crate::error::AppError;

/// PostgreSQL repository for path and host counters.
///
/// Upserts use `INSERT ... ON CONFLICT DO UPDATE`, so each one is a single
/// atomic statement. `xmax = 0` on the returned row tells whether the row was
/// just inserted.
pub struct PgMetricsRepository {
    pool: Arc<PgPool>,
}

impl PgMetricsRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PathRow {
    id: i64,
    url: String,
    redirect_count: i64,
    creation_count: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct PathUpsertRow {
    #[sqlx(flatten)]
    path: PathRow,
    inserted: bool,
}

#[derive(Debug, sqlx::FromRow)]
struct HostRow {
    id: i64,
    host: String,
    redirect_count: i64,
    creation_count: i64,
    path_ids: Vec<i64>,
}

impl From<PathRow> for PathMetric {
    fn from(r: PathRow) -> Self {
        PathMetric {
            id: r.id,
            url: r.url,
            redirect_count: r.redirect_count,
            creation_count: r.creation_count,
        }
    }
}

impl From<HostRow> for HostMetric {
    fn from(r: HostRow) -> Self {
        HostMetric {
            id: r.id,
            host: r.host,
            redirect_count: r.redirect_count,
            creation_count: r.creation_count,
            path_ids: r.path_ids,
        }
    }
}

/// Escapes `LIKE` wildcards so the query matches literally.
fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait]
impl MetricsRepository for PgMetricsRepository {
    async fn upsert_path(&self, url: &str, delta: CounterDelta) -> Result<PathUpsert, AppError> {
        let row = sqlx::query_as::<_, PathUpsertRow>(
            r#"
            INSERT INTO path_metrics (url, redirect_count, creation_count)
            VALUES ($1, $2, $3)
            ON CONFLICT (url) DO UPDATE
            SET redirect_count = path_metrics.redirect_count + EXCLUDED.redirect_count,
                creation_count = path_metrics.creation_count + EXCLUDED.creation_count
            RETURNING id, url, redirect_count, creation_count, (xmax = 0) AS inserted
            "#,
        )
        .bind(url)
        .bind(delta.redirects)
        .bind(delta.creations)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(PathUpsert {
            metric: row.path.into(),
            inserted: row.inserted,
        })
    }

    async fn upsert_host(
        &self,
        host: &str,
        delta: CounterDelta,
        new_path_id: Option<i64>,
    ) -> Result<HostMetric, AppError> {
        let row = sqlx::query_as::<_, HostRow>(
            r#"
            INSERT INTO host_metrics (host, redirect_count, creation_count, path_ids)
            VALUES (
                $1, $2, $3,
                CASE WHEN $4::BIGINT IS NULL THEN '{}'::BIGINT[] ELSE ARRAY[$4::BIGINT] END
            )
            ON CONFLICT (host) DO UPDATE
            SET redirect_count = host_metrics.redirect_count + EXCLUDED.redirect_count,
                creation_count = host_metrics.creation_count + EXCLUDED.creation_count,
                path_ids = CASE
                    WHEN $4::BIGINT IS NULL OR $4::BIGINT = ANY(host_metrics.path_ids)
                        THEN host_metrics.path_ids
                    ELSE array_append(host_metrics.path_ids, $4::BIGINT)
                END
            RETURNING id, host, redirect_count, creation_count, path_ids
            "#,
        )
        .bind(host)
        .bind(delta.redirects)
        .bind(delta.creations)
        .bind(new_path_id)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(row.into())
    }

    async fn find_path(&self, url: &str) -> Result<Option<PathMetric>, AppError> {
        let row = sqlx::query_as::<_, PathRow>(
            "SELECT id, url, redirect_count, creation_count FROM path_metrics WHERE url = $1",
        )
        .bind(url)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(PathMetric::from))
    }

    async fn find_host(&self, host: &str) -> Result<Option<HostMetric>, AppError> {
        let row = sqlx::query_as::<_, HostRow>(
            r#"
            SELECT id, host, redirect_count, creation_count, path_ids
            FROM host_metrics
            WHERE host = $1
            "#,
        )
        .bind(host)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(HostMetric::from))
    }

    async fn search_hosts(&self, query: &str, limit: i64) -> Result<Vec<HostMetric>, AppError> {
        let rows = sqlx::query_as::<_, HostRow>(
            r#"
            SELECT id, host, redirect_count, creation_count, path_ids
            FROM host_metrics
            WHERE host ILIKE $1 ESCAPE '\'
            ORDER BY redirect_count DESC, host
            LIMIT $2
            "#,
        )
        .bind(like_pattern(query))
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(HostMetric::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("example"), "%example%");
        assert_eq!(like_pattern(""), "%%");
        assert_eq!(like_pattern("a_b%c"), "%a\\_b\\%c%");
    }
}
