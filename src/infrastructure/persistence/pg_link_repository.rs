//! PostgreSQL implementation of link repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::ShortLink;
use crate::domain::repositories::LinkRepository;
use crate::error::AppError;

/// PostgreSQL repository for short link records.
///
/// Visit accounting is a single `UPDATE ... RETURNING` statement, so
/// concurrent consumers never lose a decrement.
pub struct PgLinkRepository {
    pool: Arc<PgPool>,
}

impl PgLinkRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ShortLinkRow {
    code: String,
    url: String,
    remaining_redirects: Option<i32>,
    ttl_hours: Option<i32>,
    created_at: DateTime<Utc>,
    last_visit_at: Option<DateTime<Utc>>,
}

impl From<ShortLinkRow> for ShortLink {
    fn from(row: ShortLinkRow) -> Self {
        ShortLink {
            code: row.code,
            url: row.url,
            remaining_redirects: row.remaining_redirects.map(non_negative),
            ttl_hours: row.ttl_hours.map(non_negative),
            created_at: row.created_at,
            last_visit_at: row.last_visit_at,
        }
    }
}

fn non_negative(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

fn to_column(field: &str, value: Option<u32>) -> Result<Option<i32>, AppError> {
    value
        .map(|v| {
            i32::try_from(v).map_err(|_| {
                AppError::bad_request(
                    format!("{} is out of range", field),
                    json!({ "field": field, "value": v }),
                )
            })
        })
        .transpose()
}

#[async_trait]
impl LinkRepository for PgLinkRepository {
    async fn insert(&self, link: &ShortLink) -> Result<ShortLink, AppError> {
        let row = sqlx::query_as::<_, ShortLinkRow>(
            r#"
            INSERT INTO short_links (code, url, remaining_redirects, ttl_hours, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING code, url, remaining_redirects, ttl_hours, created_at, last_visit_at
            "#,
        )
        .bind(&link.code)
        .bind(&link.url)
        .bind(to_column("remaining_redirects", link.remaining_redirects)?)
        .bind(to_column("ttl_hours", link.ttl_hours)?)
        .bind(link.created_at)
        .fetch_one(self.pool.as_ref())
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict { .. } => AppError::conflict(
                "Short code already exists",
                json!({ "code": link.code }),
            ),
            other => other,
        })?;

        Ok(row.into())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<ShortLink>, AppError> {
        let row = sqlx::query_as::<_, ShortLinkRow>(
            r#"
            SELECT code, url, remaining_redirects, ttl_hours, created_at, last_visit_at
            FROM short_links
            WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(ShortLink::from))
    }

    async fn record_visit(
        &self,
        code: &str,
        visited_at: DateTime<Utc>,
    ) -> Result<Option<ShortLink>, AppError> {
        let row = sqlx::query_as::<_, ShortLinkRow>(
            r#"
            UPDATE short_links
            SET last_visit_at = GREATEST(COALESCE(last_visit_at, $2), $2),
                remaining_redirects = CASE
                    WHEN remaining_redirects >= 1 THEN remaining_redirects - 1
                    ELSE remaining_redirects
                END
            WHERE code = $1
            RETURNING code, url, remaining_redirects, ttl_hours, created_at, last_visit_at
            "#,
        )
        .bind(code)
        .bind(visited_at)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.map(ShortLink::from))
    }
}
