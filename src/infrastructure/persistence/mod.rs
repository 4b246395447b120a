//! Repository implementations.
//!
//! PostgreSQL repositories use SQLx with runtime-checked queries; the
//! in-memory ones back tests and single-process embedding.
//!
//! # Repositories
//!
//! - [`PgLinkRepository`] - Durable short link records
//! - [`PgMetricsRepository`] - Path and host counters
//! - [`InMemoryLinkRepository`] - Link records in a local map
//! - [`InMemoryMetricsRepository`] - Counters in local maps

pub mod memory_link_repository;
pub mod memory_metrics_repository;
pub mod pg_link_repository;
pub mod pg_metrics_repository;

pub use memory_link_repository::InMemoryLinkRepository;
pub use memory_metrics_repository::InMemoryMetricsRepository;
pub use pg_link_repository::PgLinkRepository;
pub use pg_metrics_repository::PgMetricsRepository;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

use crate::config::Config;

/// Opens a connection pool sized by the `DB_*` settings.
pub async fn connect_pool(config: &Config) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime))
        .connect(&config.database_url)
        .await?;

    tracing::info!("Connected to database");
    Ok(pool)
}

/// Applies the bundled SQL migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
