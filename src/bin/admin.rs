//! CLI administration tool for the URL shortener pipeline.
//!
//! Creates and resolves short links through the same cache and event path as
//! the redirect front end, inspects usage metrics and manages the database.
//!
//! # Usage
//!
//! ```bash
//! # Create a link that works three times and for one day
//! cargo run --bin admin -- shorten https://example.com --budget 3 --ttl-hours 24
//!
//! # Resolve it (publishes a read event)
//! cargo run --bin admin -- resolve <code>
//!
//! # Show host metrics
//! cargo run --bin admin -- metrics host example.com
//!
//! # Apply migrations
//! cargo run --bin admin -- db migrate
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` (required): PostgreSQL connection string
//! - `REDIS_URL` (required by `shorten` and `resolve`): cache and event streams

use url_shortener_pipeline::application::services::{
    MetricsQueryService, RedirectCoordinator, Resolution, ShortenService,
};
use url_shortener_pipeline::config::{self, Config};
use url_shortener_pipeline::domain::entities::{HostMetric, NewShortLink, ShortLink};
use url_shortener_pipeline::infrastructure::cache::{CacheWriteQueue, run_cache_worker};
use url_shortener_pipeline::infrastructure::messaging::RedisStreamsPublisher;
use url_shortener_pipeline::infrastructure::persistence::{
    PgLinkRepository, PgMetricsRepository, connect_pool, run_migrations,
};
use url_shortener_pipeline::{server, telemetry};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// CLI tool for managing the URL shortener pipeline.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level command groups.
#[derive(Subcommand)]
enum Commands {
    /// Create a short link
    Shorten {
        /// Target URL
        url: String,

        /// Number of redirects before the link stops working
        #[arg(short, long)]
        budget: Option<u32>,

        /// Lifetime in hours
        #[arg(short, long)]
        ttl_hours: Option<u32>,

        /// Custom short code
        #[arg(short, long)]
        code: Option<String>,
    },

    /// Resolve a short code like a redirect would
    Resolve { code: String },

    /// Show the stored record of a short code
    Details { code: String },

    /// Inspect usage metrics
    Metrics {
        #[command(subcommand)]
        action: MetricsAction,
    },

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

/// Metrics subcommands.
#[derive(Subcommand)]
enum MetricsAction {
    /// Counters for one host
    Host { host: String },

    /// Counters for one target URL
    Path { url: String },

    /// Hosts matching a query, most redirected first
    Search {
        /// Substring of the host name (all hosts when omitted)
        #[arg(default_value = "")]
        query: String,

        /// Maximum number of rows (capped at 50)
        #[arg(short, long)]
        limit: Option<i64>,
    },
}

/// Database operation subcommands.
#[derive(Subcommand)]
enum DbAction {
    /// Check database connection
    Check,

    /// Apply pending migrations
    Migrate,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let config = config::load_from_env()?;
    telemetry::init("warn", &config.log_format);

    let pool = connect_pool(&config)
        .await
        .context("Failed to connect to database")?;

    match cli.command {
        Commands::Shorten {
            url,
            budget,
            ttl_hours,
            code,
        } => {
            let request = NewShortLink {
                url,
                remaining_redirects: budget,
                ttl_hours,
                custom_code: code,
            };
            handle_shorten(&config, &pool, request).await?
        }
        Commands::Resolve { code } => handle_resolve(&config, &pool, &code).await?,
        Commands::Details { code } => handle_details(&config, &pool, &code).await?,
        Commands::Metrics { action } => handle_metrics_action(action, &pool).await?,
        Commands::Db { action } => handle_db_action(action, &pool).await?,
    }

    Ok(())
}

/// Coordinator wired to Postgres, the configured cache and Redis streams.
///
/// The returned handle completes once every queued cache task is applied and
/// the coordinator has been dropped.
async fn redirect_stack(
    config: &Config,
    pool: &PgPool,
) -> Result<(
    Arc<PgLinkRepository>,
    RedirectCoordinator<PgLinkRepository>,
    JoinHandle<()>,
)> {
    let redis_url = config
        .redis_url
        .as_deref()
        .context("REDIS_URL must be set to publish lifecycle events")?;

    let links = Arc::new(PgLinkRepository::new(Arc::new(pool.clone())));
    let cache = server::connect_cache(config).await;
    let publisher = RedisStreamsPublisher::connect(redis_url, config.stream_prefix.clone())
        .await
        .context("Failed to connect to Redis")?;

    let (queue, rx) = CacheWriteQueue::new(config.cache_queue_capacity);
    let worker = tokio::spawn(run_cache_worker(rx, cache.clone()));

    let coordinator = RedirectCoordinator::new(
        links.clone(),
        cache,
        queue,
        Arc::new(publisher),
        config.cache_ttl_seconds,
    );

    Ok((links, coordinator, worker))
}

async fn handle_shorten(config: &Config, pool: &PgPool, request: NewShortLink) -> Result<()> {
    println!("{}", "🔗 Create Short Link".bright_blue().bold());
    println!();

    let (links, coordinator, worker) = redirect_stack(config, pool).await?;
    let service = ShortenService::new(links, Arc::new(coordinator));

    let result = service.shorten(request).await;
    drop(service);
    worker.await.ok();

    let link = result.map_err(|e| anyhow::anyhow!("Failed to create link: {}", e))?;

    println!("{}", "✅ Link created".green().bold());
    println!();
    print_link(&link);

    Ok(())
}

async fn handle_resolve(config: &Config, pool: &PgPool, code: &str) -> Result<()> {
    let (_, coordinator, worker) = redirect_stack(config, pool).await?;

    let resolution = coordinator.resolve(code).await;
    drop(coordinator);
    worker.await.ok();

    match resolution {
        Resolution::Resolved { url, from_cache } => {
            let source = if from_cache { "cache" } else { "store" };
            println!(
                "{} {} {}",
                "➡️ ".green(),
                url.bright_white().bold(),
                format!("({})", source).bright_black()
            );
        }
        Resolution::NotFound => println!("{}", "❌ Not found".red()),
        Resolution::Exhausted => {
            println!("{}", "❌ Not found (budget used up or expired)".red())
        }
    }

    Ok(())
}

async fn handle_details(config: &Config, pool: &PgPool, code: &str) -> Result<()> {
    let (_, coordinator, worker) = redirect_stack(config, pool).await?;

    let result = coordinator.details(code).await;
    drop(coordinator);
    worker.await.ok();

    let link = result.map_err(|e| anyhow::anyhow!("{}", e))?;
    print_link(&link);

    Ok(())
}

fn print_link(link: &ShortLink) {
    let budget = link
        .remaining_redirects
        .map_or_else(|| "unlimited".to_string(), |b| b.to_string());
    let expires = link
        .expires_at()
        .map_or_else(|| "never".to_string(), |t| t.format("%Y-%m-%d %H:%M").to_string());
    let last_visit = link
        .last_visit_at
        .map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M:%S").to_string());
    let status = if link.is_active_at(chrono::Utc::now()) {
        "ACTIVE".green()
    } else {
        "INACTIVE".red()
    };

    println!("  Code:       {}", link.code.bright_yellow().bold());
    println!("  URL:        {}", link.url.cyan());
    println!("  Budget:     {}", budget.bright_white());
    println!("  Expires:    {}", expires.bright_black());
    println!("  Last visit: {}", last_visit.bright_black());
    println!("  Status:     {}", status);
    println!();
}

/// Dispatches metrics commands.
async fn handle_metrics_action(action: MetricsAction, pool: &PgPool) -> Result<()> {
    let service = MetricsQueryService::new(Arc::new(PgMetricsRepository::new(Arc::new(
        pool.clone(),
    ))));

    match action {
        MetricsAction::Host { host } => {
            let metric = service
                .host(&host)
                .await
                .map_err(|e| anyhow::anyhow!("{}", e))?;

            println!("{}", "📊 Host Metrics".bright_blue().bold());
            println!();
            println!("  Host:      {}", metric.host.cyan());
            println!(
                "  Redirects: {}",
                metric.redirect_count.to_string().bright_green().bold()
            );
            println!(
                "  Created:   {}",
                metric.creation_count.to_string().bright_green().bold()
            );
            println!(
                "  Paths:     {}",
                metric.path_ids.len().to_string().bright_white()
            );
            println!();
        }
        MetricsAction::Path { url } => {
            let metric = service
                .path(&url)
                .await
                .map_err(|e| anyhow::anyhow!("{}", e))?;

            println!("{}", "📊 Path Metrics".bright_blue().bold());
            println!();
            println!("  URL:       {}", metric.url.cyan());
            println!(
                "  Redirects: {}",
                metric.redirect_count.to_string().bright_green().bold()
            );
            println!(
                "  Created:   {}",
                metric.creation_count.to_string().bright_green().bold()
            );
            println!();
        }
        MetricsAction::Search { query, limit } => {
            let hosts = service
                .search_hosts(&query, limit)
                .await
                .map_err(|e| anyhow::anyhow!("{}", e))?;
            print_hosts(&hosts);
        }
    }

    Ok(())
}

fn print_hosts(hosts: &[HostMetric]) {
    println!("{}", "📋 Hosts".bright_blue().bold());
    println!();

    if hosts.is_empty() {
        println!("{}", "  No hosts found".yellow());
        return;
    }

    println!(
        "  {:<40} {:>10} {:>10} {:>6}",
        "Host".bright_white().bold(),
        "Redirects".bright_white().bold(),
        "Created".bright_white().bold(),
        "Paths".bright_white().bold()
    );
    println!("  {}", "─".repeat(70).bright_black());

    for host in hosts {
        println!(
            "  {:<40} {:>10} {:>10} {:>6}",
            host.host.cyan(),
            host.redirect_count,
            host.creation_count,
            host.path_ids.len()
        );
    }

    println!();
    println!("  Total: {}", hosts.len().to_string().bright_white().bold());
    println!();
}

/// Handles database commands.
async fn handle_db_action(action: DbAction, pool: &PgPool) -> Result<()> {
    match action {
        DbAction::Check => {
            println!("{}", "🔍 Checking database connection...".bright_blue());

            sqlx::query("SELECT 1").fetch_one(pool).await?;

            println!("{}", "✅ Database connection OK".green().bold());
        }
        DbAction::Migrate => {
            println!("{}", "🛠️  Applying migrations...".bright_blue());

            run_migrations(pool)
                .await
                .context("Failed to apply migrations")?;

            println!("{}", "✅ Migrations applied".green().bold());
        }
    }

    Ok(())
}
