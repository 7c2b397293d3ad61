//! chb-ingest - Main entry point

use std::time::Duration;

use anyhow::{Context, Result};
use chb_common::logging::{init_logging, LogConfig};
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use chb_ingest::{run_bulk_load, ArchiveFetcher, Config, RowSource};

#[tokio::main]
async fn main() -> Result<()> {
    let log_config = LogConfig::from_env()
        .unwrap_or_default()
        .with_file_prefix("chb-ingest");
    init_logging(&log_config)?;

    info!("Starting Companies House bulk load");

    let config = Config::load()?;
    info!(
        workers = config.pipeline.worker_count,
        queue_capacity = config.pipeline.queue_capacity,
        "Configuration loaded"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(config.database.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.database.idle_timeout_secs))
        .connect(&config.database.url)
        .await
        .context("failed to connect to database")?;
    info!("Database connection pool established");

    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .context("failed to run migrations")?;
    info!("Database migrations completed");

    let fetcher = ArchiveFetcher::new(config.source.clone())?;
    let archive_path = fetcher.fetch().await?;
    let csv_path = fetcher.extract_csv(&archive_path)?;
    info!(csv = %csv_path.display(), "Source data ready");

    let file = std::fs::File::open(&csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let source = RowSource::new(file);

    let stats = run_bulk_load(&pool, source, &config.pipeline).await?;

    info!(
        rows_read = stats.rows_read,
        persisted = stats.persisted,
        structural_errors = stats.structural_errors,
        persistence_errors = stats.persistence_errors,
        parse_warnings = stats.parse_warnings,
        "Bulk load finished"
    );

    Ok(())
}
