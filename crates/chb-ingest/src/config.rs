//! Configuration management

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{IngestError, Result};

// ============================================================================
// Configuration Constants
// ============================================================================

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/chb";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Default minimum database connections in the pool.
pub const DEFAULT_DATABASE_MIN_CONNECTIONS: u32 = 2;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default database idle timeout in seconds (10 minutes).
pub const DEFAULT_DATABASE_IDLE_TIMEOUT_SECS: u64 = 600;

/// Default bulk archive URL.
pub const DEFAULT_ARCHIVE_URL: &str =
    "http://download.companieshouse.gov.uk/BasicCompanyDataAsOneFile-2023-09-01.zip";

/// Default directory for the downloaded archive and extracted CSV.
pub const DEFAULT_CACHE_DIR: &str = "./cache";

/// Default download timeout in seconds (the archive is several hundred MB).
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 1800;

/// Default download retry count.
pub const DEFAULT_DOWNLOAD_RETRIES: u32 = 3;

/// Default number of pipeline workers.
pub const DEFAULT_WORKER_COUNT: usize = 4;

/// Default bounded queue capacity between the row source and the workers.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Loader configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub source: SourceConfig,
    pub pipeline: PipelineConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

/// Bulk archive source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// HTTP URL of the published ZIP archive.
    pub archive_url: String,
    /// Directory holding the downloaded archive and the extracted CSV.
    pub cache_dir: PathBuf,
    /// Download timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum download attempts.
    pub max_retries: u32,
}

/// Pipeline tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of parallel mapping workers.
    pub worker_count: usize,
    /// Capacity of the bounded row queue; a full queue blocks the producer.
    pub queue_capacity: usize,
    /// Abort (roll back) when the fraction of skipped rows exceeds this.
    /// `None` commits whatever succeeded, however many rows were skipped.
    pub max_failure_rate: Option<f64>,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
                max_connections: env_parsed("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or(DEFAULT_DATABASE_MAX_CONNECTIONS),
                min_connections: env_parsed("DATABASE_MIN_CONNECTIONS")
                    .unwrap_or(DEFAULT_DATABASE_MIN_CONNECTIONS),
                connect_timeout_secs: env_parsed("DATABASE_CONNECT_TIMEOUT")
                    .unwrap_or(DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS),
                idle_timeout_secs: env_parsed("DATABASE_IDLE_TIMEOUT")
                    .unwrap_or(DEFAULT_DATABASE_IDLE_TIMEOUT_SECS),
            },
            source: SourceConfig {
                archive_url: std::env::var("CHB_ARCHIVE_URL")
                    .unwrap_or_else(|_| DEFAULT_ARCHIVE_URL.to_string()),
                cache_dir: std::env::var("CHB_CACHE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from(DEFAULT_CACHE_DIR)),
                timeout_secs: env_parsed("CHB_DOWNLOAD_TIMEOUT")
                    .unwrap_or(DEFAULT_DOWNLOAD_TIMEOUT_SECS),
                max_retries: env_parsed("CHB_DOWNLOAD_RETRIES")
                    .unwrap_or(DEFAULT_DOWNLOAD_RETRIES),
            },
            pipeline: PipelineConfig {
                worker_count: env_parsed("CHB_WORKER_COUNT").unwrap_or(DEFAULT_WORKER_COUNT),
                queue_capacity: env_parsed("CHB_QUEUE_CAPACITY")
                    .unwrap_or(DEFAULT_QUEUE_CAPACITY),
                max_failure_rate: env_parsed("CHB_MAX_FAILURE_RATE"),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.database.url.is_empty() {
            return Err(IngestError::Config("database URL cannot be empty".into()));
        }
        if self.database.max_connections == 0 {
            return Err(IngestError::Config(
                "database max_connections must be greater than 0".into(),
            ));
        }
        if self.database.min_connections > self.database.max_connections {
            return Err(IngestError::Config(format!(
                "database min_connections ({}) cannot be greater than max_connections ({})",
                self.database.min_connections, self.database.max_connections
            )));
        }
        if self.source.archive_url.is_empty() {
            return Err(IngestError::Config("archive URL cannot be empty".into()));
        }
        if self.source.max_retries == 0 {
            return Err(IngestError::Config(
                "download max_retries must be greater than 0".into(),
            ));
        }
        self.pipeline.validate()
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.worker_count == 0 {
            return Err(IngestError::Config(
                "worker_count must be greater than 0".into(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(IngestError::Config(
                "queue_capacity must be greater than 0".into(),
            ));
        }
        if let Some(rate) = self.max_failure_rate {
            if !(0.0..=1.0).contains(&rate) {
                return Err(IngestError::Config(format!(
                    "max_failure_rate must be within 0..=1, got {}",
                    rate
                )));
            }
        }
        Ok(())
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|value| value.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                min_connections: DEFAULT_DATABASE_MIN_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                idle_timeout_secs: DEFAULT_DATABASE_IDLE_TIMEOUT_SECS,
            },
            source: SourceConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            archive_url: DEFAULT_ARCHIVE_URL.to_string(),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            timeout_secs: DEFAULT_DOWNLOAD_TIMEOUT_SECS,
            max_retries: DEFAULT_DOWNLOAD_RETRIES,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_failure_rate: None,
        }
    }
}
