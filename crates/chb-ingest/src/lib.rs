//! Companies House bulk loader
//!
//! Ingests the "Basic Company Data" bulk export (one large positional CSV)
//! into a normalized PostgreSQL store.
//!
//! # Architecture
//!
//! - **fetch**: cached HTTP download of the published ZIP and extraction of
//!   its CSV entry
//! - **source**: lazy row iterator over the decoded CSV (header skipped,
//!   unreadable rows logged and skipped)
//! - **layout** / **mapper**: the positional column contract and the pure
//!   row → [`models::Company`] transformation
//! - **pipeline**: bounded queue, fixed worker pool, single writer task,
//!   and the run-level commit/rollback decision
//! - **storage**: the [`storage::AggregateSink`] seam and the Postgres sink
//!   holding the run-wide transaction
//!
//! Per-row problems (wrong column count, unparsable fields, duplicate keys)
//! are logged and skipped; the run still commits. Only a fault outside the
//! row paths rolls the whole run back.

pub mod config;
pub mod error;
pub mod fetch;
pub mod layout;
pub mod mapper;
pub mod models;
pub mod pipeline;
pub mod source;
pub mod storage;

pub use config::{Config, DatabaseConfig, PipelineConfig, SourceConfig};
pub use error::{IngestError, Result};
pub use fetch::ArchiveFetcher;
pub use mapper::{map_row, FieldWarning, MappedRow};
pub use models::{Address, Company, PreviousName, SicCodes};
pub use pipeline::{run_bulk_load, Pipeline, PipelineRun, RunStats};
pub use source::RowSource;
pub use storage::{AggregateSink, PgCompanySink};
