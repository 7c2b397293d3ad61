//! Concurrent ingestion pipeline
//!
//! One blocking producer reads the row source into a bounded queue; a fixed
//! pool of workers maps rows into aggregates; a single writer task feeds the
//! sink. The queue bound is the flow control: when persistence falls behind,
//! the producer blocks.
//!
//! Failure policy: anything row-local (structural, field parse, persistence)
//! is logged, tallied, and skipped. Only a panic in one of the stages aborts
//! the run, in which case the sink is dropped without commit and the
//! transaction rolls back.

use std::io::Read;
use std::sync::Arc;

use csv::StringRecord;
use sqlx::PgPool;
use tokio::sync::{mpsc, Mutex};
use tokio::task;
use tracing::{error, info, warn};

use crate::config::PipelineConfig;
use crate::error::{IngestError, Result};
use crate::mapper::{map_row, MappedRow};
use crate::source::RowSource;
use crate::storage::{AggregateSink, PgCompanySink};

/// Row interval between producer progress messages.
const PROGRESS_INTERVAL: u64 = 10_000;

/// Counters for one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Data rows pulled from the source (header excluded).
    pub rows_read: u64,
    /// Rows successfully mapped to an aggregate.
    pub mapped: u64,
    /// Rows skipped for a wrong column count.
    pub structural_errors: u64,
    /// Fields that fell back to unset because they would not parse.
    pub parse_warnings: u64,
    /// Aggregates written by the sink.
    pub persisted: u64,
    /// Aggregates the sink rejected (e.g. duplicate key).
    pub persistence_errors: u64,
}

impl RunStats {
    /// Fraction of rows that were skipped rather than persisted.
    ///
    /// Parse warnings are excluded: a warned row was still loaded.
    pub fn failure_rate(&self) -> f64 {
        if self.rows_read == 0 {
            return 0.0;
        }
        (self.structural_errors + self.persistence_errors) as f64 / self.rows_read as f64
    }
}

/// A finished pipeline run: the sink (still holding its uncommitted
/// transaction) plus the run counters.
pub struct PipelineRun<S> {
    pub sink: S,
    pub stats: RunStats,
}

#[derive(Debug, Default, Clone, Copy)]
struct WorkerTally {
    mapped: u64,
    structural: u64,
    warnings: u64,
}

/// The bounded producer/consumer pipeline.
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Drain `source` through the worker pool into `sink`.
    ///
    /// Returns the sink so the caller can decide the transaction's fate;
    /// commit/rollback is not this function's business. `Err` means a stage
    /// panicked; the sink is gone and its transaction rolls back on drop.
    pub async fn run<R, S>(&self, source: RowSource<R>, sink: S) -> Result<PipelineRun<S>>
    where
        R: Read + Send + 'static,
        S: AggregateSink + Send + 'static,
    {
        let (row_tx, row_rx) = mpsc::channel::<StringRecord>(self.config.queue_capacity);
        let row_rx = Arc::new(Mutex::new(row_rx));
        let (agg_tx, mut agg_rx) = mpsc::channel::<MappedRow>(self.config.queue_capacity);

        // Producer: the sole reader of the source, on the blocking pool.
        // blocking_send provides the backpressure when the queue fills.
        let producer = task::spawn_blocking(move || {
            let mut rows_read = 0u64;
            for record in source {
                if row_tx.blocking_send(record).is_err() {
                    // Queue closed underneath us: every consumer is gone.
                    break;
                }
                rows_read += 1;
                if rows_read % PROGRESS_INTERVAL == 0 {
                    info!(rows = rows_read, "rows queued");
                }
            }
            rows_read
        });

        let mut workers = Vec::with_capacity(self.config.worker_count);
        for worker in 0..self.config.worker_count {
            let row_rx = Arc::clone(&row_rx);
            let agg_tx = agg_tx.clone();
            workers.push(tokio::spawn(async move {
                let mut tally = WorkerTally::default();
                loop {
                    // Hold the lock only for the dequeue, not the mapping.
                    let record = { row_rx.lock().await.recv().await };
                    let Some(record) = record else { break };

                    match map_row(&record) {
                        Ok(mapped) => {
                            tally.warnings += mapped.warnings.len() as u64;
                            for warning in &mapped.warnings {
                                warn!(
                                    worker,
                                    company_number = %mapped.company.company_number,
                                    field = warning.field,
                                    value = %warning.value,
                                    "unparsable field stored as unset"
                                );
                            }
                            if agg_tx.send(mapped).await.is_err() {
                                // Writer is gone; nothing left to do.
                                break;
                            }
                            tally.mapped += 1;
                        },
                        Err(err) => {
                            tally.structural += 1;
                            warn!(worker, error = %err, "skipping malformed row");
                        },
                    }
                }
                tally
            }));
        }
        // Writer must observe closure once the workers finish.
        drop(agg_tx);

        // Writer: sole owner of the sink, so the shared transaction is
        // never touched concurrently.
        let writer = tokio::spawn(async move {
            let mut sink = sink;
            let mut persisted = 0u64;
            let mut failed = 0u64;
            while let Some(mapped) = agg_rx.recv().await {
                match sink.persist(&mapped.company).await {
                    Ok(()) => persisted += 1,
                    Err(err) => {
                        failed += 1;
                        warn!(
                            company_number = %mapped.company.company_number,
                            error = %err,
                            "failed to persist aggregate, skipping"
                        );
                    },
                }
            }
            (sink, persisted, failed)
        });

        let rows_read = producer
            .await
            .map_err(|err| IngestError::Fatal(format!("row producer panicked: {err}")))?;
        let mut stats = RunStats {
            rows_read,
            ..RunStats::default()
        };

        // Completion barrier: every worker must report before the writer's
        // channel can be considered closed.
        for handle in workers {
            let tally = handle
                .await
                .map_err(|err| IngestError::Fatal(format!("worker panicked: {err}")))?;
            stats.mapped += tally.mapped;
            stats.structural_errors += tally.structural;
            stats.parse_warnings += tally.warnings;
        }

        let (sink, persisted, failed) = writer
            .await
            .map_err(|err| IngestError::Fatal(format!("writer panicked: {err}")))?;
        stats.persisted = persisted;
        stats.persistence_errors = failed;

        Ok(PipelineRun { sink, stats })
    }
}

/// Run a full bulk load against Postgres.
///
/// Opens the run-wide transaction, drains the source through the pipeline,
/// then decides the run's fate exactly once: roll back when the skipped-row
/// rate exceeds the configured ceiling, commit otherwise.
pub async fn run_bulk_load<R>(
    pool: &PgPool,
    source: RowSource<R>,
    config: &PipelineConfig,
) -> Result<RunStats>
where
    R: Read + Send + 'static,
{
    config.validate()?;

    let sink = PgCompanySink::begin(pool).await?;
    let pipeline = Pipeline::new(config.clone());
    let PipelineRun { sink, stats } = pipeline.run(source, sink).await?;

    if let Some(max_rate) = config.max_failure_rate {
        let rate = stats.failure_rate();
        if rate > max_rate {
            error!(
                failure_rate = rate,
                max_failure_rate = max_rate,
                structural_errors = stats.structural_errors,
                persistence_errors = stats.persistence_errors,
                "failure rate over threshold, rolling back the run"
            );
            sink.rollback().await?;
            return Err(IngestError::Fatal(format!(
                "failure rate {rate:.4} exceeded configured maximum {max_rate:.4}; run rolled back"
            )));
        }
    }

    sink.commit().await?;

    info!(
        rows_read = stats.rows_read,
        persisted = stats.persisted,
        structural_errors = stats.structural_errors,
        persistence_errors = stats.persistence_errors,
        parse_warnings = stats.parse_warnings,
        "bulk load committed"
    );

    Ok(stats)
}
