// src/pipeline/batch.rs
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::task::JoinSet;

use crate::edgar::client::FilingRetriever;
use crate::pipeline::ticker::{TickerOutcome, TickerProcessor};
use crate::storage::{StatusTable, StorageManager, TickerStatus};
use crate::utils::error::AppError;
use crate::utils::memory;

/// Batch sizing and throttling.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub batch_size: usize,
    pub jitter_min: Duration,
    pub jitter_max: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            jitter_min: Duration::from_secs(1),
            jitter_max: Duration::from_secs(2),
        }
    }
}

impl BatchConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.batch_size == 0 {
            return Err(AppError::Config("batch size must be at least 1".to_string()));
        }
        if self.jitter_min > self.jitter_max {
            return Err(AppError::Config(format!(
                "jitter minimum {:?} exceeds maximum {:?}",
                self.jitter_min, self.jitter_max
            )));
        }
        Ok(())
    }

    /// Uniform in `[jitter_min, jitter_max]`.
    fn jitter(&self) -> Duration {
        let min = self.jitter_min.as_millis() as u64;
        let max = self.jitter_max.as_millis() as u64;
        if max <= min {
            return self.jitter_min;
        }
        Duration::from_millis(rand::rng().random_range(min..=max))
    }
}

/// Counts for one run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub pending: usize,
    pub batches: usize,
    pub succeeded: usize,
    pub empty: usize,
    pub failed: usize,
}

/// Drives the whole run over the status table, one batch at a time.
pub struct BatchOrchestrator {
    config: BatchConfig,
    retriever: Arc<dyn FilingRetriever>,
    processor: Arc<TickerProcessor>,
    storage: StorageManager,
}

impl BatchOrchestrator {
    pub fn new(
        config: BatchConfig,
        retriever: Arc<dyn FilingRetriever>,
        processor: Arc<TickerProcessor>,
        storage: StorageManager,
    ) -> Self {
        Self {
            config,
            retriever,
            processor,
            storage,
        }
    }

    /// Processes every unprocessed ticker. The status table is saved after each
    /// batch and again at the end; only the final save can fail the run.
    pub async fn run(&self, status: &mut StatusTable) -> Result<RunSummary, AppError> {
        self.config.validate()?;

        let pending = status.pending();
        let total = pending.len();
        let mut summary = RunSummary {
            pending: total,
            ..RunSummary::default()
        };
        if total == 0 {
            tracing::info!("All tickers already processed, nothing to do.");
            return Ok(summary);
        }

        tracing::info!(
            "Starting the processing of {} tickers in batches of {}.",
            total,
            self.config.batch_size
        );

        let mut attempted = 0;
        for (index, batch) in pending.chunks(self.config.batch_size).enumerate() {
            memory::log_memory_usage();

            let pause = self.config.jitter();
            tracing::debug!("Sleeping {:?} before batch {}", pause, index + 1);
            tokio::time::sleep(pause).await;

            let ciks: Vec<String> = batch.iter().map(|row| row.cik.clone()).collect();
            if let Err(e) = self.retriever.download_filings_for_batch(&ciks).await {
                tracing::warn!("Bulk retrieval for batch {} failed, continuing: {}", index + 1, e);
            }

            self.run_batch(batch, status, &mut summary).await;
            if let Err(e) = self.retriever.release_batch().await {
                tracing::warn!("Could not release prefetch of batch {}: {}", index + 1, e);
            }
            summary.batches += 1;
            attempted += batch.len();

            let processed_percentage = attempted as f64 / total as f64 * 100.0;
            tracing::info!(
                "Completed {:.2}% (Processed {} of {} tickers)",
                processed_percentage,
                attempted,
                total
            );

            if let Err(e) = status.save() {
                tracing::error!("Failed to save status table after batch {}: {}", index + 1, e);
            }
        }

        memory::log_memory_usage();
        status.save()?;

        tracing::info!(
            "All ticker data processed and exported. Succeeded: {}, empty: {}, failed: {}",
            summary.succeeded,
            summary.empty,
            summary.failed
        );
        Ok(summary)
    }

    /// One task per ticker; results are handled as tasks finish and the batch
    /// returns only once every task has settled.
    async fn run_batch(
        &self,
        batch: &[TickerStatus],
        status: &mut StatusTable,
        summary: &mut RunSummary,
    ) {
        let mut tasks = JoinSet::new();
        for row in batch {
            let processor = Arc::clone(&self.processor);
            let row = row.clone();
            tasks.spawn(async move { processor.process(row).await });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => self.handle_outcome(outcome, status, summary),
                Err(e) => {
                    tracing::error!("Ticker task did not complete: {}", e);
                    summary.failed += 1;
                }
            }
        }
    }

    fn handle_outcome(
        &self,
        outcome: TickerOutcome,
        status: &mut StatusTable,
        summary: &mut RunSummary,
    ) {
        let TickerOutcome { ticker, cik, table } = outcome;
        let Some(records) = table.filter(|records| !records.is_empty()) else {
            tracing::warn!(
                "No filings produced for {} (CIK {}); left for the next run",
                ticker,
                cik
            );
            summary.empty += 1;
            return;
        };

        match self.storage.save_ticker_table(&ticker, &records) {
            Ok(_) => {
                status.mark_processed(&ticker);
                summary.succeeded += 1;
                tracing::info!("Processed ticker: {}", ticker);
            }
            Err(e) => {
                tracing::error!("Failed to save output for {}: {}", ticker, e);
                summary.failed += 1;
            }
        }
    }
}
