// src/sync/mod.rs
pub mod backfill;
pub mod collectors;
pub mod scheduler;
pub mod types;

use std::time::Duration;

use anyhow::Context;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;

use crate::store::PersistenceSink;
use crate::sync::types::{Collector, SyncResult};

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("sync_passes_total", "Completed orchestrator passes.");
        describe_counter!("sync_records_total", "Entities upserted across all sources.");
        describe_counter!("sync_source_errors_total", "Collector failures, isolated per pass.");
        describe_histogram!("sync_collector_ms", "Per-collector wall time in milliseconds.");
        describe_gauge!("sync_last_pass_ts", "Unix ts when the last pass finished.");
    });
}

/// Breather between collectors that hit upstream APIs sharing a per-minute
/// budget. Passes stay strictly sequential.
const INTER_COLLECTOR_DELAY: Duration = Duration::from_millis(1500);

pub struct SyncOrchestrator {
    collectors: Vec<Box<dyn Collector>>,
    sink: PersistenceSink,
    inter_collector_delay: Duration,
}

impl SyncOrchestrator {
    pub fn new(collectors: Vec<Box<dyn Collector>>, sink: PersistenceSink) -> Self {
        Self {
            collectors,
            sink,
            inter_collector_delay: INTER_COLLECTOR_DELAY,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.inter_collector_delay = delay;
        self
    }

    /// One pass: every collector in fixed order, failures isolated per
    /// collector. The pass is complete regardless of per-source outcomes.
    pub async fn run_pass(&self) -> Vec<SyncResult> {
        ensure_metrics_described();
        let mut results = Vec::with_capacity(self.collectors.len());

        for (i, collector) in self.collectors.iter().enumerate() {
            let name = collector.name();
            let started = tokio::time::Instant::now();

            let result = match self.run_collector(collector.as_ref()).await {
                Ok(records) => {
                    counter!("sync_records_total").increment(records as u64);
                    SyncResult {
                        source: name.to_string(),
                        success: true,
                        records_processed: records,
                        error: None,
                        duration_ms: started.elapsed().as_millis() as u64,
                    }
                }
                Err(e) => {
                    counter!("sync_source_errors_total").increment(1);
                    let message = format!("{e:#}");
                    tracing::warn!(source = name, error = %message, "collector failed");
                    SyncResult {
                        source: name.to_string(),
                        success: false,
                        records_processed: 0,
                        error: Some(message),
                        duration_ms: started.elapsed().as_millis() as u64,
                    }
                }
            };

            histogram!("sync_collector_ms").record(result.duration_ms as f64);
            results.push(result);

            if i + 1 < self.collectors.len() && !self.inter_collector_delay.is_zero() {
                tokio::time::sleep(self.inter_collector_delay).await;
            }
        }

        let summary = summarize(&results);
        counter!("sync_passes_total").increment(1);
        gauge!("sync_last_pass_ts").set(chrono::Utc::now().timestamp() as f64);
        tracing::info!(
            succeeded = summary.succeeded,
            total = summary.total,
            records = summary.records,
            duration_ms = summary.duration_ms,
            "sync pass complete"
        );

        results
    }

    async fn run_collector(&self, collector: &dyn Collector) -> anyhow::Result<usize> {
        let entities = collector.run().await?;
        self.sink
            .upsert(&entities)
            .await
            .context("upserting collector batch")?;

        // Independent call: an index failure cannot roll the upsert back.
        let chunks: Vec<_> = entities.iter().filter_map(|e| e.to_chunk()).collect();
        if let Err(e) = self.sink.index_chunks(&chunks).await {
            tracing::warn!(
                source = collector.name(),
                error = %e,
                "chunk indexing failed, upsert already durable"
            );
        }

        Ok(entities.len())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassSummary {
    pub succeeded: usize,
    pub total: usize,
    pub records: usize,
    pub duration_ms: u64,
}

pub fn summarize(results: &[SyncResult]) -> PassSummary {
    PassSummary {
        succeeded: results.iter().filter(|r| r.success).count(),
        total: results.len(),
        records: results.iter().map(|r| r.records_processed).sum(),
        duration_ms: results.iter().map(|r| r.duration_ms).sum(),
    }
}
