// src/sync/backfill.rs
//! Bounded historical load, distinct from the live pass. Runs rarely (daily
//! tier or operator-triggered): a year of sentiment readings through the
//! upsert path, plus a year of watchlist price history sampled down to
//! weekly points before becoming chunks. One range request per asset per
//! invocation, no re-fetching on chunk boundaries.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::fetch::Fetcher;
use crate::sources::COINGECKO;
use crate::store::PersistenceSink;
use crate::sync::collectors::sentiment::FearGreedCollector;
use crate::sync::collectors::with_api_key;
use crate::sync::types::{ChunkType, DataChunk, NormalizedEntity};

const HISTORY_DAYS: u32 = 365;
/// Every 7th daily point → ~52 chunks/year/asset regardless of source
/// granularity.
const SAMPLE_STRIDE: usize = 7;
const PER_ASSET_DELAY: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, PartialEq)]
pub struct PricePoint {
    pub date: DateTime<Utc>,
    pub price: f64,
}

// Timestamps arrive as float millis now and then, so both slots are f64.
#[derive(Debug, Deserialize)]
struct RawChart {
    prices: Vec<(f64, f64)>,
}

pub struct BackfillEngine {
    fetcher: Arc<Fetcher>,
    sink: PersistenceSink,
    watchlist: Vec<String>,
    api_key: Option<String>,
    per_asset_delay: Duration,
}

impl BackfillEngine {
    pub fn new(
        fetcher: Arc<Fetcher>,
        sink: PersistenceSink,
        watchlist: Vec<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            fetcher,
            sink,
            watchlist,
            api_key,
            per_asset_delay: PER_ASSET_DELAY,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.per_asset_delay = delay;
        self
    }

    /// Failures are isolated exactly like the orchestrator isolates
    /// collectors: logged and skipped, never fatal for the rest of the run.
    pub async fn backfill(&self) {
        match self.backfill_sentiment().await {
            Ok(n) => tracing::info!(readings = n, "sentiment history backfilled"),
            Err(e) => tracing::warn!(error = format!("{e:#}").as_str(), "sentiment backfill failed"),
        }

        for (i, asset) in self.watchlist.iter().enumerate() {
            if i > 0 {
                // The historical endpoint has its own budget, independent of
                // the live-snapshot endpoint on the same provider.
                tokio::time::sleep(self.per_asset_delay).await;
            }
            match self.backfill_asset(asset).await {
                Ok(chunks) => tracing::info!(asset = %asset, chunks, "asset history backfilled"),
                Err(e) => {
                    tracing::warn!(asset = %asset, error = format!("{e:#}").as_str(), "asset backfill failed, skipping")
                }
            }
        }
    }

    async fn backfill_sentiment(&self) -> Result<usize> {
        let collector = FearGreedCollector::new(self.fetcher.clone());
        let readings = collector.fetch_readings(HISTORY_DAYS).await?;
        let entities: Vec<_> = readings
            .into_iter()
            .map(NormalizedEntity::FearGreed)
            .collect();
        self.sink
            .upsert(&entities)
            .await
            .context("upserting sentiment history")?;
        Ok(entities.len())
    }

    async fn backfill_asset(&self, asset: &str) -> Result<usize> {
        let points = self.fetch_price_history(asset).await?;
        let chunks = sample_price_chunks(asset, &points, SAMPLE_STRIDE);
        self.sink
            .index_chunks(&chunks)
            .await
            .with_context(|| format!("indexing history chunks for {asset}"))?;
        Ok(chunks.len())
    }

    async fn fetch_price_history(&self, asset: &str) -> Result<Vec<PricePoint>> {
        let url = with_api_key(
            format!(
                "{}/coins/{}/market_chart?vs_currency=usd&days={}&interval=daily",
                COINGECKO.base_url, asset, HISTORY_DAYS
            ),
            &self.api_key,
        );
        let v = self.fetcher.get_json(&url).await?;
        parse_price_history(&v)
    }
}

pub(crate) fn parse_price_history(value: &serde_json::Value) -> Result<Vec<PricePoint>> {
    let raw: RawChart = serde_json::from_value(value.clone()).context("parsing market_chart")?;
    let mut out = Vec::with_capacity(raw.prices.len());
    for (ts_ms, price) in raw.prices {
        let date = DateTime::<Utc>::from_timestamp_millis(ts_ms as i64)
            .with_context(|| format!("out-of-range chart timestamp {ts_ms}"))?;
        out.push(PricePoint { date, price });
    }
    Ok(out)
}

/// `ceil(n / stride)` chunks for n daily points.
pub fn sample_price_chunks(asset: &str, points: &[PricePoint], stride: usize) -> Vec<DataChunk> {
    points
        .iter()
        .step_by(stride.max(1))
        .map(|p| DataChunk {
            content: format!(
                "{} price on {}: ${:.2}",
                asset,
                p.date.format("%Y-%m-%d"),
                p.price
            ),
            content_type: ChunkType::PriceHistory,
            category_path: format!("history/{asset}"),
            coin_symbol: Some(asset.to_uppercase()),
            source: "coingecko".into(),
            data_date: p.date,
        })
        .collect()
}
