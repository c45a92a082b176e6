// src/sync/collectors/onchain.rs
//! Bitcoin network summary from blockchain.info `/stats`. The free tier
//! omits fields now and then; anything absent stays `None`.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::fetch::Fetcher;
use crate::sources::{SourceConfig, BLOCKCHAIN_INFO};
use crate::sync::types::{Collector, NormalizedEntity, OnChainSummary};

const SATS_PER_BTC: f64 = 100_000_000.0;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawStats {
    n_tx: Option<u64>,
    hash_rate: Option<f64>,
    /// Satoshis, despite the field name.
    total_fees_btc: Option<u64>,
    minutes_between_blocks: Option<f64>,
}

pub struct OnChainCollector {
    fetcher: Arc<Fetcher>,
    source: &'static SourceConfig,
}

impl OnChainCollector {
    pub fn new(fetcher: Arc<Fetcher>) -> Self {
        Self {
            fetcher,
            source: &BLOCKCHAIN_INFO,
        }
    }
}

pub(crate) fn parse_stats(
    value: &serde_json::Value,
    fetched_at: DateTime<Utc>,
) -> Result<OnChainSummary> {
    let raw: RawStats = serde_json::from_value(value.clone()).context("parsing /stats")?;
    Ok(OnChainSummary {
        network: "bitcoin".into(),
        tx_count_24h: raw.n_tx,
        hash_rate: raw.hash_rate,
        total_fees_btc: raw.total_fees_btc.map(|sats| sats as f64 / SATS_PER_BTC),
        minutes_between_blocks: raw.minutes_between_blocks,
        fetched_at,
    })
}

#[async_trait]
impl Collector for OnChainCollector {
    fn name(&self) -> &'static str {
        "onchain_summary"
    }

    async fn run(&self) -> Result<Vec<NormalizedEntity>> {
        let url = format!("{}/stats?format=json", self.source.base_url);
        let v = self.fetcher.get_json(&url).await?;
        Ok(vec![NormalizedEntity::OnChain(parse_stats(&v, Utc::now())?)])
    }
}
