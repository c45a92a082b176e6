// src/sync/collectors/global.rs
//! Market-wide aggregate from CoinGecko `/global`. One singleton row,
//! overwritten every pass.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::fetch::Fetcher;
use crate::sources::{SourceConfig, COINGECKO};
use crate::sync::collectors::with_api_key;
use crate::sync::types::{Collector, GlobalAggregate, NormalizedEntity};

#[derive(Debug, Deserialize)]
struct RawGlobal {
    data: RawGlobalData,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RawGlobalData {
    total_market_cap: HashMap<String, f64>,
    total_volume: HashMap<String, f64>,
    market_cap_percentage: HashMap<String, f64>,
    active_cryptocurrencies: Option<u64>,
    markets: Option<u64>,
}

pub struct GlobalAggregateCollector {
    fetcher: Arc<Fetcher>,
    source: &'static SourceConfig,
    api_key: Option<String>,
}

impl GlobalAggregateCollector {
    pub fn new(fetcher: Arc<Fetcher>, api_key: Option<String>) -> Self {
        Self {
            fetcher,
            source: &COINGECKO,
            api_key,
        }
    }
}

pub(crate) fn parse_global(
    value: &serde_json::Value,
    fetched_at: DateTime<Utc>,
) -> Result<GlobalAggregate> {
    let raw: RawGlobal = serde_json::from_value(value.clone()).context("parsing /global")?;
    Ok(GlobalAggregate {
        id: "global".into(),
        total_market_cap_usd: raw.data.total_market_cap.get("usd").copied(),
        total_volume_24h_usd: raw.data.total_volume.get("usd").copied(),
        btc_dominance_pct: raw.data.market_cap_percentage.get("btc").copied(),
        active_cryptocurrencies: raw.data.active_cryptocurrencies,
        markets: raw.data.markets,
        fetched_at,
    })
}

#[async_trait]
impl Collector for GlobalAggregateCollector {
    fn name(&self) -> &'static str {
        "global_aggregate"
    }

    async fn run(&self) -> Result<Vec<NormalizedEntity>> {
        let url = with_api_key(format!("{}/global", self.source.base_url), &self.api_key);
        let v = self.fetcher.get_json(&url).await?;
        Ok(vec![NormalizedEntity::Global(parse_global(&v, Utc::now())?)])
    }
}
