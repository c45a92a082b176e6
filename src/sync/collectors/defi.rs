// src/sync/collectors/defi.rs
//! DeFi protocol TVL snapshot from DefiLlama `/protocols`. The endpoint
//! returns thousands of protocols; only the top slice by TVL is kept.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::fetch::Fetcher;
use crate::sources::{SourceConfig, DEFILLAMA};
use crate::sync::types::{Collector, DeFiProtocolSnapshot, NormalizedEntity};

const TOP_N: usize = 50;

#[derive(Debug, Deserialize)]
struct RawProtocol {
    slug: Option<String>,
    name: String,
    chain: Option<String>,
    category: Option<String>,
    tvl: Option<f64>,
    change_1d: Option<f64>,
}

pub struct DeFiProtocolCollector {
    fetcher: Arc<Fetcher>,
    source: &'static SourceConfig,
    top_n: usize,
}

impl DeFiProtocolCollector {
    pub fn new(fetcher: Arc<Fetcher>) -> Self {
        Self {
            fetcher,
            source: &DEFILLAMA,
            top_n: TOP_N,
        }
    }
}

pub(crate) fn parse_protocols(
    value: &serde_json::Value,
    top_n: usize,
    fetched_at: DateTime<Utc>,
) -> Result<Vec<NormalizedEntity>> {
    let mut raw: Vec<RawProtocol> =
        serde_json::from_value(value.clone()).context("parsing /protocols")?;

    // The API already orders by TVL, but that is not contractual.
    raw.sort_by(|a, b| {
        b.tvl
            .unwrap_or(0.0)
            .partial_cmp(&a.tvl.unwrap_or(0.0))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    Ok(raw
        .into_iter()
        .take(top_n)
        .map(|r| {
            let slug = r
                .slug
                .unwrap_or_else(|| r.name.to_lowercase().replace(' ', "-"));
            NormalizedEntity::DeFi(DeFiProtocolSnapshot {
                slug,
                name: r.name,
                chain: r.chain,
                category: r.category,
                tvl_usd: r.tvl,
                change_1d_pct: r.change_1d,
                fetched_at,
            })
        })
        .collect())
}

#[async_trait]
impl Collector for DeFiProtocolCollector {
    fn name(&self) -> &'static str {
        "defi_protocols"
    }

    async fn run(&self) -> Result<Vec<NormalizedEntity>> {
        let url = format!("{}/protocols", self.source.base_url);
        let v = self.fetcher.get_json(&url).await?;
        parse_protocols(&v, self.top_n, Utc::now())
    }
}
