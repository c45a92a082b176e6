// src/sync/collectors/market.rs
//! Paginated ranked-asset snapshot from CoinGecko `/coins/markets`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::fetch::Fetcher;
use crate::sources::{SourceConfig, COINGECKO};
use crate::sync::collectors::with_api_key;
use crate::sync::types::{Collector, MarketSnapshot, NormalizedEntity};

const PAGES: u32 = 2;
const PER_PAGE: u32 = 100;
const INTER_PAGE_DELAY: Duration = Duration::from_millis(2000);

#[derive(Debug, Deserialize)]
struct RawMarket {
    symbol: String,
    name: String,
    market_cap_rank: Option<u32>,
    current_price: Option<f64>,
    market_cap: Option<f64>,
    total_volume: Option<f64>,
    price_change_percentage_24h: Option<f64>,
}

pub struct MarketSnapshotCollector {
    fetcher: Arc<Fetcher>,
    source: &'static SourceConfig,
    api_key: Option<String>,
    pages: u32,
}

impl MarketSnapshotCollector {
    pub fn new(fetcher: Arc<Fetcher>, api_key: Option<String>) -> Self {
        Self {
            fetcher,
            source: &COINGECKO,
            api_key,
            pages: PAGES,
        }
    }

    fn page_url(&self, page: u32) -> String {
        let url = format!(
            "{}/coins/markets?vs_currency=usd&order=market_cap_desc&per_page={}&page={}",
            self.source.base_url, PER_PAGE, page
        );
        with_api_key(url, &self.api_key)
    }

    fn inter_page_delay(&self) -> Duration {
        // At least the source's own budget, whichever is slower.
        INTER_PAGE_DELAY.max(self.source.min_call_interval())
    }
}

pub(crate) fn parse_markets_page(
    value: &serde_json::Value,
    fetched_at: DateTime<Utc>,
) -> Result<Vec<NormalizedEntity>> {
    let raw: Vec<RawMarket> =
        serde_json::from_value(value.clone()).context("parsing coins/markets page")?;
    Ok(raw
        .into_iter()
        .map(|r| {
            NormalizedEntity::Market(MarketSnapshot {
                symbol: r.symbol,
                name: r.name,
                rank: r.market_cap_rank,
                price_usd: r.current_price,
                market_cap_usd: r.market_cap,
                volume_24h_usd: r.total_volume,
                change_24h_pct: r.price_change_percentage_24h,
                fetched_at,
            })
        })
        .collect())
}

#[async_trait]
impl Collector for MarketSnapshotCollector {
    fn name(&self) -> &'static str {
        "market_snapshot"
    }

    async fn run(&self) -> Result<Vec<NormalizedEntity>> {
        let fetched_at = Utc::now();
        let mut out = Vec::with_capacity((self.pages * PER_PAGE) as usize);

        for page in 1..=self.pages {
            if page > 1 {
                tokio::time::sleep(self.inter_page_delay()).await;
            }
            // A 200 whose body is not a market-row array (CoinGecko inlines
            // an error object on plan limits) counts as a page failure too:
            // keep what earlier pages returned.
            match self.fetcher.get_json(&self.page_url(page)).await {
                Ok(v) => match parse_markets_page(&v, fetched_at) {
                    Ok(mut rows) => out.append(&mut rows),
                    Err(e) if page == 1 => {
                        return Err(e).context("first markets page failed");
                    }
                    Err(e) => {
                        tracing::warn!(
                            page,
                            error = format!("{e:#}").as_str(),
                            "markets page unparseable, keeping partial batch"
                        );
                        break;
                    }
                },
                Err(e) if page == 1 => {
                    return Err(e).context("first markets page failed");
                }
                Err(e) => {
                    tracing::warn!(page, error = %e, "markets page failed, keeping partial batch");
                    break;
                }
            }
        }

        Ok(out)
    }
}
