// src/sync/collectors/trending.rs
//! Trending search list from CoinGecko `/search/trending`.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::fetch::Fetcher;
use crate::sources::{SourceConfig, COINGECKO};
use crate::sync::collectors::with_api_key;
use crate::sync::types::{Collector, NormalizedEntity, TrendingEntry};

#[derive(Debug, Deserialize)]
struct RawTrending {
    coins: Vec<RawCoinWrapper>,
}

#[derive(Debug, Deserialize)]
struct RawCoinWrapper {
    item: RawCoin,
}

#[derive(Debug, Deserialize)]
struct RawCoin {
    symbol: String,
    name: String,
    market_cap_rank: Option<u32>,
}

pub struct TrendingCollector {
    fetcher: Arc<Fetcher>,
    source: &'static SourceConfig,
    api_key: Option<String>,
}

impl TrendingCollector {
    pub fn new(fetcher: Arc<Fetcher>, api_key: Option<String>) -> Self {
        Self {
            fetcher,
            source: &COINGECKO,
            api_key,
        }
    }
}

pub(crate) fn parse_trending(
    value: &serde_json::Value,
    fetched_at: DateTime<Utc>,
) -> Result<Vec<NormalizedEntity>> {
    let raw: RawTrending =
        serde_json::from_value(value.clone()).context("parsing /search/trending")?;
    Ok(raw
        .coins
        .into_iter()
        .enumerate()
        .map(|(i, w)| {
            NormalizedEntity::Trending(TrendingEntry {
                symbol: w.item.symbol,
                name: w.item.name,
                // List position, 1-based.
                rank: i as u32 + 1,
                market_cap_rank: w.item.market_cap_rank,
                fetched_at,
            })
        })
        .collect())
}

#[async_trait]
impl Collector for TrendingCollector {
    fn name(&self) -> &'static str {
        "trending"
    }

    async fn run(&self) -> Result<Vec<NormalizedEntity>> {
        let url = with_api_key(
            format!("{}/search/trending", self.source.base_url),
            &self.api_key,
        );
        let v = self.fetcher.get_json(&url).await?;
        parse_trending(&v, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = include_str!("../../../tests/fixtures/trending.json");

    #[test]
    fn list_position_becomes_the_rank() {
        let v: serde_json::Value = serde_json::from_str(FIXTURE).unwrap();
        let entries = parse_trending(&v, Utc::now()).unwrap();
        assert_eq!(entries.len(), 3);

        let NormalizedEntity::Trending(first) = &entries[0] else {
            panic!("expected trending entry");
        };
        assert_eq!(first.rank, 1);
        assert_eq!(first.symbol, "PEPE");

        let NormalizedEntity::Trending(last) = &entries[2] else {
            panic!("expected trending entry");
        };
        assert_eq!(last.rank, 3);
        assert_eq!(last.market_cap_rank, None);
    }
}
