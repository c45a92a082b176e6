// src/sync/collectors/sentiment.rs
//! Fear & Greed index from alternative.me. The same endpoint serves the
//! latest reading (live pass) and up to a year of history (backfill).

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::fetch::Fetcher;
use crate::sources::{SourceConfig, ALTERNATIVE_ME};
use crate::sync::types::{Collector, FearGreedReading, NormalizedEntity};

// alternative.me publishes numbers as JSON strings.
#[derive(Debug, Deserialize)]
struct RawIndex {
    data: Vec<RawReading>,
}

#[derive(Debug, Deserialize)]
struct RawReading {
    value: String,
    value_classification: String,
    timestamp: String,
}

pub struct FearGreedCollector {
    fetcher: Arc<Fetcher>,
    source: &'static SourceConfig,
}

impl FearGreedCollector {
    pub fn new(fetcher: Arc<Fetcher>) -> Self {
        Self {
            fetcher,
            source: &ALTERNATIVE_ME,
        }
    }

    pub async fn fetch_readings(&self, limit: u32) -> Result<Vec<FearGreedReading>> {
        let url = format!("{}/fng/?limit={}&format=json", self.source.base_url, limit);
        let v = self.fetcher.get_json(&url).await?;
        parse_readings(&v, Utc::now())
    }
}

pub(crate) fn parse_readings(
    value: &serde_json::Value,
    fetched_at: DateTime<Utc>,
) -> Result<Vec<FearGreedReading>> {
    let raw: RawIndex =
        serde_json::from_value(value.clone()).context("parsing fear/greed response")?;
    let mut out = Vec::with_capacity(raw.data.len());
    for r in raw.data {
        let value: u32 = r
            .value
            .parse()
            .with_context(|| format!("non-numeric index value {:?}", r.value))?;
        let secs: i64 = r
            .timestamp
            .parse()
            .with_context(|| format!("non-numeric index timestamp {:?}", r.timestamp))?;
        let timestamp = DateTime::<Utc>::from_timestamp(secs, 0)
            .with_context(|| format!("out-of-range index timestamp {secs}"))?;
        out.push(FearGreedReading {
            timestamp,
            value,
            classification: r.value_classification,
            fetched_at,
        });
    }
    Ok(out)
}

#[async_trait]
impl Collector for FearGreedCollector {
    fn name(&self) -> &'static str {
        "fear_greed"
    }

    async fn run(&self) -> Result<Vec<NormalizedEntity>> {
        let readings = self.fetch_readings(1).await?;
        Ok(readings.into_iter().map(NormalizedEntity::FearGreed).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = include_str!("../../../tests/fixtures/fear_greed.json");

    #[test]
    fn parses_string_encoded_numbers() {
        let v: serde_json::Value = serde_json::from_str(FIXTURE).unwrap();
        let readings = parse_readings(&v, Utc::now()).unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].value, 72);
        assert_eq!(readings[0].classification, "Greed");
        assert_eq!(readings[0].timestamp.timestamp(), 1724457600);
    }

    #[test]
    fn garbage_values_are_an_error_not_a_zero() {
        let v = serde_json::json!({
            "data": [{"value": "n/a", "value_classification": "Fear", "timestamp": "1"}]
        });
        assert!(parse_readings(&v, Utc::now()).is_err());
    }
}
