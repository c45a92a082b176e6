// src/sync/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One normalized record per domain. A new pass produces new instances that
/// replace the prior ones by natural key; nothing mutates in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NormalizedEntity {
    Market(MarketSnapshot),
    FearGreed(FearGreedReading),
    Global(GlobalAggregate),
    Trending(TrendingEntry),
    DeFi(DeFiProtocolSnapshot),
    OnChain(OnChainSummary),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub name: String,
    pub rank: Option<u32>,
    pub price_usd: Option<f64>,
    pub market_cap_usd: Option<f64>,
    pub volume_24h_usd: Option<f64>,
    pub change_24h_pct: Option<f64>,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FearGreedReading {
    /// Reading timestamp as published by the index; the natural key.
    pub timestamp: DateTime<Utc>,
    pub value: u32,
    pub classification: String,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GlobalAggregate {
    /// Singleton row, keyed "global"; each pass overwrites the last.
    pub id: String,
    pub total_market_cap_usd: Option<f64>,
    pub total_volume_24h_usd: Option<f64>,
    pub btc_dominance_pct: Option<f64>,
    pub active_cryptocurrencies: Option<u64>,
    pub markets: Option<u64>,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendingEntry {
    pub symbol: String,
    pub name: String,
    pub rank: u32,
    pub market_cap_rank: Option<u32>,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeFiProtocolSnapshot {
    pub slug: String,
    pub name: String,
    pub chain: Option<String>,
    pub category: Option<String>,
    pub tvl_usd: Option<f64>,
    pub change_1d_pct: Option<f64>,
    pub fetched_at: DateTime<Utc>,
}

/// Free-tier chain APIs omit some of these; absent metrics stay `None` and
/// render as "unavailable" downstream, never as zero.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OnChainSummary {
    pub network: String,
    pub tx_count_24h: Option<u64>,
    pub hash_rate: Option<f64>,
    pub total_fees_btc: Option<f64>,
    pub minutes_between_blocks: Option<f64>,
    pub fetched_at: DateTime<Utc>,
}

impl NormalizedEntity {
    pub fn natural_key(&self) -> String {
        match self {
            Self::Market(m) => m.symbol.clone(),
            // Matches the serde wire form of the timestamp, "Z" suffix included.
            Self::FearGreed(f) => f
                .timestamp
                .to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true),
            Self::Global(g) => g.id.clone(),
            Self::Trending(t) => t.symbol.clone(),
            Self::DeFi(d) => d.slug.clone(),
            Self::OnChain(o) => o.network.clone(),
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            Self::Market(_) => "market_snapshots",
            Self::FearGreed(_) => "fear_greed_readings",
            Self::Global(_) => "global_aggregates",
            Self::Trending(_) => "trending_entries",
            Self::DeFi(_) => "defi_protocols",
            Self::OnChain(_) => "onchain_summaries",
        }
    }

    /// Column the upsert conflicts on.
    pub fn key_field(&self) -> &'static str {
        match self {
            Self::Market(_) => "symbol",
            Self::FearGreed(_) => "timestamp",
            Self::Global(_) => "id",
            Self::Trending(_) => "symbol",
            Self::DeFi(_) => "slug",
            Self::OnChain(_) => "network",
        }
    }

    pub fn to_row(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            Self::Market(m) => serde_json::to_value(m),
            Self::FearGreed(f) => serde_json::to_value(f),
            Self::Global(g) => serde_json::to_value(g),
            Self::Trending(t) => serde_json::to_value(t),
            Self::DeFi(d) => serde_json::to_value(d),
            Self::OnChain(o) => serde_json::to_value(o),
        }
    }

    /// Derived text summary for the searchable index. Only high-value rows
    /// become chunks; the rest are upsert-only.
    pub fn to_chunk(&self) -> Option<DataChunk> {
        match self {
            Self::Market(m) => {
                // Top 100 only; pages beyond that are upserted but not indexed.
                if m.rank.unwrap_or(u32::MAX) > 100 {
                    return None;
                }
                Some(DataChunk {
                    content: format!(
                        "{} ({}) rank #{}: price {}, market cap {}, 24h volume {}, 24h change {}",
                        m.name,
                        m.symbol.to_uppercase(),
                        m.rank.map_or_else(|| "unavailable".into(), |r| r.to_string()),
                        fmt_usd(m.price_usd),
                        fmt_usd(m.market_cap_usd),
                        fmt_usd(m.volume_24h_usd),
                        fmt_pct(m.change_24h_pct),
                    ),
                    content_type: ChunkType::MarketSummary,
                    category_path: "market/snapshot".into(),
                    coin_symbol: Some(m.symbol.to_uppercase()),
                    source: "coingecko".into(),
                    data_date: m.fetched_at,
                })
            }
            Self::FearGreed(f) => Some(DataChunk {
                content: format!(
                    "Fear & Greed index at {}: {} ({})",
                    f.timestamp.format("%Y-%m-%d"),
                    f.value,
                    f.classification
                ),
                content_type: ChunkType::SentimentSummary,
                category_path: "sentiment/fear-greed".into(),
                coin_symbol: None,
                source: "alternative.me".into(),
                data_date: f.timestamp,
            }),
            Self::Global(g) => Some(DataChunk {
                content: format!(
                    "Global crypto market: total cap {}, 24h volume {}, BTC dominance {}, {} active assets",
                    fmt_usd(g.total_market_cap_usd),
                    fmt_usd(g.total_volume_24h_usd),
                    fmt_pct(g.btc_dominance_pct),
                    g.active_cryptocurrencies
                        .map_or_else(|| "unavailable".into(), |n| n.to_string()),
                ),
                content_type: ChunkType::GlobalSummary,
                category_path: "market/global".into(),
                coin_symbol: None,
                source: "coingecko".into(),
                data_date: g.fetched_at,
            }),
            Self::Trending(t) => Some(DataChunk {
                content: format!(
                    "Trending #{}: {} ({}), market cap rank {}",
                    t.rank,
                    t.name,
                    t.symbol.to_uppercase(),
                    t.market_cap_rank
                        .map_or_else(|| "unavailable".into(), |r| r.to_string()),
                ),
                content_type: ChunkType::TrendingSummary,
                category_path: "market/trending".into(),
                coin_symbol: Some(t.symbol.to_uppercase()),
                source: "coingecko".into(),
                data_date: t.fetched_at,
            }),
            Self::DeFi(d) => Some(DataChunk {
                content: format!(
                    "DeFi protocol {} ({}): TVL {}, 1d change {}",
                    d.name,
                    d.category.as_deref().unwrap_or("uncategorized"),
                    fmt_usd(d.tvl_usd),
                    fmt_pct(d.change_1d_pct),
                ),
                content_type: ChunkType::ProtocolSummary,
                category_path: format!("defi/{}", d.slug),
                coin_symbol: None,
                source: "defillama".into(),
                data_date: d.fetched_at,
            }),
            Self::OnChain(o) => Some(DataChunk {
                content: format!(
                    "{} on-chain: {} tx/24h, hash rate {}, fees {} BTC, {} min between blocks",
                    o.network,
                    o.tx_count_24h
                        .map_or_else(|| "unavailable".into(), |n| n.to_string()),
                    o.hash_rate
                        .map_or_else(|| "unavailable".into(), |h| format!("{h:.0} GH/s")),
                    o.total_fees_btc
                        .map_or_else(|| "unavailable".into(), |f| format!("{f:.4}")),
                    o.minutes_between_blocks
                        .map_or_else(|| "unavailable".into(), |m| format!("{m:.1}")),
                ),
                content_type: ChunkType::OnChainSummary,
                category_path: format!("onchain/{}", o.network),
                coin_symbol: None,
                source: "blockchain.info".into(),
                data_date: o.fetched_at,
            }),
        }
    }
}

fn fmt_usd(v: Option<f64>) -> String {
    match v {
        Some(x) => format!("${x:.2}"),
        None => "unavailable".into(),
    }
}

fn fmt_pct(v: Option<f64>) -> String {
    match v {
        Some(x) => format!("{x:+.2}%"),
        None => "unavailable".into(),
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    MarketSummary,
    SentimentSummary,
    GlobalSummary,
    TrendingSummary,
    ProtocolSummary,
    OnChainSummary,
    PriceHistory,
}

/// Denormalized text record for the secondary searchable index. Append-only;
/// backfill writes one per coin per sampled date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataChunk {
    pub content: String,
    pub content_type: ChunkType,
    pub category_path: String,
    pub coin_symbol: Option<String>,
    pub source: String,
    pub data_date: DateTime<Utc>,
}

/// Outcome of one collector invocation inside a pass. Ephemeral: aggregated
/// into the pass summary and logged, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncResult {
    pub source: String,
    pub success: bool,
    pub records_processed: usize,
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// One unit of fetch-and-normalize per external domain. Collectors return
/// data; they never write it.
#[async_trait::async_trait]
pub trait Collector: Send + Sync {
    fn name(&self) -> &'static str;
    async fn run(&self) -> Result<Vec<NormalizedEntity>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(rank: Option<u32>) -> NormalizedEntity {
        NormalizedEntity::Market(MarketSnapshot {
            symbol: "btc".into(),
            name: "Bitcoin".into(),
            rank,
            price_usd: Some(67_432.1),
            market_cap_usd: None,
            volume_24h_usd: Some(1.0e9),
            change_24h_pct: Some(-1.25),
            fetched_at: Utc::now(),
        })
    }

    #[test]
    fn only_top_100_market_rows_become_chunks() {
        assert!(snapshot(Some(1)).to_chunk().is_some());
        assert!(snapshot(Some(100)).to_chunk().is_some());
        assert!(snapshot(Some(101)).to_chunk().is_none());
        // Unknown rank is not high-value.
        assert!(snapshot(None).to_chunk().is_none());
    }

    #[test]
    fn missing_metrics_render_as_unavailable() {
        let chunk = snapshot(Some(1)).to_chunk().unwrap();
        assert!(chunk.content.contains("market cap unavailable"));
        assert!(chunk.content.contains("$67432.10"));
        assert!(chunk.content.contains("-1.25%"));
    }

    #[test]
    fn natural_keys_and_tables_are_exhaustive() {
        let e = snapshot(Some(1));
        assert_eq!(e.natural_key(), "btc");
        assert_eq!(e.table(), "market_snapshots");
        assert_eq!(e.key_field(), "symbol");

        let g = NormalizedEntity::Global(GlobalAggregate {
            id: "global".into(),
            total_market_cap_usd: None,
            total_volume_24h_usd: None,
            btc_dominance_pct: None,
            active_cryptocurrencies: None,
            markets: None,
            fetched_at: Utc::now(),
        });
        assert_eq!(g.natural_key(), "global");
        assert_eq!(g.key_field(), "id");
    }

    #[test]
    fn row_serialization_carries_the_key_field() {
        let row = snapshot(Some(3)).to_row().unwrap();
        assert_eq!(row["symbol"], "btc");
        assert!(row["market_cap_usd"].is_null());
    }
}
