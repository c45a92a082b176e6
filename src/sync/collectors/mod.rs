// src/sync/collectors/mod.rs
pub mod defi;
pub mod global;
pub mod market;
pub mod onchain;
pub mod sentiment;
pub mod trending;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::fetch::Fetcher;
use crate::sync::types::Collector;

/// Fixed pass order. Priority tiers in the source registry only affect
/// logging; this order is what actually runs.
pub fn default_collectors(fetcher: Arc<Fetcher>, cfg: &AppConfig) -> Vec<Box<dyn Collector>> {
    vec![
        Box::new(market::MarketSnapshotCollector::new(
            fetcher.clone(),
            cfg.coingecko_api_key.clone(),
        )),
        Box::new(sentiment::FearGreedCollector::new(fetcher.clone())),
        Box::new(global::GlobalAggregateCollector::new(
            fetcher.clone(),
            cfg.coingecko_api_key.clone(),
        )),
        Box::new(trending::TrendingCollector::new(
            fetcher.clone(),
            cfg.coingecko_api_key.clone(),
        )),
        Box::new(defi::DeFiProtocolCollector::new(fetcher.clone())),
        Box::new(onchain::OnChainCollector::new(fetcher)),
    ]
}

/// CoinGecko demo keys ride along as a query parameter.
pub(crate) fn with_api_key(url: String, api_key: &Option<String>) -> String {
    match api_key {
        Some(key) if !key.is_empty() => {
            let sep = if url.contains('?') { '&' } else { '?' };
            format!("{url}{sep}x_cg_demo_api_key={key}")
        }
        _ => url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_appends_with_the_right_separator() {
        let key = Some("k1".to_string());
        assert_eq!(
            with_api_key("http://x/global".into(), &key),
            "http://x/global?x_cg_demo_api_key=k1"
        );
        assert_eq!(
            with_api_key("http://x/coins?page=1".into(), &key),
            "http://x/coins?page=1&x_cg_demo_api_key=k1"
        );
        assert_eq!(with_api_key("http://x".into(), &None), "http://x");
    }
}
