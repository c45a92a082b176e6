mod support;

use std::sync::Arc;
use std::time::Duration;

use crypto_market_sync::{BackfillEngine, Fetcher, MemoryStore, PersistenceSink};
use support::{ScriptedTransport, Step};

const FNG_HISTORY: &str = include_str!("fixtures/fear_greed.json");

fn chart_body(days: usize) -> String {
    let points: Vec<serde_json::Value> = (0..days)
        .map(|i| {
            serde_json::json!([1_700_000_000_000i64 + i as i64 * 86_400_000, 40_000.0 + i as f64])
        })
        .collect();
    serde_json::json!({ "prices": points }).to_string()
}

fn engine(
    transport: Arc<ScriptedTransport>,
    store: Arc<MemoryStore>,
    watchlist: &[&str],
) -> BackfillEngine {
    let fetcher = Arc::new(Fetcher::with_transport(transport, 3));
    BackfillEngine::new(
        fetcher,
        PersistenceSink::new(store),
        watchlist.iter().map(|s| s.to_string()).collect(),
        None,
    )
    .with_delay(Duration::ZERO)
}

#[tokio::test]
async fn weekly_sampling_bounds_chunk_volume() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        Step::ok_json(FNG_HISTORY),
        Step::ok_json(&chart_body(365)),
        Step::ok_json(&chart_body(366)),
    ]));
    let store = Arc::new(MemoryStore::new());

    engine(transport.clone(), store.clone(), &["bitcoin", "ethereum"])
        .backfill()
        .await;

    // ceil(365/7) == ceil(366/7) == 53 chunks per asset, source granularity
    // notwithstanding.
    assert_eq!(store.chunk_count(), 106);
    // Sentiment history went through the upsert path, not the chunk index.
    assert_eq!(store.row_count(), 2);

    // One fng call plus exactly one range request per asset.
    let calls = transport.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls[0].contains("/fng/?limit=365"));
    assert!(calls[1].contains("/coins/bitcoin/market_chart"));
    assert!(calls[2].contains("/coins/ethereum/market_chart"));
}

#[tokio::test]
async fn one_asset_failure_skips_to_the_next() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        Step::ok_json(FNG_HISTORY),
        Step::Status(404, "unknown asset".into()),
        Step::ok_json(&chart_body(70)),
    ]));
    let store = Arc::new(MemoryStore::new());

    engine(transport, store.clone(), &["notacoin", "ethereum"])
        .backfill()
        .await;

    // notacoin contributed nothing; ethereum still produced ceil(70/7).
    assert_eq!(store.chunk_count(), 10);
}

#[tokio::test]
async fn sentiment_failure_does_not_block_assets() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        Step::Status(500, "index down".into()),
        Step::ok_json(&chart_body(14)),
    ]));
    let store = Arc::new(MemoryStore::new());

    engine(transport, store.clone(), &["bitcoin"]).backfill().await;

    assert_eq!(store.row_count(), 0);
    assert_eq!(store.chunk_count(), 2);
}
