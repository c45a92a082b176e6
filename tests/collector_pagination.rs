mod support;

use std::sync::Arc;

use crypto_market_sync::sync::collectors::market::MarketSnapshotCollector;
use crypto_market_sync::{Collector, Fetcher};
use support::{ScriptedTransport, Step};

const PAGE_ONE: &str = include_str!("fixtures/markets_page.json");
// CoinGecko answers 200 with an inline error object when a plan limit hits.
const PLAN_LIMIT_BODY: &str =
    r#"{"status": {"error_code": 10005, "error_message": "demo plan limit"}}"#;

#[tokio::test(start_paused = true)]
async fn later_page_schema_mismatch_keeps_prior_pages() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        Step::ok_json(PAGE_ONE),
        Step::ok_json(PLAN_LIMIT_BODY),
    ]));
    let fetcher = Arc::new(Fetcher::with_transport(transport.clone(), 3));
    let collector = MarketSnapshotCollector::new(fetcher, None);

    let entities = collector.run().await.unwrap();

    // Page 1's rows survive the unparseable page 2.
    assert_eq!(entities.len(), 3);
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn later_page_fetch_failure_keeps_prior_pages() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        Step::ok_json(PAGE_ONE),
        Step::Status(500, "upstream down".into()),
    ]));
    let fetcher = Arc::new(Fetcher::with_transport(transport.clone(), 3));
    let collector = MarketSnapshotCollector::new(fetcher, None);

    let entities = collector.run().await.unwrap();

    assert_eq!(entities.len(), 3);
    assert_eq!(transport.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn first_page_schema_mismatch_still_fails_fast() {
    let transport = Arc::new(ScriptedTransport::new(vec![Step::ok_json(PLAN_LIMIT_BODY)]));
    let fetcher = Arc::new(Fetcher::with_transport(transport.clone(), 3));
    let collector = MarketSnapshotCollector::new(fetcher, None);

    let err = collector.run().await.unwrap_err();

    assert!(format!("{err:#}").contains("first markets page failed"));
    assert_eq!(transport.call_count(), 1);
}
