//! Market-Data Sync Engine — Binary Entrypoint
//!
//! Runs the repeating sync scheduler until ctrl-c, or a one-shot historical
//! backfill with `--backfill`. No inbound HTTP surface; the only triggers
//! are process boot and the operator.

use std::sync::Arc;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crypto_market_sync::config::AppConfig;
use crypto_market_sync::store::rest::RestStore;
use crypto_market_sync::sync::collectors::default_collectors;
use crypto_market_sync::sync::scheduler::CADENCE_POLICY;
use crypto_market_sync::{
    BackfillEngine, Fetcher, PersistenceSink, Scheduler, SyncOrchestrator,
};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("crypto_market_sync=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    // A malformed source catalog is a programming error: fail the boot.
    crypto_market_sync::sources::validate()?;

    let cfg = AppConfig::from_env()?;

    let fetcher = Arc::new(Fetcher::new());
    let sink = match &cfg.store {
        Some(store_cfg) => PersistenceSink::new(Arc::new(RestStore::new(store_cfg))),
        None => {
            tracing::info!("durable store unconfigured, running dry (no writes)");
            PersistenceSink::unconfigured()
        }
    };

    if std::env::args().any(|a| a == "--backfill") {
        let engine = BackfillEngine::new(
            fetcher,
            sink,
            cfg.watchlist.clone(),
            cfg.coingecko_api_key.clone(),
        );
        engine.backfill().await;
        return Ok(());
    }

    for (name, cadence) in CADENCE_POLICY.iter().copied() {
        tracing::info!(collector = name, cadence = ?cadence, "declared cadence (single timer drives all)");
    }

    let collectors = default_collectors(fetcher, &cfg);
    let orchestrator = Arc::new(SyncOrchestrator::new(collectors, sink));
    let mut scheduler = Scheduler::new(orchestrator);
    scheduler.start(cfg.interval_minutes);

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    scheduler.stop();

    Ok(())
}
