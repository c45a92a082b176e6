// src/sync/scheduler.rs
//! Owns the one repeating timer that drives orchestrator passes.
//!
//! A single process holds at most one active timer task: `start` while
//! running is a no-op, which is what guarantees passes never overlap.
//! `stop` is coarse — it only prevents future passes; one already in
//! flight finishes on its own.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::sync::SyncOrchestrator;

/// Declared cadence policy per collector group. A single interval timer
/// drives every collector today; this table is logged at startup so
/// operators can see the intended split, and a future multi-timer
/// scheduler can consume it as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    Realtime,
    Frequent,
    Hourly,
    Daily,
}

pub const CADENCE_POLICY: &[(&str, Cadence)] = &[
    ("market_snapshot", Cadence::Frequent),
    ("fear_greed", Cadence::Hourly),
    ("global_aggregate", Cadence::Frequent),
    ("trending", Cadence::Hourly),
    ("defi_protocols", Cadence::Hourly),
    ("onchain_summary", Cadence::Hourly),
    ("backfill", Cadence::Daily),
];

pub struct Scheduler {
    orchestrator: Arc<SyncOrchestrator>,
    handle: Option<JoinHandle<()>>,
    shutdown: Option<watch::Sender<bool>>,
}

impl Scheduler {
    pub fn new(orchestrator: Arc<SyncOrchestrator>) -> Self {
        Self {
            orchestrator,
            handle: None,
            shutdown: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Run one cold-start pass immediately, then a pass every
    /// `interval_minutes`. No-op when already running.
    pub fn start(&mut self, interval_minutes: u64) {
        if self.is_running() {
            tracing::warn!("sync scheduler already running");
            return;
        }

        let (tx, mut rx) = watch::channel(false);
        let orchestrator = self.orchestrator.clone();

        let handle = tokio::spawn(async move {
            let period = Duration::from_secs(interval_minutes.max(1) * 60);
            let mut ticker = tokio::time::interval(period);
            // A pass that overruns the period delays the next tick instead
            // of bursting; pass N always completes before N+1 begins.
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let _ = orchestrator.run_pass().await;
                    }
                    changed = rx.changed() => {
                        if changed.is_err() || *rx.borrow() {
                            tracing::info!("sync scheduler stopped");
                            break;
                        }
                    }
                }
            }
        });

        self.handle = Some(handle);
        self.shutdown = Some(tx);
        tracing::info!(interval_minutes, "sync scheduler started");
    }

    /// Prevent future passes. Does not cancel an in-flight pass.
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(true);
        }
        // Dropping the handle detaches the task; it exits at its next
        // select point after the in-flight pass returns.
        self.handle.take();
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
