// src/sources.rs
//! Static catalog of the external data sources the engine pulls from.
//!
//! Each entry carries the per-minute call budget the free tier of that
//! provider allows; collectors derive their inter-call delays from it.
//! `priority` only orders sources in logs and reports, nothing schedules
//! off it.

use std::time::Duration;

use anyhow::{bail, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceConfig {
    pub name: &'static str,
    pub base_url: &'static str,
    pub rate_limit_per_minute: u32,
    pub priority: u8,
}

impl SourceConfig {
    /// Minimum spacing between two calls to this source inside one pass.
    pub fn min_call_interval(&self) -> Duration {
        Duration::from_millis(60_000 / self.rate_limit_per_minute.max(1) as u64)
    }
}

pub const COINGECKO: SourceConfig = SourceConfig {
    name: "coingecko",
    base_url: "https://api.coingecko.com/api/v3",
    rate_limit_per_minute: 30,
    priority: 1,
};

pub const ALTERNATIVE_ME: SourceConfig = SourceConfig {
    name: "alternative.me",
    base_url: "https://api.alternative.me",
    rate_limit_per_minute: 60,
    priority: 2,
};

pub const DEFILLAMA: SourceConfig = SourceConfig {
    name: "defillama",
    base_url: "https://api.llama.fi",
    rate_limit_per_minute: 60,
    priority: 3,
};

pub const BLOCKCHAIN_INFO: SourceConfig = SourceConfig {
    name: "blockchain.info",
    base_url: "https://api.blockchain.info",
    rate_limit_per_minute: 30,
    priority: 4,
};

pub fn all() -> &'static [SourceConfig] {
    &[COINGECKO, ALTERNATIVE_ME, DEFILLAMA, BLOCKCHAIN_INFO]
}

pub fn by_name(name: &str) -> Option<&'static SourceConfig> {
    all().iter().find(|s| s.name.eq_ignore_ascii_case(name))
}

/// Startup sanity check. A malformed entry here is a programming error and
/// fatal by design, unlike anything that happens during a pass.
pub fn validate() -> Result<()> {
    for s in all() {
        if s.name.is_empty() || !s.base_url.starts_with("http") {
            bail!("malformed source config: {:?}", s);
        }
        if s.rate_limit_per_minute == 0 {
            bail!("source {} has a zero rate-limit budget", s.name);
        }
    }
    Ok(())
}
