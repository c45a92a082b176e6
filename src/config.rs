// src/config.rs
//! Environment-level configuration. Everything has a default; the engine is
//! runnable with no env at all (the store then degrades to a dry no-op).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

const ENV_WATCHLIST_PATH: &str = "WATCHLIST_PATH";
const DEFAULT_INTERVAL_MINUTES: u64 = 15;

/// Small, fixed backfill universe. Operators override it with a watchlist
/// file; this is never the full ranked asset list.
pub const DEFAULT_WATCHLIST: &[&str] = &[
    "bitcoin",
    "ethereum",
    "solana",
    "cardano",
    "polkadot",
    "chainlink",
];

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub url: String,
    pub service_key: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub interval_minutes: u64,
    pub coingecko_api_key: Option<String>,
    pub store: Option<StoreConfig>,
    pub watchlist: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let interval_minutes = std::env::var("SYNC_INTERVAL_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_INTERVAL_MINUTES);

        let coingecko_api_key = std::env::var("COINGECKO_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());

        // Both halves required; a partial store config is treated as absent.
        let store = match (std::env::var("STORE_URL"), std::env::var("STORE_SERVICE_KEY")) {
            (Ok(url), Ok(service_key)) if !url.trim().is_empty() => Some(StoreConfig {
                url,
                service_key,
            }),
            _ => None,
        };

        let watchlist = load_watchlist_default()?;

        Ok(Self {
            interval_minutes,
            coingecko_api_key,
            store,
            watchlist,
        })
    }
}

/// Load the backfill watchlist from an explicit path. TOML or JSON.
pub fn load_watchlist_from(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading watchlist from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_watchlist(&content, ext.as_str())
}

/// Watchlist resolution order:
/// 1) $WATCHLIST_PATH
/// 2) config/watchlist.toml
/// 3) config/watchlist.json
/// 4) built-in default set
pub fn load_watchlist_default() -> Result<Vec<String>> {
    if let Ok(p) = std::env::var(ENV_WATCHLIST_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_watchlist_from(&pb);
        }
        return Err(anyhow!("WATCHLIST_PATH points to non-existent path"));
    }
    let toml_p = PathBuf::from("config/watchlist.toml");
    if toml_p.exists() {
        return load_watchlist_from(&toml_p);
    }
    let json_p = PathBuf::from("config/watchlist.json");
    if json_p.exists() {
        return load_watchlist_from(&json_p);
    }
    Ok(DEFAULT_WATCHLIST.iter().map(|s| s.to_string()).collect())
}

fn parse_watchlist(s: &str, hint_ext: &str) -> Result<Vec<String>> {
    let try_toml = hint_ext == "toml" || s.contains("assets");
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported watchlist format"))
}

fn parse_toml(s: &str) -> Result<Vec<String>> {
    #[derive(serde::Deserialize)]
    struct TomlWl {
        assets: Vec<String>,
    }
    let v: TomlWl = toml::from_str(s)?;
    Ok(clean_list(v.assets))
}

fn parse_json(s: &str) -> Result<Vec<String>> {
    let v: Vec<String> = serde_json::from_str(s)?;
    Ok(clean_list(v))
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    use std::collections::BTreeSet;
    let mut set = BTreeSet::new();
    for it in items {
        let t = it.trim().to_ascii_lowercase();
        if !t.is_empty() {
            set.insert(t);
        }
    }
    set.into_iter().collect()
}
