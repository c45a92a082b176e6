// src/fetch.rs
//! Rate-limit-aware HTTP layer shared by every collector.
//!
//! The retry policy distinguishes three failure classes so the orchestrator
//! can record a precise error per source:
//! - 429 → exponential backoff (`2^attempt * 1s`), retried up to `max_retries`
//! - other non-2xx → fail fast, these are not transient
//! - network-level errors (timeout, DNS, reset) → linear backoff (`(attempt+1) * 1s`)

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use thiserror::Error;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("rate limited by upstream after {attempts} attempts: {url}")]
    RateLimited { url: String, attempts: u32 },

    #[error("upstream returned {status} for {url}: {message}")]
    Upstream {
        url: String,
        status: u16,
        message: String,
    },

    #[error("network failure after {attempts} attempts for {url}: {message}")]
    Network {
        url: String,
        attempts: u32,
        message: String,
    },

    #[error("invalid JSON from {url}: {message}")]
    Decode { url: String, message: String },
}

pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Transport seam: the real implementation wraps `reqwest`; tests script
/// canned responses through the same trait.
///
/// Network-level failures are `Err(message)`; any HTTP status is `Ok`.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse, String>;
}

pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(concat!("crypto-market-sync/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self { client }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, String> {
        let resp = self
            .client
            .get(url)
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| e.to_string())?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| e.to_string())?;
        Ok(HttpResponse { status, body })
    }
}

/// Stateless from the caller's point of view: no shared mutable state, just
/// the HTTP call plus bounded sleeps.
pub struct Fetcher {
    transport: Arc<dyn HttpTransport>,
    max_retries: u32,
}

impl Fetcher {
    pub fn new() -> Self {
        Self::with_transport(Arc::new(ReqwestTransport::new()), DEFAULT_MAX_RETRIES)
    }

    pub fn with_transport(transport: Arc<dyn HttpTransport>, max_retries: u32) -> Self {
        Self {
            transport,
            max_retries: max_retries.max(1),
        }
    }

    pub async fn get_json(&self, url: &str) -> Result<serde_json::Value, FetchError> {
        let mut last_err = FetchError::RateLimited {
            url: url.to_string(),
            attempts: self.max_retries,
        };

        for attempt in 0..self.max_retries {
            match self.transport.get(url).await {
                Ok(resp) if (200..300).contains(&resp.status) => {
                    return serde_json::from_str(&resp.body).map_err(|e| FetchError::Decode {
                        url: url.to_string(),
                        message: e.to_string(),
                    });
                }
                Ok(resp) if resp.status == 429 => {
                    counter!("fetch_rate_limited_total").increment(1);
                    let backoff = Duration::from_millis(1000u64 << attempt);
                    tracing::warn!(
                        url,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        "429 from upstream, backing off"
                    );
                    last_err = FetchError::RateLimited {
                        url: url.to_string(),
                        attempts: attempt + 1,
                    };
                    tokio::time::sleep(backoff).await;
                }
                Ok(resp) => {
                    // Non-transient: bad request, not-found, auth failure. No retry.
                    counter!("fetch_upstream_errors_total").increment(1);
                    return Err(FetchError::Upstream {
                        url: url.to_string(),
                        status: resp.status,
                        message: truncate_body(&resp.body),
                    });
                }
                Err(message) => {
                    counter!("fetch_network_errors_total").increment(1);
                    let backoff = Duration::from_millis(1000 * (attempt as u64 + 1));
                    tracing::warn!(url, attempt, error = %message, "network error, retrying");
                    last_err = FetchError::Network {
                        url: url.to_string(),
                        attempts: attempt + 1,
                        message,
                    };
                    tokio::time::sleep(backoff).await;
                }
            }
        }

        Err(last_err)
    }
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}

fn truncate_body(body: &str) -> String {
    const CAP: usize = 300;
    if body.chars().count() > CAP {
        body.chars().take(CAP).collect()
    } else {
        body.to_string()
    }
}
