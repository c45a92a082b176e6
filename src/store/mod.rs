// src/store/mod.rs
//! Persistence sink with two independent write paths: idempotent upsert for
//! normalized entities and best-effort append for searchable text chunks.
//! An unconfigured store degrades both paths to a logged no-op so the engine
//! stays runnable in a dry environment.

pub mod memory;
pub mod rest;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::sync::types::{DataChunk, NormalizedEntity};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage write failed: {0}")]
    Write(String),
}

#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Insert-or-replace `rows` into `table`, conflicting on `key_field`.
    async fn upsert(
        &self,
        table: &str,
        key_field: &str,
        rows: Vec<serde_json::Value>,
    ) -> Result<(), StoreError>;

    /// Append chunks to the text index. Append-only, no dedup.
    async fn append_chunks(&self, chunks: &[DataChunk]) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct PersistenceSink {
    backend: Option<Arc<dyn StoreBackend>>,
}

impl PersistenceSink {
    pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    pub fn unconfigured() -> Self {
        Self { backend: None }
    }

    pub fn is_configured(&self) -> bool {
        self.backend.is_some()
    }

    /// Upsert a collector's whole batch, grouped by target table. A write
    /// error propagates so the owning source's `SyncResult` reflects it.
    pub async fn upsert(&self, entities: &[NormalizedEntity]) -> Result<usize, StoreError> {
        let Some(backend) = &self.backend else {
            tracing::debug!(count = entities.len(), "store unconfigured, skipping upsert");
            return Ok(0);
        };

        let mut groups: BTreeMap<(&str, &str), Vec<serde_json::Value>> = BTreeMap::new();
        for e in entities {
            let row = e.to_row().map_err(|err| StoreError::Write(err.to_string()))?;
            groups.entry((e.table(), e.key_field())).or_default().push(row);
        }

        let mut written = 0usize;
        for ((table, key_field), rows) in groups {
            written += rows.len();
            backend.upsert(table, key_field, rows).await?;
        }
        Ok(written)
    }

    /// Best-effort relative to `upsert`: callers invoke this separately and
    /// only after the upsert succeeded, so an index failure can never roll
    /// the primary write back.
    pub async fn index_chunks(&self, chunks: &[DataChunk]) -> Result<(), StoreError> {
        let Some(backend) = &self.backend else {
            tracing::debug!(count = chunks.len(), "store unconfigured, skipping chunk index");
            return Ok(());
        };
        if chunks.is_empty() {
            return Ok(());
        }
        backend.append_chunks(chunks).await
    }
}
