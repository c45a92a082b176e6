// src/store/rest.rs
//! REST store backend speaking the PostgREST/Supabase dialect: upserts via
//! `POST /rest/v1/{table}?on_conflict={key}` with merge-duplicates, chunk
//! appends via a plain insert into the `data_chunks` table.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::StoreConfig;
use crate::store::{StoreBackend, StoreError};
use crate::sync::types::DataChunk;

const CHUNK_TABLE: &str = "data_chunks";
const WRITE_TIMEOUT: Duration = Duration::from_secs(20);

pub struct RestStore {
    base_url: String,
    service_key: String,
    client: reqwest::Client,
}

impl RestStore {
    pub fn new(cfg: &StoreConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(WRITE_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            base_url: cfg.url.trim_end_matches('/').to_string(),
            service_key: cfg.service_key.clone(),
            client,
        }
    }

    async fn post_rows(
        &self,
        table: &str,
        query: &[(&str, &str)],
        prefer: &str,
        body: &serde_json::Value,
    ) -> Result<(), StoreError> {
        let url = format!("{}/rest/v1/{}", self.base_url, table);
        let resp = self
            .client
            .post(&url)
            .query(query)
            .header("apikey", &self.service_key)
            .header("authorization", format!("Bearer {}", self.service_key))
            .header("prefer", prefer)
            .json(body)
            .send()
            .await
            .map_err(|e| StoreError::Write(format!("{table}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StoreError::Write(format!("{table}: {status}: {body}")));
        }
        Ok(())
    }
}

#[async_trait]
impl StoreBackend for RestStore {
    async fn upsert(
        &self,
        table: &str,
        key_field: &str,
        rows: Vec<serde_json::Value>,
    ) -> Result<(), StoreError> {
        self.post_rows(
            table,
            &[("on_conflict", key_field)],
            "resolution=merge-duplicates,return=minimal",
            &serde_json::Value::Array(rows),
        )
        .await
    }

    async fn append_chunks(&self, chunks: &[DataChunk]) -> Result<(), StoreError> {
        let body =
            serde_json::to_value(chunks).map_err(|e| StoreError::Write(e.to_string()))?;
        self.post_rows(CHUNK_TABLE, &[], "return=minimal", &body).await
    }
}
