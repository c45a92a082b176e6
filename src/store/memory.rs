// src/store/memory.rs
//! In-memory store backend for tests and dry runs. Rows live in a map keyed
//! by (table, natural key), so upserts overwrite in place exactly like the
//! real store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::store::{StoreBackend, StoreError};
use crate::sync::types::DataChunk;

#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<BTreeMap<(String, String), serde_json::Value>>,
    chunks: Mutex<Vec<DataChunk>>,
    fail_writes: AtomicBool,
    fail_chunks: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent upserts fail, to exercise the write-error path.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent chunk appends fail.
    pub fn set_fail_chunks(&self, fail: bool) {
        self.fail_chunks.store(fail, Ordering::SeqCst);
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().expect("memory store mutex poisoned").len()
    }

    pub fn get(&self, table: &str, key: &str) -> Option<serde_json::Value> {
        self.rows
            .lock()
            .expect("memory store mutex poisoned")
            .get(&(table.to_string(), key.to_string()))
            .cloned()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.lock().expect("memory store mutex poisoned").len()
    }

    pub fn chunks(&self) -> Vec<DataChunk> {
        self.chunks
            .lock()
            .expect("memory store mutex poisoned")
            .clone()
    }
}

#[async_trait]
impl StoreBackend for MemoryStore {
    async fn upsert(
        &self,
        table: &str,
        key_field: &str,
        rows: Vec<serde_json::Value>,
    ) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Write(format!("{table}: injected failure")));
        }
        let mut map = self.rows.lock().expect("memory store mutex poisoned");
        for row in rows {
            let key = row
                .get(key_field)
                .map(value_as_key)
                .ok_or_else(|| StoreError::Write(format!("{table}: row missing {key_field}")))?;
            map.insert((table.to_string(), key), row);
        }
        Ok(())
    }

    async fn append_chunks(&self, chunks: &[DataChunk]) -> Result<(), StoreError> {
        if self.fail_chunks.load(Ordering::SeqCst) {
            return Err(StoreError::Write("chunks: injected failure".into()));
        }
        self.chunks
            .lock()
            .expect("memory store mutex poisoned")
            .extend_from_slice(chunks);
        Ok(())
    }
}

fn value_as_key(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
