// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod config;
pub mod fetch;
pub mod sources;
pub mod store;
pub mod sync;

// ---- Re-exports for stable public API ----
pub use crate::fetch::{FetchError, Fetcher, HttpResponse, HttpTransport, ReqwestTransport};
pub use crate::store::{
    memory::MemoryStore, rest::RestStore, PersistenceSink, StoreBackend, StoreError,
};
pub use crate::sync::backfill::BackfillEngine;
pub use crate::sync::scheduler::{Cadence, Scheduler, CADENCE_POLICY};
pub use crate::sync::types::{Collector, DataChunk, NormalizedEntity, SyncResult};
pub use crate::sync::{summarize, PassSummary, SyncOrchestrator};
