// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod search;
pub mod similarity;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::catalog::{AnimeTitle, Catalog, CatalogBuilder};
pub use crate::engine::{RecommendationEngine, Strategy};
pub use crate::error::RecommendError;
pub use crate::ingest::{CancelFlag, IngestRun, IngestStats, PageIngestor};
pub use crate::store::{CatalogStore, Snapshot};
