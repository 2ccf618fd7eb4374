// src/store.rs
//! Shared catalog state: an atomically swappable snapshot of the engine plus
//! freshness metadata. Readers clone an `Arc` and keep one consistent
//! generation for as long as they hold it; a refresh never mixes old and new
//! rows.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use serde::Serialize;

use crate::catalog::Catalog;
use crate::config::{FeatureConfig, SimilarityConfig};
use crate::engine::RecommendationEngine;
use crate::error::RecommendError;
use crate::ingest::{IngestStats, PageIngestor};

/// One immutable generation of catalog + engine.
pub struct Snapshot {
    pub engine: RecommendationEngine,
    /// None until the first successful refresh.
    pub refreshed_at: Option<DateTime<Utc>>,
    pub fingerprint: String,
    pub stats: IngestStats,
}

/// What a successful refresh reports back.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshSummary {
    pub titles: usize,
    pub fingerprint: String,
    pub refreshed_at: DateTime<Utc>,
    pub stats: IngestStats,
}

pub struct CatalogStore {
    features: FeatureConfig,
    similarity: SimilarityConfig,
    current: RwLock<Arc<Snapshot>>,
}

impl CatalogStore {
    /// Starts empty; the first successful refresh installs real data.
    pub fn new(features: FeatureConfig, similarity: SimilarityConfig) -> Self {
        let empty = Snapshot {
            engine: RecommendationEngine::build(Catalog::default(), &features, &similarity),
            refreshed_at: None,
            fingerprint: String::new(),
            stats: IngestStats::default(),
        };
        Self {
            features,
            similarity,
            current: RwLock::new(Arc::new(empty)),
        }
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.read().expect("snapshot lock poisoned").clone()
    }

    /// Runs one ingest and swaps the snapshot in a single write. An empty
    /// result keeps the previous snapshot and surfaces `EmptyCatalog` so the
    /// caller decides whether to retry.
    pub async fn refresh(&self, ingestor: &PageIngestor) -> Result<RefreshSummary, RecommendError> {
        let run = ingestor.ingest().await;
        if run.catalog.is_empty() {
            counter!("catalog_refresh_failures_total").increment(1);
            return Err(RecommendError::EmptyCatalog);
        }

        let fingerprint = fingerprint(&run.catalog);
        let refreshed_at = Utc::now();
        let titles = run.catalog.len();
        let engine = RecommendationEngine::build(run.catalog, &self.features, &self.similarity);
        let snapshot = Arc::new(Snapshot {
            engine,
            refreshed_at: Some(refreshed_at),
            fingerprint: fingerprint.clone(),
            stats: run.stats.clone(),
        });

        *self.current.write().expect("snapshot lock poisoned") = snapshot;

        counter!("catalog_refresh_total").increment(1);
        gauge!("catalog_titles").set(titles as f64);
        tracing::info!(
            target: "store",
            titles,
            fingerprint = %fingerprint,
            "catalog snapshot swapped"
        );

        Ok(RefreshSummary {
            titles,
            fingerprint,
            refreshed_at,
            stats: run.stats,
        })
    }
}

/// Order-sensitive digest of the catalog keys, for cheap change detection.
pub fn fingerprint(catalog: &Catalog) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    for title in catalog.iter() {
        hasher.update(title.key().as_bytes());
        hasher.update([0u8]);
    }
    let digest = hasher.finalize();
    let mut out = String::with_capacity(16);
    for b in digest.iter().take(8) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
