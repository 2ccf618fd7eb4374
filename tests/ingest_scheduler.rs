// tests/ingest_scheduler.rs
//
// The background scheduler re-ingests on its interval. Runs on a paused
// tokio clock, so "waiting an hour" costs nothing.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use anime_recommender::config::{FeatureConfig, IngestConfig, SimilarityConfig};
use anime_recommender::ingest::retry::Sleeper;
use anime_recommender::ingest::scheduler::spawn_refresh_scheduler;
use anime_recommender::ingest::source::{CatalogSource, RawPage, SourceError};
use anime_recommender::store::CatalogStore;
use anime_recommender::PageIngestor;

struct NoopSleeper;

#[async_trait]
impl Sleeper for NoopSleeper {
    async fn pause(&self, _duration: Duration) {}
}

/// Answers one page per run and counts the runs.
struct CountingSource {
    runs: AtomicU32,
}

#[async_trait]
impl CatalogSource for CountingSource {
    async fn fetch_page(&self, _page: u32, _per_page: u32) -> Result<RawPage, SourceError> {
        let run = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(RawPage {
            records: vec![json!({
                "title": format!("Run {run}"),
                "score": 8.0,
                "type": "TV",
            })],
            has_next_page: Some(false),
        })
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

#[tokio::test(start_paused = true)]
async fn scheduler_ticks_refresh_the_snapshot() {
    let source = Arc::new(CountingSource {
        runs: AtomicU32::new(0),
    });
    let ingestor = Arc::new(PageIngestor::with_sleeper(
        source.clone(),
        IngestConfig {
            max_pages: 1,
            page_delay_ms: 0,
            ..IngestConfig::default()
        },
        Arc::new(NoopSleeper),
    ));
    let store = Arc::new(CatalogStore::new(
        FeatureConfig::default(),
        SimilarityConfig::default(),
    ));
    assert!(store.snapshot().refreshed_at.is_none(), "starts empty");

    let handle = spawn_refresh_scheduler(
        store.clone(),
        ingestor.clone(),
        Duration::from_secs(3600),
    );

    // The immediate first tick is swallowed; no refresh before the interval.
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(source.runs.load(Ordering::SeqCst), 0);

    tokio::time::sleep(Duration::from_secs(3600)).await;
    let first = store.snapshot();
    assert_eq!(source.runs.load(Ordering::SeqCst), 1);
    assert!(first.refreshed_at.is_some());
    assert!(first.engine.catalog().position_of("Run 1").is_some());

    tokio::time::sleep(Duration::from_secs(3600)).await;
    let second = store.snapshot();
    assert_eq!(source.runs.load(Ordering::SeqCst), 2);
    assert_ne!(first.fingerprint, second.fingerprint, "new generation");

    handle.abort();
}
