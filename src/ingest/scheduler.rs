// src/ingest/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::ingest::PageIngestor;
use crate::store::CatalogStore;

/// Spawn a background task that re-ingests the catalog on a fixed interval.
/// The boot refresh has already run by the time this is called, so the
/// interval's immediate first tick is consumed before the loop.
pub fn spawn_refresh_scheduler(
    store: Arc<CatalogStore>,
    ingestor: Arc<PageIngestor>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match store.refresh(&ingestor).await {
                Ok(summary) => {
                    tracing::info!(
                        target: "ingest",
                        titles = summary.titles,
                        fingerprint = %summary.fingerprint,
                        "scheduled refresh tick"
                    );
                }
                Err(err) => {
                    tracing::warn!(
                        target: "ingest",
                        error = %err,
                        "scheduled refresh failed, keeping previous catalog"
                    );
                }
            }
        }
    })
}
