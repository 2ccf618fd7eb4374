// src/ingest/mod.rs
pub mod jikan;
pub mod retry;
pub mod scheduler;
pub mod source;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram,
};
use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::catalog::{Catalog, CatalogBuilder, PushOutcome};
use crate::config::IngestConfig;

use self::retry::{fetch_page_with_retry, PageFetch, Sleeper, TokioSleeper};
use self::source::{parse_record, CatalogSource, RawPage};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_pages_total", "Pages fetched successfully.");
        describe_counter!(
            "ingest_page_retries_total",
            "Page fetch retries after transient source errors."
        );
        describe_counter!(
            "ingest_pages_abandoned_total",
            "Pages abandoned after exhausting the retry budget."
        );
        describe_counter!("ingest_titles_total", "Titles kept in the catalog.");
        describe_counter!(
            "ingest_malformed_total",
            "Records skipped as malformed."
        );
        describe_counter!(
            "ingest_dedup_total",
            "Records dropped as duplicate names."
        );
        describe_counter!("ingest_runs_total", "Completed ingest runs.");
        describe_histogram!("ingest_run_seconds", "Wall-clock duration of one ingest run.");
        describe_gauge!(
            "ingest_pipeline_last_run_ts",
            "Unix ts when the ingest pipeline last ran."
        );
    });
}

/// Cooperative cancellation for an in-flight ingest run. Raising the flag
/// stops new page fetches; items already collected are still returned.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Accounting for one ingest run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct IngestStats {
    pub fetch_calls: u64,
    pub pages_fetched: u64,
    pub pages_abandoned: u64,
    pub retries: u64,
    pub titles_kept: u64,
    pub malformed_skipped: u64,
    pub duplicates_skipped: u64,
    pub cancelled: bool,
}

/// Result of one ingest run: the catalog plus how it was assembled.
#[derive(Debug)]
pub struct IngestRun {
    pub catalog: Catalog,
    pub stats: IngestStats,
}

/// Sequential paginated ingestor. Fetches pages 1..=max_pages from the
/// source, retrying transient failures per page, pacing successful requests,
/// deduplicating by case-insensitive name, and stopping once the size cap is
/// reached. Abandoned pages degrade completeness but never abort the run.
pub struct PageIngestor {
    source: Arc<dyn CatalogSource>,
    cfg: IngestConfig,
    sleeper: Arc<dyn Sleeper>,
}

impl PageIngestor {
    pub fn new(source: Arc<dyn CatalogSource>, cfg: IngestConfig) -> Self {
        Self::with_sleeper(source, cfg, Arc::new(TokioSleeper))
    }

    /// Injects a sleep implementation; tests use recording or no-op sleepers
    /// to observe pacing without real delays.
    pub fn with_sleeper(
        source: Arc<dyn CatalogSource>,
        cfg: IngestConfig,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            source,
            cfg,
            sleeper,
        }
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    pub async fn ingest(&self) -> IngestRun {
        self.ingest_with_cancel(&CancelFlag::new()).await
    }

    pub async fn ingest_with_cancel(&self, cancel: &CancelFlag) -> IngestRun {
        ensure_metrics_described();
        let started = std::time::Instant::now();
        let policy = self.cfg.retry_policy();
        let mut builder = CatalogBuilder::new(self.cfg.max_items);
        let mut stats = IngestStats::default();

        'pages: for page in 1..=self.cfg.max_pages {
            if cancel.is_cancelled() {
                stats.cancelled = true;
                tracing::info!(target: "ingest", page, "cancelled before page fetch");
                break;
            }

            let outcome = fetch_page_with_retry(
                self.source.as_ref(),
                page,
                self.cfg.page_size,
                &policy,
                self.sleeper.as_ref(),
                cancel,
            )
            .await;

            match outcome {
                PageFetch::Fetched {
                    page: raw,
                    attempts,
                } => {
                    stats.fetch_calls += u64::from(attempts);
                    stats.retries += u64::from(attempts - 1);
                    stats.pages_fetched += 1;
                    counter!("ingest_pages_total").increment(1);

                    let RawPage {
                        records,
                        has_next_page,
                    } = raw;
                    let record_count = records.len();
                    for record in records {
                        if builder.is_full() {
                            break;
                        }
                        match parse_record(record) {
                            Ok(title) => match builder.push(title) {
                                PushOutcome::Added => stats.titles_kept += 1,
                                PushOutcome::DuplicateName => {
                                    stats.duplicates_skipped += 1;
                                    counter!("ingest_dedup_total").increment(1);
                                }
                                PushOutcome::CapacityReached => break,
                            },
                            Err(err) => {
                                stats.malformed_skipped += 1;
                                counter!("ingest_malformed_total").increment(1);
                                tracing::debug!(
                                    target: "ingest",
                                    page,
                                    error = %err,
                                    "skipping malformed record"
                                );
                            }
                        }
                    }
                    tracing::debug!(
                        target: "ingest",
                        page,
                        records = record_count,
                        kept = builder.len(),
                        "page ingested"
                    );

                    if builder.is_full() {
                        tracing::info!(
                            target: "ingest",
                            page,
                            total = builder.len(),
                            "catalog capacity reached"
                        );
                        break 'pages;
                    }
                    if has_next_page == Some(false) {
                        tracing::info!(target: "ingest", page, "source reports no further pages");
                        break 'pages;
                    }
                    // Politeness pacing between successful requests.
                    if page < self.cfg.max_pages {
                        self.sleeper.pause(self.cfg.page_delay()).await;
                    }
                }
                PageFetch::Abandoned {
                    attempts,
                    last_error,
                } => {
                    stats.fetch_calls += u64::from(attempts);
                    stats.retries += u64::from(attempts.saturating_sub(1));
                    stats.pages_abandoned += 1;
                    counter!("ingest_pages_abandoned_total").increment(1);
                    tracing::warn!(
                        target: "ingest",
                        page,
                        attempts,
                        error = %last_error,
                        "skipping page, continuing with the rest"
                    );
                }
                PageFetch::Cancelled { attempts } => {
                    stats.fetch_calls += u64::from(attempts);
                    stats.cancelled = true;
                    break 'pages;
                }
            }
        }

        let catalog = builder.finish();

        counter!("ingest_titles_total").increment(stats.titles_kept);
        counter!("ingest_runs_total").increment(1);
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        gauge!("ingest_pipeline_last_run_ts").set(now as f64);
        histogram!("ingest_run_seconds").record(started.elapsed().as_secs_f64());

        tracing::info!(
            target: "ingest",
            source = self.source.name(),
            titles = stats.titles_kept,
            pages = stats.pages_fetched,
            abandoned = stats.pages_abandoned,
            retries = stats.retries,
            malformed = stats.malformed_skipped,
            duplicates = stats.duplicates_skipped,
            cancelled = stats.cancelled,
            "ingest run complete"
        );

        IngestRun { catalog, stats }
    }
}
