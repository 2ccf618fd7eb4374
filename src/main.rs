// src/main.rs
//! Anime Recommender — Binary Entrypoint
//! Boots the Axum HTTP server: configuration, the Prometheus recorder, one
//! boot-time catalog ingest, the periodic refresh scheduler, and the routes.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use anime_recommender::api::{create_router, AppState};
use anime_recommender::config;
use anime_recommender::ingest::jikan::JikanSource;
use anime_recommender::ingest::scheduler::spawn_refresh_scheduler;
use anime_recommender::ingest::PageIngestor;
use anime_recommender::metrics::Metrics;
use anime_recommender::store::CatalogStore;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = config::load_default().context("loading configuration")?;
    cfg.validate().context("validating configuration")?;

    let metrics = Metrics::init(cfg.ingest.max_items);

    let source =
        Arc::new(JikanSource::from_config(&cfg.source).context("building catalog source")?);
    let ingestor = Arc::new(PageIngestor::new(source, cfg.ingest.clone()));
    let store = Arc::new(CatalogStore::new(
        cfg.features.clone(),
        cfg.similarity.clone(),
    ));

    // Boot-time ingest. An empty or failed run is not fatal; the scheduler
    // and /admin/refresh can repair it later.
    match store.refresh(&ingestor).await {
        Ok(summary) => tracing::info!(
            titles = summary.titles,
            fingerprint = %summary.fingerprint,
            "boot catalog ready"
        ),
        Err(err) => tracing::warn!(error = %err, "boot ingest failed, serving empty catalog"),
    }

    spawn_refresh_scheduler(
        store.clone(),
        ingestor.clone(),
        cfg.ingest.refresh_interval(),
    );

    let state = AppState::new(store, ingestor, &cfg.similarity);
    let app = create_router(state).merge(metrics.router());

    let addr: std::net::SocketAddr = cfg
        .server
        .bind_addr
        .parse()
        .with_context(|| format!("parsing bind address {}", cfg.server.bind_addr))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, app).await.context("serving http")?;
    Ok(())
}
