use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::catalog::AnimeTitle;
use crate::config::SimilarityConfig;
use crate::engine::Strategy;
use crate::error::RecommendError;
use crate::ingest::{IngestStats, PageIngestor};
use crate::similarity::ScoreBreakdown;
use crate::store::{CatalogStore, RefreshSummary};

#[derive(Clone)]
pub struct AppState {
    store: Arc<CatalogStore>,
    ingestor: Arc<PageIngestor>,
    default_limit: usize,
    max_limit: usize,
}

impl AppState {
    pub fn new(
        store: Arc<CatalogStore>,
        ingestor: Arc<PageIngestor>,
        similarity: &SimilarityConfig,
    ) -> Self {
        Self {
            store,
            ingestor,
            default_limit: similarity.default_limit,
            max_limit: similarity.max_limit,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/titles/top", get(top_titles))
        .route("/search", get(search))
        .route("/recommend", post(recommend))
        .route("/catalog/stats", get(catalog_stats))
        .route("/admin/refresh", post(admin_refresh))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct TopQuery {
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    min_rating: Option<f64>,
    #[serde(default)]
    min_members: Option<u64>,
}

async fn top_titles(
    State(state): State<AppState>,
    Query(q): Query<TopQuery>,
) -> Json<Vec<AnimeTitle>> {
    counter!("api_top_requests_total").increment(1);
    let snap = state.store.snapshot();
    let limit = q.limit.unwrap_or(20).min(state.max_limit);
    let out = snap
        .engine
        .catalog()
        .iter()
        .filter(|t| q.min_rating.map_or(true, |m| t.rating_or_zero() >= m))
        .filter(|t| q.min_members.map_or(true, |m| t.members.unwrap_or(0) >= m))
        .take(limit)
        .cloned()
        .collect();
    Json(out)
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    q: String,
    #[serde(default)]
    min_rating: Option<f64>,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct SearchResp {
    count: usize,
    results: Vec<AnimeTitle>,
    /// "Did you mean" names, only present when nothing matched.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    suggestions: Vec<String>,
}

async fn search(State(state): State<AppState>, Query(q): Query<SearchQuery>) -> Json<SearchResp> {
    counter!("api_search_requests_total").increment(1);
    let snap = state.store.snapshot();
    let limit = q.limit.unwrap_or(state.max_limit).min(state.max_limit);
    let results: Vec<AnimeTitle> = snap
        .engine
        .search(&q.q, q.min_rating)
        .iter()
        .take(limit)
        .map(|hit| hit.title.clone())
        .collect();
    let suggestions = if results.is_empty() {
        snap.engine
            .suggest(&q.q, 5)
            .into_iter()
            .map(|s| s.to_string())
            .collect()
    } else {
        Vec::new()
    };
    Json(SearchResp {
        count: results.len(),
        results,
        suggestions,
    })
}

#[derive(Debug, Deserialize)]
struct RecommendReq {
    title: String,
    #[serde(default)]
    strategy: Strategy,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct RecommendEntry {
    title: AnimeTitle,
    score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    breakdown: Option<ScoreBreakdown>,
}

#[derive(Debug, Serialize)]
struct RecommendResp {
    /// The resolved catalog name, which may differ from the raw query.
    query: String,
    /// The strategy that produced the scores.
    strategy: Strategy,
    results: Vec<RecommendEntry>,
}

async fn recommend(
    State(state): State<AppState>,
    Json(body): Json<RecommendReq>,
) -> Result<Json<RecommendResp>, RecommendError> {
    counter!("api_recommend_requests_total").increment(1);
    let snap = state.store.snapshot();
    if snap.engine.is_empty() {
        return Err(RecommendError::EmptyCatalog);
    }
    let limit = body.limit.unwrap_or(state.default_limit).min(state.max_limit);
    let ranked = snap.engine.recommend(&body.title, body.strategy, Some(limit))?;

    let results = ranked
        .entries
        .iter()
        .map(|entry| RecommendEntry {
            title: entry.title.clone(),
            score: entry.score,
            breakdown: match ranked.strategy {
                Strategy::Hybrid => snap.engine.breakdown(ranked.query_index, entry.index),
                Strategy::NearestNeighbor => None,
            },
        })
        .collect();

    Ok(Json(RecommendResp {
        query: ranked.query.name.clone(),
        strategy: ranked.strategy,
        results,
    }))
}

#[derive(Debug, Serialize)]
struct StatsResp {
    titles: usize,
    refreshed_at: Option<DateTime<Utc>>,
    fingerprint: String,
    genres: usize,
    feature_attributes: Vec<&'static str>,
    nearest_neighbor_ready: bool,
    ingest: IngestStats,
}

async fn catalog_stats(State(state): State<AppState>) -> Json<StatsResp> {
    let snap = state.store.snapshot();
    Json(StatsResp {
        titles: snap.engine.len(),
        refreshed_at: snap.refreshed_at,
        fingerprint: snap.fingerprint.clone(),
        genres: snap.engine.catalog().genres().len(),
        feature_attributes: snap.engine.feature_attributes(),
        nearest_neighbor_ready: snap.engine.has_feature_index(),
        ingest: snap.stats.clone(),
    })
}

async fn admin_refresh(
    State(state): State<AppState>,
) -> Result<Json<RefreshSummary>, RecommendError> {
    counter!("api_refresh_requests_total").increment(1);
    let summary = state.store.refresh(&state.ingestor).await?;
    Ok(Json(summary))
}
