// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - GET /titles/top (limit + rating floor)
// - POST /recommend (hybrid breakdowns, knn, unknown title)
// - GET /search (hits and "did you mean" suggestions)
// - GET /catalog/stats
// - POST /admin/refresh

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::Request,
    Router,
};
use http::StatusCode;
use serde_json::json;
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use anime_recommender::config::{FeatureConfig, IngestConfig, SimilarityConfig};
use anime_recommender::ingest::retry::Sleeper;
use anime_recommender::ingest::source::{CatalogSource, RawPage, SourceError};
use anime_recommender::store::CatalogStore;
use anime_recommender::{create_router, AppState, PageIngestor};

const BODY_LIMIT: usize = 1 * 1024 * 1024; // 1MB, safe for tests

struct NoopSleeper;

#[async_trait]
impl Sleeper for NoopSleeper {
    async fn pause(&self, _duration: Duration) {}
}

/// One fixed page of five fully populated titles.
struct FixedSource;

#[async_trait]
impl CatalogSource for FixedSource {
    async fn fetch_page(&self, _page: u32, _per_page: u32) -> Result<RawPage, SourceError> {
        let records = vec![
            json!({
                "title": "Steel Alchemist", "score": 9.1, "type": "TV",
                "episodes": 64, "members": 3_000_000u64, "popularity": 1,
                "genres": [{ "name": "Action" }, { "name": "Adventure" }],
                "synopsis": "Two brothers chase a way to undo one mistake."
            }),
            json!({
                "title": "Laughing Samurai", "score": 9.0, "type": "TV",
                "episodes": 201, "members": 1_800_000u64, "popularity": 5,
                "genres": [{ "name": "Action" }, { "name": "Comedy" }],
                "synopsis": "Odd jobs, debts, and swordplay."
            }),
            json!({
                "title": "Quiet Clinic", "score": 8.7, "type": "TV",
                "episodes": 74, "members": 900_000u64, "popularity": 9,
                "genres": [{ "name": "Drama" }, { "name": "Mystery" }],
                "synopsis": "A surgeon follows a trail he started."
            }),
            json!({
                "title": "Paper Rockets", "score": 8.2, "type": "TV",
                "episodes": 26, "members": 400_000u64, "popularity": 30,
                "genres": [{ "name": "Drama" }, { "name": "Sci-Fi" }],
                "synopsis": "A space program built from scrap."
            }),
            json!({
                "title": "Neon Couriers", "score": 7.4, "type": "TV",
                "episodes": 13, "members": 250_000u64, "popularity": 77,
                "genres": [{ "name": "Action" }, { "name": "Sci-Fi" }],
                "synopsis": "Deliveries across a flooded city."
            }),
        ];
        Ok(RawPage {
            records,
            has_next_page: Some(false),
        })
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

/// Build the same Router the binary uses, seeded with the fixed catalog.
async fn test_router() -> Router {
    let similarity = SimilarityConfig::default();
    let store = Arc::new(CatalogStore::new(
        FeatureConfig::default(),
        similarity.clone(),
    ));
    let ingestor = Arc::new(PageIngestor::with_sleeper(
        Arc::new(FixedSource),
        IngestConfig {
            max_pages: 1,
            page_delay_ms: 0,
            ..IngestConfig::default()
        },
        Arc::new(NoopSleeper),
    ));
    store.refresh(&ingestor).await.expect("seed catalog");
    create_router(AppState::new(store, ingestor, &similarity))
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Json) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build GET request");
    let resp = app.oneshot(req).await.expect("oneshot GET");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    let v: Json = serde_json::from_slice(&bytes).expect("parse json body");
    (status, v)
}

async fn post_json(app: Router, uri: &str, payload: Json) -> (StatusCode, Json) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST request");
    let resp = app.oneshot(req).await.expect("oneshot POST");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    let v: Json = serde_json::from_slice(&bytes).expect("parse json body");
    (status, v)
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let app = test_router().await;

    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");

    let resp = app.oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK, "health should be 200");

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    let body = String::from_utf8(bytes).expect("utf8");
    assert_eq!(body, "ok", "health body should be 'ok'");
}

#[tokio::test]
async fn api_top_respects_limit_and_rating_floor() {
    let (status, v) = get_json(test_router().await, "/titles/top?limit=2").await;
    assert_eq!(status, StatusCode::OK);
    let arr = v.as_array().expect("top response must be an array");
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["name"], "Steel Alchemist", "highest rating first");

    let (_, v) = get_json(test_router().await, "/titles/top?min_rating=9.0").await;
    assert_eq!(v.as_array().expect("array").len(), 2);

    let (_, v) = get_json(test_router().await, "/titles/top?min_members=1000000").await;
    assert_eq!(v.as_array().expect("array").len(), 2);
}

#[tokio::test]
async fn api_recommend_scores_with_hybrid_breakdowns() {
    let payload = json!({ "title": "steel alch", "limit": 3 });
    let (status, v) = post_json(test_router().await, "/recommend", payload).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(v["query"], "Steel Alchemist", "query resolves by substring");
    assert_eq!(v["strategy"], "hybrid");
    let results = v["results"].as_array().expect("results array");
    assert_eq!(results.len(), 3);
    for entry in results {
        assert!(entry.get("title").is_some(), "missing 'title'");
        assert!(entry["score"].as_f64().is_some(), "missing 'score'");
        let breakdown = entry.get("breakdown").expect("hybrid carries breakdowns");
        for part in ["genre", "rating", "kind", "combined"] {
            assert!(breakdown.get(part).is_some(), "breakdown missing '{part}'");
        }
    }
}

#[tokio::test]
async fn api_recommend_accepts_the_knn_spelling() {
    let payload = json!({ "title": "Quiet Clinic", "strategy": "knn", "limit": 2 });
    let (status, v) = post_json(test_router().await, "/recommend", payload).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(v["strategy"], "nearest-neighbor");
    let results = v["results"].as_array().expect("results array");
    assert_eq!(results.len(), 2);
    // Distance scores carry no per-component breakdown.
    assert!(results[0].get("breakdown").is_none());
}

#[tokio::test]
async fn api_recommend_unknown_title_is_404() {
    let payload = json!({ "title": "zzz nothing like this" });
    let (status, v) = post_json(test_router().await, "/recommend", payload).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let msg = v["error"].as_str().expect("error message");
    assert!(
        msg.contains("no catalog entry matches"),
        "unexpected error body: {msg}"
    );
}

#[tokio::test]
async fn api_search_returns_hits_or_suggestions() {
    let (status, v) = get_json(test_router().await, "/search?q=drama").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["count"], 2, "two titles carry the drama genre");
    assert!(v.get("suggestions").is_none(), "hits suppress suggestions");

    let (status, v) = get_json(test_router().await, "/search?q=stel%20alchemist").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["count"], 0);
    let suggestions = v["suggestions"].as_array().expect("suggestions on a miss");
    assert_eq!(suggestions[0], "Steel Alchemist");
}

#[tokio::test]
async fn api_stats_reports_catalog_shape() {
    let (status, v) = get_json(test_router().await, "/catalog/stats").await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(v["titles"], 5);
    assert_eq!(v["genres"], 6);
    assert_eq!(v["nearest_neighbor_ready"], true);
    assert_eq!(v["fingerprint"].as_str().expect("fingerprint").len(), 16);
    assert_eq!(
        v["feature_attributes"].as_array().expect("attributes").len(),
        4
    );
    assert!(v["refreshed_at"].is_string(), "refresh timestamp present");
    assert_eq!(v["ingest"]["titles_kept"], 5);
}

#[tokio::test]
async fn api_admin_refresh_reports_a_summary() {
    let app = test_router().await;
    let (status, v) = post_json(app, "/admin/refresh", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["titles"], 5);
    assert_eq!(v["fingerprint"].as_str().expect("fingerprint").len(), 16);
    assert_eq!(v["stats"]["pages_fetched"], 1);
}
