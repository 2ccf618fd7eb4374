// src/similarity/hybrid.rs
// Weighted blend of genre overlap, rating proximity, and type match.
// Works straight off catalog fields, independent of the feature index.

use serde::Serialize;

use crate::catalog::{AnimeTitle, Catalog};

/// Ratings are on a 0-10 scale.
pub const RATING_SCALE: f64 = 10.0;

/// Blend weights. The defaults are a fixed policy, not derived from data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HybridWeights {
    pub genre: f64,
    pub rating: f64,
    pub kind: f64,
}

impl Default for HybridWeights {
    fn default() -> Self {
        Self {
            genre: 0.6,
            rating: 0.25,
            kind: 0.15,
        }
    }
}

impl HybridWeights {
    pub fn sum(&self) -> f64 {
        self.genre + self.rating + self.kind
    }
}

/// Per-component similarity plus the weighted blend, all in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub genre: f64,
    pub rating: f64,
    pub kind: f64,
    pub combined: f64,
}

/// Jaccard overlap of the two genre sets; 0.0 when both are empty.
pub fn genre_similarity(a: &AnimeTitle, b: &AnimeTitle) -> f64 {
    let union = a.genres.union(&b.genres).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a.genres.intersection(&b.genres).count();
    intersection as f64 / union as f64
}

/// Closeness of ratings on the 0-10 scale; unknown ratings count as 0.0.
pub fn rating_similarity(a: &AnimeTitle, b: &AnimeTitle) -> f64 {
    let delta = (a.rating_or_zero() - b.rating_or_zero()).abs();
    (1.0 - delta / RATING_SCALE).clamp(0.0, 1.0)
}

/// Exact type match.
pub fn kind_similarity(a: &AnimeTitle, b: &AnimeTitle) -> f64 {
    if a.kind == b.kind {
        1.0
    } else {
        0.0
    }
}

pub fn score(a: &AnimeTitle, b: &AnimeTitle, weights: &HybridWeights) -> f64 {
    score_with_breakdown(a, b, weights).combined
}

pub fn score_with_breakdown(
    a: &AnimeTitle,
    b: &AnimeTitle,
    weights: &HybridWeights,
) -> ScoreBreakdown {
    let genre = genre_similarity(a, b);
    let rating = rating_similarity(a, b);
    let kind = kind_similarity(a, b);
    let sum = weights.sum();
    let combined = if sum > 0.0 {
        ((weights.genre * genre + weights.rating * rating + weights.kind * kind) / sum)
            .clamp(0.0, 1.0)
    } else {
        0.0
    };
    ScoreBreakdown {
        genre,
        rating,
        kind,
        combined,
    }
}

/// Top `n` candidates for the catalog row at `query`, descending by blended
/// score, the query row excluded. Equal scores keep catalog order. An
/// out-of-range query yields an empty list.
pub fn rank(
    catalog: &Catalog,
    query: usize,
    weights: &HybridWeights,
    n: usize,
) -> Vec<(usize, f64)> {
    let Some(query_title) = catalog.get(query) else {
        return Vec::new();
    };
    let mut ranked: Vec<(usize, f64)> = catalog
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != query)
        .map(|(i, candidate)| (i, score(query_title, candidate, weights)))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(n);
    ranked
}
