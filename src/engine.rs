// src/engine.rs
//! # Recommendation Engine
//! Orchestration over one catalog snapshot: resolve the query name, dispatch
//! to the requested similarity strategy, rank, truncate. Pure reads, no I/O.
//!
//! Policy: the nearest-neighbor strategy needs a fitted feature index. When
//! fitting failed (no usable numeric attribute in the whole catalog) the
//! engine answers with the hybrid scorer instead and reports the strategy it
//! actually used.

use serde::{Deserialize, Serialize};

use crate::catalog::{AnimeTitle, Catalog};
use crate::config::{FeatureConfig, SimilarityConfig};
use crate::error::RecommendError;
use crate::search::{self, SearchHit};
use crate::similarity::{hybrid, FeatureSpace, HybridWeights, NearestNeighborIndex, ScoreBreakdown};

/// Similarity strategy selector, as spelled in requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    #[serde(alias = "knn")]
    NearestNeighbor,
    #[default]
    Hybrid,
}

impl Strategy {
    pub fn label(self) -> &'static str {
        match self {
            Strategy::NearestNeighbor => "nearest-neighbor",
            Strategy::Hybrid => "hybrid",
        }
    }
}

/// One ranked entry for a query.
#[derive(Debug, Clone)]
pub struct Recommendation<'a> {
    pub index: usize,
    pub title: &'a AnimeTitle,
    pub score: f64,
}

/// The full answer for one recommend call.
#[derive(Debug, Clone)]
pub struct Ranked<'a> {
    pub query_index: usize,
    pub query: &'a AnimeTitle,
    /// The strategy that produced the scores; differs from the requested one
    /// only when the feature index was unavailable.
    pub strategy: Strategy,
    pub entries: Vec<Recommendation<'a>>,
}

pub struct RecommendationEngine {
    catalog: Catalog,
    weights: HybridWeights,
    default_limit: usize,
    index: Option<NearestNeighborIndex>,
}

impl RecommendationEngine {
    /// Builds the engine for one catalog snapshot. Feature fitting failure is
    /// not fatal here: nearest-neighbor queries fall back to hybrid scoring.
    pub fn build(
        catalog: Catalog,
        features: &FeatureConfig,
        similarity: &SimilarityConfig,
    ) -> Self {
        let index = match FeatureSpace::fit(&catalog, &features.attributes) {
            Ok(space) => Some(NearestNeighborIndex::build(space)),
            Err(err) => {
                if !catalog.is_empty() {
                    tracing::warn!(
                        target: "engine",
                        error = %err,
                        "feature fit failed, nearest-neighbor strategy disabled"
                    );
                }
                None
            }
        };
        Self {
            catalog,
            weights: similarity.weights(),
            default_limit: similarity.default_limit,
            index,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn len(&self) -> usize {
        self.catalog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }

    pub fn weights(&self) -> HybridWeights {
        self.weights
    }

    pub fn has_feature_index(&self) -> bool {
        self.index.is_some()
    }

    /// Names of the attributes that survived feature fitting, in vector
    /// order. Empty when the index is unavailable.
    pub fn feature_attributes(&self) -> Vec<&'static str> {
        self.index
            .as_ref()
            .map(|index| {
                index
                    .space()
                    .params()
                    .attributes()
                    .iter()
                    .map(|a| a.name())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Name matches for a query, for caller-side disambiguation.
    pub fn matches(&self, query: &str) -> Vec<SearchHit<'_>> {
        search::find_by_name(&self.catalog, query)
    }

    pub fn search(&self, needle: &str, min_rating: Option<f64>) -> Vec<SearchHit<'_>> {
        search::search(&self.catalog, needle, min_rating)
    }

    pub fn suggest(&self, query: &str, limit: usize) -> Vec<&str> {
        search::suggest(&self.catalog, query, limit)
    }

    pub fn top_titles(&self, n: usize) -> &[AnimeTitle] {
        self.catalog.top(n)
    }

    /// Hybrid component scores between two catalog rows.
    pub fn breakdown(&self, query: usize, candidate: usize) -> Option<ScoreBreakdown> {
        let q = self.catalog.get(query)?;
        let c = self.catalog.get(candidate)?;
        Some(hybrid::score_with_breakdown(q, c, &self.weights))
    }

    pub fn recommend(
        &self,
        query_name: &str,
        strategy: Strategy,
        limit: Option<usize>,
    ) -> Result<Ranked<'_>, RecommendError> {
        let query_index = search::resolve(&self.catalog, query_name)
            .ok_or_else(|| RecommendError::TitleNotFound(query_name.to_string()))?;
        let n = limit.unwrap_or(self.default_limit);

        let (strategy, scored) = match strategy {
            Strategy::NearestNeighbor => match &self.index {
                Some(index) => (Strategy::NearestNeighbor, index.scored(query_index, n)),
                None => {
                    tracing::warn!(
                        target: "engine",
                        query = query_name,
                        "feature index unavailable, answering with hybrid scores"
                    );
                    (
                        Strategy::Hybrid,
                        hybrid::rank(&self.catalog, query_index, &self.weights, n),
                    )
                }
            },
            Strategy::Hybrid => (
                Strategy::Hybrid,
                hybrid::rank(&self.catalog, query_index, &self.weights, n),
            ),
        };

        let entries = scored
            .into_iter()
            .filter_map(|(index, score)| {
                self.catalog.get(index).map(|title| Recommendation {
                    index,
                    title,
                    score,
                })
            })
            .collect();

        let query = self
            .catalog
            .get(query_index)
            .ok_or_else(|| RecommendError::TitleNotFound(query_name.to_string()))?;
        Ok(Ranked {
            query_index,
            query,
            strategy,
            entries,
        })
    }
}
