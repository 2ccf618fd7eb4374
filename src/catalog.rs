// src/catalog.rs
// Catalog data model: one typed title entry plus the bounded, deduplicated,
// sorted collection the rest of the system reads.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Hard cap on catalog size for a single ingestion run.
pub const DEFAULT_MAX_TITLES: usize = 1000;

/// Categorical placeholder for absent type/status values.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Shown when the source carries no synopsis for a title.
pub const SYNOPSIS_PLACEHOLDER: &str = "No synopsis available.";

/// One catalog entry. Numeric fields stay `Option` so feature fitting can
/// distinguish "missing" from a real zero; display fallbacks (0.0, 0,
/// "Unknown") are applied by the accessors below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimeTitle {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    pub rating: Option<f64>,
    pub episodes: Option<u32>,
    pub members: Option<u64>,
    /// Ascending popularity rank from the source (1 = most popular).
    pub popularity: Option<u32>,
    pub year: Option<i32>,
    pub genres: BTreeSet<String>,
    pub synopsis: String,
}

impl AnimeTitle {
    /// Stable lookup key: the case-normalized name.
    pub fn key(&self) -> String {
        self.name.trim().to_lowercase()
    }

    pub fn rating_or_zero(&self) -> f64 {
        self.rating.unwrap_or(0.0)
    }

    /// Sort key for the popularity tie-break; unknown ranks sort as 0,
    /// matching the original fill-then-sort behavior.
    pub fn popularity_rank(&self) -> u32 {
        self.popularity.unwrap_or(0)
    }
}

/// Outcome of offering one title to the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Added,
    /// A title with the same case-insensitive name is already present.
    DuplicateName,
    /// The size cap was reached before this title.
    CapacityReached,
}

/// Accumulates titles during an ingestion run: first occurrence of a name
/// wins, the cap bounds the total, and `finish` applies the catalog order.
#[derive(Debug)]
pub struct CatalogBuilder {
    max_titles: usize,
    titles: Vec<AnimeTitle>,
    seen: HashSet<String>,
}

impl CatalogBuilder {
    pub fn new(max_titles: usize) -> Self {
        Self {
            max_titles,
            titles: Vec::new(),
            seen: HashSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.titles.len() >= self.max_titles
    }

    pub fn push(&mut self, title: AnimeTitle) -> PushOutcome {
        if self.is_full() {
            return PushOutcome::CapacityReached;
        }
        if !self.seen.insert(title.key()) {
            return PushOutcome::DuplicateName;
        }
        self.titles.push(title);
        PushOutcome::Added
    }

    /// Sorts by descending rating then ascending popularity rank and builds
    /// the lookup index. The sort is stable, so equal keys keep ingestion
    /// order.
    pub fn finish(mut self) -> Catalog {
        self.titles.sort_by(|a, b| {
            b.rating_or_zero()
                .total_cmp(&a.rating_or_zero())
                .then_with(|| a.popularity_rank().cmp(&b.popularity_rank()))
        });
        let by_key = self
            .titles
            .iter()
            .enumerate()
            .map(|(i, t)| (t.key(), i))
            .collect();
        Catalog {
            titles: self.titles,
            by_key,
        }
    }
}

/// The deduplicated, size-capped, ordered collection built by ingestion.
/// Immutable after construction; a refresh builds a whole new value.
#[derive(Debug, Default, Clone)]
pub struct Catalog {
    titles: Vec<AnimeTitle>,
    by_key: HashMap<String, usize>,
}

impl Catalog {
    /// Builds a catalog directly from a title list, applying the same
    /// dedup/cap/sort rules as ingestion. Mostly useful in tests and demos.
    pub fn from_titles(titles: Vec<AnimeTitle>, max_titles: usize) -> Self {
        let mut builder = CatalogBuilder::new(max_titles);
        for title in titles {
            let _ = builder.push(title);
        }
        builder.finish()
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    pub fn titles(&self) -> &[AnimeTitle] {
        &self.titles
    }

    pub fn get(&self, index: usize) -> Option<&AnimeTitle> {
        self.titles.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AnimeTitle> {
        self.titles.iter()
    }

    /// Case-insensitive exact-name lookup.
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.by_key.get(&name.trim().to_lowercase()).copied()
    }

    /// First `n` titles in catalog order (descending rating).
    pub fn top(&self, n: usize) -> &[AnimeTitle] {
        &self.titles[..n.min(self.titles.len())]
    }

    /// Every distinct genre present in the catalog.
    pub fn genres(&self) -> BTreeSet<String> {
        self.titles
            .iter()
            .flat_map(|t| t.genres.iter().cloned())
            .collect()
    }
}
