// src/search.rs
// Name resolution and catalog search used by the engine and the HTTP layer.

use strsim::normalized_levenshtein;

use crate::catalog::{AnimeTitle, Catalog};

/// Minimum normalized-levenshtein similarity for a "did you mean" entry.
const SUGGEST_THRESHOLD: f64 = 0.3;

/// One search result: catalog index plus a borrow of the matched title.
#[derive(Debug, Clone)]
pub struct SearchHit<'a> {
    pub index: usize,
    pub title: &'a AnimeTitle,
}

/// Case-insensitive substring match over names only, in catalog order.
/// A blank needle matches nothing.
pub fn find_by_name<'a>(catalog: &'a Catalog, needle: &str) -> Vec<SearchHit<'a>> {
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    catalog
        .iter()
        .enumerate()
        .filter(|(_, t)| t.name.to_lowercase().contains(&needle))
        .map(|(index, title)| SearchHit { index, title })
        .collect()
}

/// Resolves a query to a single catalog row: case-insensitive exact name
/// first, otherwise the first substring match in catalog order.
pub fn resolve(catalog: &Catalog, query: &str) -> Option<usize> {
    if let Some(idx) = catalog.position_of(query) {
        return Some(idx);
    }
    find_by_name(catalog, query).first().map(|hit| hit.index)
}

/// Broad search: the needle may occur in the name, a genre, or the synopsis.
/// `min_rating` drops rows whose rating (0.0 when unknown) falls below it.
pub fn search<'a>(
    catalog: &'a Catalog,
    needle: &str,
    min_rating: Option<f64>,
) -> Vec<SearchHit<'a>> {
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    catalog
        .iter()
        .enumerate()
        .filter(|(_, t)| {
            t.name.to_lowercase().contains(&needle)
                || t.genres.iter().any(|g| g.to_lowercase().contains(&needle))
                || t.synopsis.to_lowercase().contains(&needle)
        })
        .filter(|(_, t)| min_rating.map_or(true, |m| t.rating_or_zero() >= m))
        .map(|(index, title)| SearchHit { index, title })
        .collect()
}

/// Near-miss name suggestions for a query that matched nothing, best first.
pub fn suggest<'a>(catalog: &'a Catalog, query: &str, limit: usize) -> Vec<&'a str> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }
    let mut scored: Vec<(&str, f64)> = catalog
        .iter()
        .map(|t| {
            let sim = normalized_levenshtein(&query, &t.name.to_lowercase());
            (t.name.as_str(), sim)
        })
        .filter(|(_, sim)| *sim >= SUGGEST_THRESHOLD)
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(limit);
    scored.into_iter().map(|(name, _)| name).collect()
}
