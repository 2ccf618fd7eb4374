// src/similarity/features.rs
// Numeric feature extraction and normalization: mean imputation for missing
// values, then population z-score standardization per attribute.

use serde::Serialize;

use crate::catalog::{AnimeTitle, Catalog};
use crate::error::RecommendError;

/// Numeric attributes that can participate in the feature space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericAttribute {
    Rating,
    Members,
    Episodes,
    Popularity,
}

impl NumericAttribute {
    pub const ALL: [NumericAttribute; 4] = [
        NumericAttribute::Rating,
        NumericAttribute::Members,
        NumericAttribute::Episodes,
        NumericAttribute::Popularity,
    ];

    /// Accepts config spellings; "score" is an alias for the rating column.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "rating" | "score" => Some(Self::Rating),
            "members" => Some(Self::Members),
            "episodes" => Some(Self::Episodes),
            "popularity" => Some(Self::Popularity),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Rating => "rating",
            Self::Members => "members",
            Self::Episodes => "episodes",
            Self::Popularity => "popularity",
        }
    }

    pub fn extract(self, title: &AnimeTitle) -> Option<f64> {
        match self {
            Self::Rating => title.rating,
            Self::Members => title.members.map(|m| m as f64),
            Self::Episodes => title.episodes.map(f64::from),
            Self::Popularity => title.popularity.map(f64::from),
        }
    }
}

/// Standardization parameters learned from one catalog. Attributes where
/// every row was missing are not represented here.
#[derive(Debug, Clone)]
pub struct NormalizationParams {
    attributes: Vec<NumericAttribute>,
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl NormalizationParams {
    pub fn attributes(&self) -> &[NumericAttribute] {
        &self.attributes
    }

    /// Standardizes one title against the learned parameters. Missing values
    /// take the column mean; zero-variance columns map to 0.0.
    pub fn transform(&self, title: &AnimeTitle) -> Vec<f64> {
        (0..self.attributes.len())
            .map(|i| {
                let mean = self.means[i];
                let scale = self.scales[i];
                let value = self.attributes[i].extract(title).unwrap_or(mean);
                if scale > 0.0 {
                    (value - mean) / scale
                } else {
                    0.0
                }
            })
            .collect()
    }
}

/// The standardized vectors for a whole catalog, row-aligned with catalog
/// indices.
#[derive(Debug, Clone)]
pub struct FeatureSpace {
    params: NormalizationParams,
    vectors: Vec<Vec<f64>>,
}

impl FeatureSpace {
    /// Learns means and scales from the catalog and standardizes every row.
    /// Unknown attribute names are skipped with a warning; attributes missing
    /// in every row are dropped. Fails only when no attribute survives.
    pub fn fit(catalog: &Catalog, requested: &[String]) -> Result<Self, RecommendError> {
        let mut candidates = Vec::new();
        for name in requested {
            match NumericAttribute::from_name(name) {
                Some(attr) if !candidates.contains(&attr) => candidates.push(attr),
                Some(_) => {}
                None => tracing::warn!(
                    target: "features",
                    attribute = %name,
                    "unknown numeric attribute, skipping"
                ),
            }
        }

        let rows = catalog.len();
        let mut attributes = Vec::new();
        let mut means = Vec::new();
        let mut scales = Vec::new();

        for attr in candidates {
            let present: Vec<f64> = catalog.iter().filter_map(|t| attr.extract(t)).collect();
            if present.is_empty() {
                tracing::warn!(
                    target: "features",
                    attribute = attr.name(),
                    "attribute missing in every row, dropping"
                );
                continue;
            }
            let mean = present.iter().sum::<f64>() / present.len() as f64;
            // Imputed rows equal the mean and add nothing to the numerator;
            // the divisor is still the full row count (population variance).
            let variance = present.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / rows as f64;
            attributes.push(attr);
            means.push(mean);
            scales.push(variance.sqrt());
        }

        if attributes.is_empty() {
            return Err(RecommendError::NoFeatures);
        }

        let params = NormalizationParams {
            attributes,
            means,
            scales,
        };
        let vectors = catalog.iter().map(|t| params.transform(t)).collect();
        Ok(Self { params, vectors })
    }

    pub fn params(&self) -> &NormalizationParams {
        &self.params
    }

    pub fn vectors(&self) -> &[Vec<f64>] {
        &self.vectors
    }

    pub fn vector(&self, index: usize) -> Option<&[f64]> {
        self.vectors.get(index).map(Vec::as_slice)
    }

    pub fn dimensions(&self) -> usize {
        self.params.attributes.len()
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn title(name: &str, rating: Option<f64>, members: Option<u64>) -> AnimeTitle {
        AnimeTitle {
            name: name.to_string(),
            kind: "TV".to_string(),
            status: "Finished Airing".to_string(),
            rating,
            episodes: None,
            members,
            popularity: None,
            year: None,
            genres: BTreeSet::new(),
            synopsis: String::new(),
        }
    }

    fn catalog_with_ratings(ratings: &[f64]) -> Catalog {
        let titles = ratings
            .iter()
            .enumerate()
            .map(|(i, r)| title(&format!("t{i}"), Some(*r), None))
            .collect();
        Catalog::from_titles(titles, 100)
    }

    #[test]
    fn population_z_scores() {
        // mean 5, population variance 4, stdev 2
        let catalog = catalog_with_ratings(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        let space = FeatureSpace::fit(&catalog, &["rating".to_string()]).unwrap();

        let low = catalog.position_of("t0").unwrap();
        let high = catalog.position_of("t7").unwrap();
        assert!((space.vector(low).unwrap()[0] - (-1.5)).abs() < 1e-9);
        assert!((space.vector(high).unwrap()[0] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn missing_value_standardizes_to_zero() {
        let titles = vec![
            title("a", Some(4.0), None),
            title("b", None, None),
            title("c", Some(8.0), None),
        ];
        let catalog = Catalog::from_titles(titles, 100);
        let space = FeatureSpace::fit(&catalog, &["rating".to_string()]).unwrap();
        let idx = catalog.position_of("b").unwrap();
        assert_eq!(space.vector(idx).unwrap()[0], 0.0);
    }

    #[test]
    fn zero_variance_column_is_all_zero() {
        let catalog = catalog_with_ratings(&[6.0, 6.0, 6.0]);
        let space = FeatureSpace::fit(&catalog, &["rating".to_string()]).unwrap();
        assert!(space.vectors().iter().all(|v| v[0] == 0.0));
    }

    #[test]
    fn all_missing_attribute_is_dropped() {
        let titles = vec![title("a", Some(4.0), None), title("b", Some(6.0), None)];
        let catalog = Catalog::from_titles(titles, 100);
        let space =
            FeatureSpace::fit(&catalog, &["members".to_string(), "rating".to_string()]).unwrap();
        assert_eq!(space.dimensions(), 1);
        assert_eq!(space.params().attributes(), &[NumericAttribute::Rating]);
    }

    #[test]
    fn no_surviving_attribute_is_an_error() {
        let titles = vec![title("a", None, None), title("b", None, None)];
        let catalog = Catalog::from_titles(titles, 100);
        let err = FeatureSpace::fit(&catalog, &["members".to_string()]).unwrap_err();
        assert!(matches!(err, RecommendError::NoFeatures));
    }

    #[test]
    fn score_alias_and_unknown_names() {
        let catalog = catalog_with_ratings(&[1.0, 2.0]);
        let space =
            FeatureSpace::fit(&catalog, &["score".to_string(), "bogus".to_string()]).unwrap();
        assert_eq!(space.params().attributes(), &[NumericAttribute::Rating]);
    }
}
