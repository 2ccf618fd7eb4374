// src/similarity/mod.rs
pub mod features;
pub mod hybrid;
pub mod knn;

pub use features::{FeatureSpace, NormalizationParams, NumericAttribute};
pub use hybrid::{HybridWeights, ScoreBreakdown};
pub use knn::{NearestNeighborIndex, Neighbor};
