// src/similarity/knn.rs
// Brute-force exact nearest neighbors over the standardized feature space.

use crate::similarity::features::FeatureSpace;

/// One neighbor: catalog index plus Euclidean distance from the query row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    pub distance: f64,
}

/// Exact nearest-neighbor lookup, owning the fitted feature space.
#[derive(Debug, Clone)]
pub struct NearestNeighborIndex {
    space: FeatureSpace,
}

impl NearestNeighborIndex {
    pub fn build(space: FeatureSpace) -> Self {
        Self { space }
    }

    pub fn space(&self) -> &FeatureSpace {
        &self.space
    }

    pub fn len(&self) -> usize {
        self.space.len()
    }

    pub fn is_empty(&self) -> bool {
        self.space.is_empty()
    }

    /// The `k` rows closest to `target`, ascending by distance, the target
    /// row itself excluded. Equal distances keep catalog order. An
    /// out-of-range target yields an empty list.
    pub fn query(&self, target: usize, k: usize) -> Vec<Neighbor> {
        let Some(origin) = self.space.vector(target) else {
            return Vec::new();
        };
        let mut neighbors: Vec<Neighbor> = self
            .space
            .vectors()
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != target)
            .map(|(i, v)| Neighbor {
                index: i,
                distance: euclidean(origin, v),
            })
            .collect();
        neighbors.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        neighbors.truncate(k);
        neighbors
    }

    /// Neighbors mapped to similarity in [0, 1]: distance 0 anchors 1.0 and
    /// the farthest returned neighbor anchors 0.0. When every returned
    /// distance is equal (a single result included) all scores are 1.0.
    pub fn scored(&self, target: usize, k: usize) -> Vec<(usize, f64)> {
        let neighbors = self.query(target, k);
        if neighbors.is_empty() {
            return Vec::new();
        }
        let d_min = neighbors[0].distance;
        let d_max = neighbors[neighbors.len() - 1].distance;
        neighbors
            .into_iter()
            .map(|n| {
                let score = if d_max > d_min && d_max > 0.0 {
                    1.0 - n.distance / d_max
                } else {
                    1.0
                };
                (n.index, score)
            })
            .collect()
    }
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}
