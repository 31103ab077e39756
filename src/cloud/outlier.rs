//! Statistical outlier removal.
//!
//! For every point the mean distance to its `mean_k` nearest neighbours is
//! computed. Over the whole cloud these means have a mean `μ` and a sample
//! standard deviation `σ`; points whose mean neighbour distance exceeds
//! `μ + stddev_mul_thresh · σ` are removed.

use rstar::{AABB, PointDistance, RTree, RTreeObject};
use serde::Deserialize;
use tracing::debug;

use super::point::PointCloud;

/// Configuration for [`StatisticalOutlierRemoval`].
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutlierRemovalConfig {
    /// Number of neighbours used for the mean distance of each point.
    pub mean_k: usize,
    /// Multiplier on the standard deviation of mean distances.
    pub stddev_mul_thresh: f64,
}

impl Default for OutlierRemovalConfig {
    fn default() -> Self {
        Self {
            mean_k: 50,
            stddev_mul_thresh: 1.0,
        }
    }
}

/// Point position tagged with its index in the source cloud.
#[derive(Clone, Debug)]
struct IndexedPoint {
    position: [f32; 3],
    index: usize,
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f32; 3]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

impl PointDistance for IndexedPoint {
    fn distance_2(&self, point: &[f32; 3]) -> f32 {
        let dx = self.position[0] - point[0];
        let dy = self.position[1] - point[1];
        let dz = self.position[2] - point[2];
        dx * dx + dy * dy + dz * dz
    }
}

/// Statistical outlier filter backed by an R-tree neighbour index.
#[derive(Debug, Clone, Copy)]
pub struct StatisticalOutlierRemoval {
    config: OutlierRemovalConfig,
}

impl StatisticalOutlierRemoval {
    pub fn new(config: OutlierRemovalConfig) -> Self {
        Self { config }
    }

    /// Mean distance from each finite point to its nearest neighbours.
    ///
    /// Returns `(index, mean distance)` pairs. The point itself is excluded
    /// and `k` is clamped to the number of other points.
    fn mean_neighbour_distances(&self, cloud: &PointCloud) -> Vec<(usize, f64)> {
        let indexed: Vec<IndexedPoint> = cloud
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_finite())
            .map(|(index, p)| IndexedPoint {
                position: [p.position.x, p.position.y, p.position.z],
                index,
            })
            .collect();

        if indexed.len() < 2 {
            return indexed.iter().map(|p| (p.index, 0.0)).collect();
        }

        let k = self.config.mean_k.min(indexed.len() - 1).max(1);
        let tree = RTree::bulk_load(indexed.clone());

        indexed
            .iter()
            .map(|query| {
                let sum: f64 = tree
                    .nearest_neighbor_iter(&query.position)
                    .filter(|neighbour| neighbour.index != query.index)
                    .take(k)
                    .map(|neighbour| (neighbour.distance_2(&query.position) as f64).sqrt())
                    .sum();
                (query.index, sum / k as f64)
            })
            .collect()
    }

    /// Remove statistical outliers. Clouds with fewer than two points are
    /// returned unchanged.
    pub fn filter(&self, cloud: &PointCloud) -> PointCloud {
        if cloud.len() < 2 {
            return cloud.clone();
        }

        let distances = self.mean_neighbour_distances(cloud);
        let n = distances.len() as f64;
        if distances.len() < 2 {
            return PointCloud {
                points: distances.iter().map(|(i, _)| cloud.points[*i]).collect(),
                is_dense: cloud.is_dense,
            };
        }

        let mean = distances.iter().map(|(_, d)| d).sum::<f64>() / n;
        let variance = distances.iter().map(|(_, d)| (d - mean).powi(2)).sum::<f64>() / (n - 1.0);
        let threshold = mean + self.config.stddev_mul_thresh * variance.sqrt();

        let filtered = PointCloud {
            points: distances
                .iter()
                .filter(|(_, d)| *d <= threshold)
                .map(|(i, _)| cloud.points[*i])
                .collect(),
            is_dense: cloud.is_dense,
        };

        debug!(
            "Outlier removal: kept {}/{} points (threshold {:.4})",
            filtered.len(),
            cloud.len(),
            threshold
        );
        filtered
    }
}
