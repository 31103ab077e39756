//! Voxel-grid downsampling.
//!
//! Space is cut into cubes of side `leaf_size` aligned with the world origin.
//! Every occupied cube is replaced by one point: the centroid of its members,
//! colored with their mean color. Because a centroid lies inside the convex
//! cell it was computed from, filtering an already filtered cloud with the
//! same leaf size does not merge any further points.

use std::collections::HashMap;

use image::Rgb;
use nalgebra::Vector3;

use super::point::{ColoredPoint, PointCloud};

type VoxelKey = (i64, i64, i64);

#[derive(Default)]
struct VoxelAccumulator {
    position_sum: Vector3<f64>,
    color_sum: [u64; 3],
    count: u64,
}

impl VoxelAccumulator {
    fn add(&mut self, p: &ColoredPoint) {
        self.position_sum += p.position.cast::<f64>();
        for (sum, c) in self.color_sum.iter_mut().zip(p.color.0.iter()) {
            *sum += *c as u64;
        }
        self.count += 1;
    }

    fn centroid(&self) -> ColoredPoint {
        let n = self.count as f64;
        let color = self.color_sum.map(|s| ((s as f64 / n).round()) as u8);
        ColoredPoint::new((self.position_sum / n).cast::<f32>(), Rgb(color))
    }
}

/// Voxel-grid filter with a fixed leaf size.
#[derive(Debug, Clone, Copy)]
pub struct VoxelGrid {
    leaf_size: f32,
}

impl VoxelGrid {
    /// `leaf_size` must be positive and finite; this is checked by config validation.
    pub fn new(leaf_size: f32) -> Self {
        debug_assert!(leaf_size > 0.0 && leaf_size.is_finite());
        Self { leaf_size }
    }

    fn key(&self, position: &Vector3<f32>) -> VoxelKey {
        let inv = 1.0 / self.leaf_size as f64;
        (
            (position.x as f64 * inv).floor() as i64,
            (position.y as f64 * inv).floor() as i64,
            (position.z as f64 * inv).floor() as i64,
        )
    }

    /// Downsample `cloud` to at most one point per occupied voxel.
    ///
    /// Non-finite points are dropped. Output order follows the order in
    /// which voxels were first touched, so the result is deterministic.
    /// The `is_dense` flag of the input is carried over.
    pub fn filter(&self, cloud: &PointCloud) -> PointCloud {
        let mut slots: HashMap<VoxelKey, usize> = HashMap::with_capacity(cloud.len());
        let mut voxels: Vec<VoxelAccumulator> = Vec::new();

        for p in cloud.iter().filter(|p| p.is_finite()) {
            let key = self.key(&p.position);
            let slot = *slots.entry(key).or_insert_with(|| {
                voxels.push(VoxelAccumulator::default());
                voxels.len() - 1
            });
            voxels[slot].add(p);
        }

        PointCloud {
            points: voxels.iter().map(VoxelAccumulator::centroid).collect(),
            is_dense: cloud.is_dense,
        }
    }
}
