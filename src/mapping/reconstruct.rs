//! Point cloud reconstruction from one keyframe.
//!
//! Depth pixels are sampled on a fixed stride, range-gated, back-projected
//! through the pinhole intrinsics and lifted into the world frame with the
//! inverse of the keyframe pose (T_wc = T_cw⁻¹).

use nalgebra::Vector3;
use serde::Deserialize;
use tracing::debug;

use crate::cloud::{ColoredPoint, PointCloud};
use crate::keyframes::KeyFrame;

/// Configuration for [`Reconstructor`].
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReconstructionConfig {
    /// Sample every `sample_stride`-th row and column.
    pub sample_stride: u32,
    /// Closest accepted depth in meters (inclusive).
    pub min_depth: f32,
    /// Farthest accepted depth in meters (inclusive).
    pub max_depth: f32,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self {
            sample_stride: 3,
            min_depth: 0.01,
            max_depth: 10.0,
        }
    }
}

/// Stateless keyframe → world-frame colored point cloud converter.
#[derive(Debug, Clone, Copy)]
pub struct Reconstructor {
    config: ReconstructionConfig,
}

impl Reconstructor {
    pub fn new(config: ReconstructionConfig) -> Self {
        Self { config }
    }

    #[inline]
    fn in_range(&self, d: f32) -> bool {
        // NaN fails both comparisons and is rejected.
        d >= self.config.min_depth && d <= self.config.max_depth
    }

    /// Build the world-frame cloud of `keyframe`.
    ///
    /// The result is marked not dense: rejected samples leave gaps.
    pub fn reconstruct(&self, keyframe: &KeyFrame) -> PointCloud {
        let stride = self.config.sample_stride.max(1) as usize;
        let (width, height) = keyframe.depth.dimensions();
        let t_wc = keyframe.camera_to_world();
        let k = &keyframe.intrinsics;

        let mut cloud = PointCloud::with_capacity(
            (width as usize).div_ceil(stride) * (height as usize).div_ceil(stride),
        );
        cloud.is_dense = false;

        for row in (0..height).step_by(stride) {
            for col in (0..width).step_by(stride) {
                let d = keyframe.depth.get_pixel(col, row).0[0];
                if !self.in_range(d) {
                    continue;
                }

                let p_cam: Vector3<f64> = k.back_project(col as f64, row as f64, d as f64);
                let p_world = t_wc.transform_point(&p_cam);
                cloud.push(ColoredPoint::new(
                    p_world.cast::<f32>(),
                    *keyframe.color.get_pixel(col, row),
                ));
            }
        }

        debug!(
            "Generated point cloud for {}: {} points",
            keyframe.id,
            cloud.len()
        );
        cloud
    }
}
