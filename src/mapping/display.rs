//! Display export policy.
//!
//! Before the map is handed to a viewer it is moved into the viewer's frame
//! (translate, then rotate about X) and clipped to a Z band. This only shapes
//! what is shown; the global map itself is never modified.

use nalgebra::{Isometry3, Translation3, UnitQuaternion};
use serde::Deserialize;

use crate::cloud::PointCloud;
use crate::geometry::frames::rotation_about_x;

/// Configuration of the exported display snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// When false the snapshot is the untouched global map.
    pub enabled: bool,
    /// Translation applied to the rotated cloud.
    pub translation: [f32; 3],
    /// Rotation about the X axis, in degrees.
    pub rotation_x_degrees: f32,
    /// Lower Z bound of the kept band (inclusive).
    pub z_min: f32,
    /// Upper Z bound of the kept band (inclusive).
    pub z_max: f32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            translation: [0.0, 0.0, 0.5],
            rotation_x_degrees: 270.0,
            z_min: -1.5,
            z_max: 1.0,
        }
    }
}

/// Remaps and clips the global map for display.
#[derive(Debug, Clone, Copy)]
pub struct DisplayPolicy {
    config: DisplayConfig,
    transform: Isometry3<f32>,
}

impl DisplayPolicy {
    pub fn new(config: DisplayConfig) -> Self {
        let rotation = rotation_about_x(config.rotation_x_degrees.to_radians());
        let [tx, ty, tz] = config.translation;
        let transform = Isometry3::from_parts(
            Translation3::new(tx, ty, tz),
            UnitQuaternion::from_rotation_matrix(&rotation),
        );
        Self { config, transform }
    }

    /// Produce the display copy of `map`.
    pub fn apply(&self, map: &PointCloud) -> PointCloud {
        if !self.config.enabled {
            return map.clone();
        }

        let (z_min, z_max) = (self.config.z_min, self.config.z_max);
        let mut out = map.transformed(&self.transform);
        out.points
            .retain(|p| p.position.z >= z_min && p.position.z <= z_max);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::ColoredPoint;
    use approx::assert_relative_eq;
    use image::Rgb;
    use nalgebra::Vector3;

    fn single(x: f32, y: f32, z: f32) -> PointCloud {
        vec![ColoredPoint::new(Vector3::new(x, y, z), Rgb([9, 9, 9]))].into()
    }

    #[test]
    fn test_default_policy_rotates_then_translates() {
        let policy = DisplayPolicy::new(DisplayConfig::default());

        // Y-down camera world: y = 1 becomes z = -1, then +0.5.
        let out = policy.apply(&single(0.2, 1.0, 2.0));
        assert_eq!(out.len(), 1);
        assert_relative_eq!(out.points[0].position, Vector3::new(0.2, 2.0, -0.5), epsilon = 1e-5);
    }

    #[test]
    fn test_points_outside_band_are_clipped() {
        let policy = DisplayPolicy::new(DisplayConfig::default());

        // y = -1 -> z = 1 + 0.5 = 1.5 > 1.0
        assert!(policy.apply(&single(0.0, -1.0, 1.0)).is_empty());
        // y = 2.5 -> z = -2.5 + 0.5 = -2.0 < -1.5
        assert!(policy.apply(&single(0.0, 2.5, 1.0)).is_empty());
    }

    #[test]
    fn test_disabled_policy_is_passthrough() {
        let policy = DisplayPolicy::new(DisplayConfig {
            enabled: false,
            ..Default::default()
        });
        let map = single(0.0, 50.0, 0.0);
        assert_eq!(policy.apply(&map), map);
    }
}
