//! Coordinate frame conventions and axis remapping.
//!
//! # Frame Conventions
//!
//! ## Camera Frame (RDF - OpenCV/Computer Vision convention)
//! ```text
//!        +Y (down)
//!         |
//!         |
//!         +------ +X (right)
//!        /
//!       /
//!      +Z (forward, optical axis)
//! ```
//!
//! The SLAM world frame is the camera frame of the first keyframe, so world
//! points inherit the RDF convention: Y points down and Z points forward.
//!
//! ## Map Frame (FLU-like consumer convention)
//!
//! Downstream consumers of the published camera pose expect a Z-up map frame.
//! The bridge between the two is *not* derived from any calibration; it is a
//! fixed convention agreed with the consumer, so it lives in an [`AxisRemap`]
//! that can be replaced through configuration.
//!
//! The default remap sends a camera-world position `(x, y, z)` to
//! `(x, z, -y)` and a quaternion vector part `(qx, qy, qz)` to
//! `(qz, -qx, -qy)`, leaving `w` unchanged.
//!
//! # Transformation Naming Convention
//!
//! We use the notation `T_target_source` where:
//! - `source` is the frame we're transforming FROM
//! - `target` is the frame we're transforming TO
//!
//! For example, a keyframe stores `T_cw` (world → camera). Reconstruction
//! needs `T_wc = T_cw⁻¹` to lift camera-frame points into the world.

use nalgebra::{Quaternion, RealField, Rotation3, UnitQuaternion, Vector3};
use serde::Deserialize;

/// One output component of an axis remap: a source axis and a sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum SignedAxis {
    #[serde(rename = "x")]
    X,
    #[serde(rename = "y")]
    Y,
    #[serde(rename = "z")]
    Z,
    #[serde(rename = "-x")]
    NegX,
    #[serde(rename = "-y")]
    NegY,
    #[serde(rename = "-z")]
    NegZ,
}

impl SignedAxis {
    /// Pick this component out of `(x, y, z)`.
    #[inline]
    pub fn select(self, x: f64, y: f64, z: f64) -> f64 {
        match self {
            SignedAxis::X => x,
            SignedAxis::Y => y,
            SignedAxis::Z => z,
            SignedAxis::NegX => -x,
            SignedAxis::NegY => -y,
            SignedAxis::NegZ => -z,
        }
    }

    /// Source axis index, ignoring the sign.
    pub fn axis(self) -> usize {
        match self {
            SignedAxis::X | SignedAxis::NegX => 0,
            SignedAxis::Y | SignedAxis::NegY => 1,
            SignedAxis::Z | SignedAxis::NegZ => 2,
        }
    }
}

fn covers_every_axis(axes: &[SignedAxis; 3]) -> bool {
    let mut seen = [false; 3];
    for a in axes {
        seen[a.axis()] = true;
    }
    seen.iter().all(|&s| s)
}

/// Axis permutation applied to published positions and orientations.
///
/// Position and orientation carry separate permutations because the
/// consumer convention does not treat them as one rigid change of basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct AxisRemap {
    pub position: [SignedAxis; 3],
    pub orientation: [SignedAxis; 3],
}

impl AxisRemap {
    /// Leave positions and orientations untouched.
    pub fn identity() -> Self {
        Self {
            position: [SignedAxis::X, SignedAxis::Y, SignedAxis::Z],
            orientation: [SignedAxis::X, SignedAxis::Y, SignedAxis::Z],
        }
    }

    /// SLAM camera-world (Y-down) to the Z-up map frame of the pose consumer.
    pub fn camera_to_map() -> Self {
        Self {
            position: [SignedAxis::X, SignedAxis::Z, SignedAxis::NegY],
            orientation: [SignedAxis::Z, SignedAxis::NegX, SignedAxis::NegY],
        }
    }

    /// Both halves pick each source axis exactly once.
    ///
    /// A repeated axis can map a unit quaternion to the zero quaternion.
    pub fn is_signed_permutation(&self) -> bool {
        covers_every_axis(&self.position) && covers_every_axis(&self.orientation)
    }

    pub fn remap_position(&self, p: &Vector3<f64>) -> Vector3<f64> {
        let [a, b, c] = self.position;
        Vector3::new(
            a.select(p.x, p.y, p.z),
            b.select(p.x, p.y, p.z),
            c.select(p.x, p.y, p.z),
        )
    }

    /// Permute the vector part of `q`; the scalar part is kept.
    pub fn remap_orientation(&self, q: &UnitQuaternion<f64>) -> UnitQuaternion<f64> {
        let [a, b, c] = self.orientation;
        let (qx, qy, qz) = (q.i, q.j, q.k);
        UnitQuaternion::from_quaternion(Quaternion::new(
            q.w,
            a.select(qx, qy, qz),
            b.select(qx, qy, qz),
            c.select(qx, qy, qz),
        ))
    }
}

impl Default for AxisRemap {
    fn default() -> Self {
        Self::camera_to_map()
    }
}

/// Rotation of `angle` radians about the X axis.
pub fn rotation_about_x<T: RealField>(angle: T) -> Rotation3<T> {
    Rotation3::from_axis_angle(&Vector3::x_axis(), angle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_identity_remap_is_noop() {
        let remap = AxisRemap::identity();
        let p = Vector3::new(1.0, 2.0, 3.0);
        let q = UnitQuaternion::from_euler_angles(0.2, 0.3, -0.1);

        assert_relative_eq!(remap.remap_position(&p), p);
        assert_relative_eq!(remap.remap_orientation(&q).coords, q.coords, epsilon = 1e-12);
    }

    #[test]
    fn test_camera_to_map_position_swaps_y_and_z() {
        let remap = AxisRemap::camera_to_map();
        let p = Vector3::new(1.0, 2.0, 3.0);

        assert_relative_eq!(remap.remap_position(&p), Vector3::new(1.0, 3.0, -2.0));
    }

    #[test]
    fn test_camera_to_map_orientation_components() {
        let remap = AxisRemap::camera_to_map();
        let q = UnitQuaternion::from_quaternion(Quaternion::new(0.5, 0.5, 0.5, 0.5));
        let r = remap.remap_orientation(&q);

        assert_relative_eq!(r.w, 0.5, epsilon = 1e-12);
        assert_relative_eq!(r.i, 0.5, epsilon = 1e-12);
        assert_relative_eq!(r.j, -0.5, epsilon = 1e-12);
        assert_relative_eq!(r.k, -0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_repeated_axis_is_not_a_permutation() {
        assert!(AxisRemap::identity().is_signed_permutation());
        assert!(AxisRemap::camera_to_map().is_signed_permutation());

        let repeated = AxisRemap {
            orientation: [SignedAxis::X, SignedAxis::X, SignedAxis::X],
            ..AxisRemap::identity()
        };
        assert!(!repeated.is_signed_permutation());

        let sign_only = AxisRemap {
            position: [SignedAxis::X, SignedAxis::NegX, SignedAxis::Z],
            ..AxisRemap::identity()
        };
        assert!(!sign_only.is_signed_permutation());
    }

    #[test]
    fn test_remap_deserializes_from_toml() {
        let remap: AxisRemap = toml::from_str(
            r#"
            position = ["x", "z", "-y"]
            orientation = ["z", "-x", "-y"]
            "#,
        )
        .unwrap();
        assert_eq!(remap, AxisRemap::camera_to_map());
    }

    #[test]
    fn test_rotation_about_x_quarter_turns() {
        let r = rotation_about_x(1.5 * std::f64::consts::PI);
        let p = r * Vector3::new(0.0, 1.0, 0.0);
        assert_relative_eq!(p, Vector3::new(0.0, 0.0, -1.0), epsilon = 1e-12);
    }
}
