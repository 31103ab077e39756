//! SE(3) rigid body transforms.
//!
//! Poses are stored as a unit quaternion plus a translation. The naming
//! convention `T_target_source` from [`super::frames`] applies: a keyframe pose
//! `T_cw` maps world points into the camera frame, and its inverse `T_wc`
//! maps camera points back into the world frame.

use nalgebra::{Matrix3, Matrix4, Rotation3, UnitQuaternion, Vector3};

/// Tolerance used when checking that a 4x4 matrix is a rigid transform.
const RIGIDITY_TOLERANCE: f64 = 1e-4;

/// Rigid body transform (rotation + translation).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SE3 {
    pub rotation: UnitQuaternion<f64>,
    pub translation: Vector3<f64>,
}

impl SE3 {
    pub fn identity() -> Self {
        Self {
            rotation: UnitQuaternion::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// Build from a rotation matrix and a translation.
    ///
    /// The rotation is assumed to be orthonormal; use [`SE3::from_matrix`]
    /// for unchecked external input.
    pub fn from_rt(rotation: &Matrix3<f64>, translation: Vector3<f64>) -> Self {
        let rotation =
            UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(*rotation));
        Self {
            rotation,
            translation,
        }
    }

    pub fn from_quaternion(rotation: UnitQuaternion<f64>, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Build from a homogeneous 4x4 matrix.
    ///
    /// Returns `None` if the matrix is not a proper rigid transform: any
    /// non-finite entry, a bottom row other than `[0 0 0 1]`, or a rotation
    /// block that is not orthonormal with determinant +1.
    pub fn from_matrix(m: &Matrix4<f64>) -> Option<Self> {
        if m.iter().any(|v| !v.is_finite()) {
            return None;
        }

        let bottom = m.fixed_view::<1, 4>(3, 0);
        let expected_bottom = [0.0, 0.0, 0.0, 1.0];
        if bottom
            .iter()
            .zip(expected_bottom.iter())
            .any(|(a, b)| (a - b).abs() > RIGIDITY_TOLERANCE)
        {
            return None;
        }

        let r: Matrix3<f64> = m.fixed_view::<3, 3>(0, 0).into_owned();
        let orthonormality = (r.transpose() * r - Matrix3::identity()).norm();
        if orthonormality > RIGIDITY_TOLERANCE || r.determinant() <= 0.0 {
            return None;
        }

        let t = Vector3::new(m[(0, 3)], m[(1, 3)], m[(2, 3)]);
        Some(Self::from_rt(&r, t))
    }

    /// Homogeneous 4x4 representation.
    pub fn to_matrix(&self) -> Matrix4<f64> {
        let mut m = Matrix4::identity();
        m.fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&self.rotation.to_rotation_matrix().into_inner());
        m.fixed_view_mut::<3, 1>(0, 3).copy_from(&self.translation);
        m
    }

    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.inverse();
        let translation = -(rotation * self.translation);
        Self {
            rotation,
            translation,
        }
    }

    /// `self * other`: apply `other` first, then `self`.
    pub fn compose(&self, other: &SE3) -> SE3 {
        SE3 {
            rotation: self.rotation * other.rotation,
            translation: self.rotation * other.translation + self.translation,
        }
    }

    pub fn transform_point(&self, p: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * p + self.translation
    }
}

impl Default for SE3 {
    fn default() -> Self {
        Self::identity()
    }
}
