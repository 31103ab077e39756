//! Pinhole camera intrinsics.

use nalgebra::Vector3;
use serde::Deserialize;

/// Pinhole intrinsics of the depth-registered color camera.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Intrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl Intrinsics {
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self { fx, fy, cx, cy }
    }

    /// Lift pixel `(col, row)` at metric depth `depth` into the camera frame.
    ///
    /// ```text
    /// z = d
    /// x = (col - cx) * z / fx
    /// y = (row - cy) * z / fy
    /// ```
    #[inline]
    pub fn back_project(&self, col: f64, row: f64, depth: f64) -> Vector3<f64> {
        Vector3::new(
            (col - self.cx) * depth / self.fx,
            (row - self.cy) * depth / self.fy,
            depth,
        )
    }

    /// Project a camera-frame point to `(col, row)`. `None` behind the camera.
    pub fn project(&self, p: &Vector3<f64>) -> Option<(f64, f64)> {
        if p.z <= 0.0 {
            return None;
        }
        Some((
            self.fx * p.x / p.z + self.cx,
            self.fy * p.y / p.z + self.cy,
        ))
    }

    /// All parameters finite and both focal lengths non-zero.
    pub fn is_valid(&self) -> bool {
        [self.fx, self.fy, self.cx, self.cy]
            .iter()
            .all(|v| v.is_finite())
            && self.fx != 0.0
            && self.fy != 0.0
    }
}

/// Intrinsics of freiburg 1 (fr1) scenes in the TUM RGB-D dataset.
pub const INTRINSICS_TUM_FR1: Intrinsics = Intrinsics {
    fx: 517.306408,
    fy: 516.469215,
    cx: 318.643040,
    cy: 255.313989,
};
