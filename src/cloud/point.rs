//! Colored points and point clouds.

use image::Rgb;
use nalgebra::{Isometry3, Point3, Vector3};

/// A 3-D point with an RGB color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColoredPoint {
    pub position: Vector3<f32>,
    pub color: Rgb<u8>,
}

impl ColoredPoint {
    pub fn new(position: Vector3<f32>, color: Rgb<u8>) -> Self {
        Self { position, color }
    }

    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|v| v.is_finite())
    }
}

/// Ordered collection of colored points.
///
/// Order is append order, not spatial. `is_dense` is false when the cloud
/// was sampled from a raster with gaps.
#[derive(Debug, Clone, PartialEq)]
pub struct PointCloud {
    pub points: Vec<ColoredPoint>,
    pub is_dense: bool,
}

impl PointCloud {
    pub fn new() -> Self {
        Self {
            points: Vec::new(),
            is_dense: true,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
            is_dense: true,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn push(&mut self, point: ColoredPoint) {
        self.points.push(point);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ColoredPoint> {
        self.points.iter()
    }

    /// Move all points of `other` to the end of this cloud.
    pub fn append(&mut self, mut other: PointCloud) {
        self.is_dense &= other.is_dense;
        self.points.append(&mut other.points);
    }

    /// Apply a rigid transform to every point.
    pub fn transformed(&self, transform: &Isometry3<f32>) -> PointCloud {
        PointCloud {
            points: self
                .points
                .iter()
                .map(|p| ColoredPoint {
                    position: (transform * Point3::from(p.position)).coords,
                    color: p.color,
                })
                .collect(),
            is_dense: self.is_dense,
        }
    }
}

impl Default for PointCloud {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Vec<ColoredPoint>> for PointCloud {
    fn from(points: Vec<ColoredPoint>) -> Self {
        Self {
            points,
            is_dense: true,
        }
    }
}

impl FromIterator<ColoredPoint> for PointCloud {
    fn from_iter<I: IntoIterator<Item = ColoredPoint>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

impl<'a> IntoIterator for &'a PointCloud {
    type Item = &'a ColoredPoint;
    type IntoIter = std::slice::Iter<'a, ColoredPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Translation3, UnitQuaternion};

    fn point(x: f32, y: f32, z: f32) -> ColoredPoint {
        ColoredPoint::new(Vector3::new(x, y, z), Rgb([255, 0, 0]))
    }

    #[test]
    fn test_append_preserves_order_and_density() {
        let mut a: PointCloud = vec![point(0.0, 0.0, 0.0)].into();
        let mut b: PointCloud = vec![point(1.0, 0.0, 0.0), point(2.0, 0.0, 0.0)].into();
        b.is_dense = false;

        a.append(b);
        assert_eq!(a.len(), 3);
        assert_eq!(a.points[2].position.x, 2.0);
        assert!(!a.is_dense);
    }

    #[test]
    fn test_transformed_applies_translation() {
        let cloud: PointCloud = vec![point(1.0, 2.0, 3.0)].into();
        let iso = Isometry3::from_parts(Translation3::new(0.0, 0.0, 0.5), UnitQuaternion::identity());
        let moved = cloud.transformed(&iso);

        assert_relative_eq!(moved.points[0].position, Vector3::new(1.0, 2.0, 3.5));
        assert_eq!(moved.points[0].color, Rgb([255, 0, 0]));
    }
}
