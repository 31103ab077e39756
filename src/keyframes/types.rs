//! Core ID and raster types for keyframes.

use image::{ImageBuffer, Luma, RgbImage};

/// Unique identifier for a keyframe accepted by the store.
///
/// KeyFrameIds are assigned sequentially on insertion, starting at zero,
/// so the id of a keyframe equals its index in the store history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyFrameId(pub u64);

impl KeyFrameId {
    /// Create a new KeyFrameId with the given value.
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for KeyFrameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KF{}", self.0)
    }
}

/// 3-channel 8-bit color raster, channels in RGB order.
pub type ColorImage = RgbImage;

/// Single-channel depth raster in meters. `0` or `NaN` means "no reading".
pub type DepthImage = ImageBuffer<Luma<f32>, Vec<f32>>;
