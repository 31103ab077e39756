//! KeyFrame - one colored depth observation promoted into the map history.
//!
//! KeyFrames are immutable once accepted by the store. The mapping worker
//! reads them once during live fusion and again during finalization, so they
//! are handed around as `Arc<KeyFrame>`.

use image::DynamicImage;

use crate::camera::Intrinsics;
use crate::error::{MappingError, Result};
use crate::geometry::SE3;

use super::types::{ColorImage, DepthImage, KeyFrameId};

/// A keyframe accepted by the [`super::KeyFrameStore`].
#[derive(Debug, Clone)]
pub struct KeyFrame {
    /// Unique identifier, equal to the insertion index.
    pub id: KeyFrameId,

    /// Pose: transform from world to camera (T_cw), as produced by tracking.
    /// To lift a camera point into the world: `pose.inverse().transform_point(p_cam)`.
    pub pose: SE3,

    /// Color image registered to the depth image.
    pub color: ColorImage,

    /// Metric depth image, same dimensions as `color`.
    pub depth: DepthImage,

    /// Pinhole intrinsics shared by color and depth.
    pub intrinsics: Intrinsics,
}

impl KeyFrame {
    /// Validate the inputs and build a keyframe.
    pub fn new(
        id: KeyFrameId,
        pose: SE3,
        color: ColorImage,
        depth: DepthImage,
        intrinsics: Intrinsics,
    ) -> Result<Self> {
        validate_inputs(&color, &depth, &intrinsics)?;
        Ok(Self {
            id,
            pose,
            color,
            depth,
            intrinsics,
        })
    }

    pub fn width(&self) -> u32 {
        self.depth.width()
    }

    pub fn height(&self) -> u32 {
        self.depth.height()
    }

    /// Camera-to-world transform (T_wc).
    pub fn camera_to_world(&self) -> SE3 {
        self.pose.inverse()
    }
}

/// Check that a color/depth pair and its intrinsics can form a keyframe.
///
/// Rejects empty rasters, mismatched dimensions, negative or infinite depth
/// samples (a sign of raw sensor units rather than meters), and degenerate
/// intrinsics.
pub fn validate_inputs(color: &ColorImage, depth: &DepthImage, intrinsics: &Intrinsics) -> Result<()> {
    if depth.width() == 0 || depth.height() == 0 {
        return Err(MappingError::InvalidInput("depth image is empty".into()));
    }

    if color.dimensions() != depth.dimensions() {
        return Err(MappingError::InvalidInput(format!(
            "color is {}x{} but depth is {}x{}",
            color.width(),
            color.height(),
            depth.width(),
            depth.height()
        )));
    }

    if let Some(bad) = depth.pixels().map(|p| p.0[0]).find(|d| d.is_infinite() || *d < 0.0) {
        return Err(MappingError::InvalidInput(format!(
            "depth sample {} is not a metric range",
            bad
        )));
    }

    if !intrinsics.is_valid() {
        return Err(MappingError::InvalidInput(format!(
            "degenerate intrinsics {:?}",
            intrinsics
        )));
    }

    Ok(())
}

/// Convert a decoded depth image into meters.
///
/// Only single-channel 16-bit images carry metric depth (raw units divided by
/// `depth_scale`, e.g. 5000 for TUM RGB-D). Multi-channel or 8-bit images are
/// rejected.
pub fn depth_from_dynamic(image: &DynamicImage, depth_scale: f32) -> Result<DepthImage> {
    if !(depth_scale.is_finite() && depth_scale > 0.0) {
        return Err(MappingError::InvalidInput(format!(
            "depth scale must be positive, got {}",
            depth_scale
        )));
    }

    match image {
        DynamicImage::ImageLuma16(raw) => Ok(DepthImage::from_fn(raw.width(), raw.height(), |x, y| {
            image::Luma([raw.get_pixel(x, y).0[0] as f32 / depth_scale])
        })),
        DynamicImage::ImageLuma8(_) => Err(MappingError::InvalidInput(
            "8-bit depth image cannot hold metric depth".into(),
        )),
        other => Err(MappingError::InvalidInput(format!(
            "depth image must be single-channel, got {} channels",
            other.color().channel_count()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma, Rgb};

    fn intrinsics() -> Intrinsics {
        Intrinsics::new(500.0, 500.0, 2.0, 2.0)
    }

    #[test]
    fn test_valid_keyframe() {
        let color = ColorImage::from_pixel(4, 4, Rgb([10, 20, 30]));
        let depth = DepthImage::from_pixel(4, 4, Luma([1.0]));
        let kf = KeyFrame::new(KeyFrameId::new(0), SE3::identity(), color, depth, intrinsics()).unwrap();

        assert_eq!(kf.width(), 4);
        assert_eq!(kf.height(), 4);
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let color = ColorImage::new(4, 3);
        let depth = DepthImage::new(4, 4);
        let err = validate_inputs(&color, &depth, &intrinsics()).unwrap_err();
        assert!(matches!(err, MappingError::InvalidInput(_)));
    }

    #[test]
    fn test_empty_depth_rejected() {
        let err = validate_inputs(&ColorImage::new(0, 0), &DepthImage::new(0, 0), &intrinsics()).unwrap_err();
        assert!(matches!(err, MappingError::InvalidInput(_)));
    }

    #[test]
    fn test_negative_or_infinite_depth_rejected() {
        let color = ColorImage::new(2, 2);
        let mut depth = DepthImage::from_pixel(2, 2, Luma([1.0]));
        depth.put_pixel(1, 1, Luma([-1.0]));
        assert!(validate_inputs(&color, &depth, &intrinsics()).is_err());

        depth.put_pixel(1, 1, Luma([f32::INFINITY]));
        assert!(validate_inputs(&color, &depth, &intrinsics()).is_err());
    }

    #[test]
    fn test_nan_depth_accepted_as_missing() {
        let color = ColorImage::new(2, 2);
        let mut depth = DepthImage::from_pixel(2, 2, Luma([1.0]));
        depth.put_pixel(0, 0, Luma([f32::NAN]));
        assert!(validate_inputs(&color, &depth, &intrinsics()).is_ok());
    }

    #[test]
    fn test_depth_from_luma16_scales_to_meters() {
        let raw: ImageBuffer<Luma<u16>, Vec<u16>> = ImageBuffer::from_pixel(3, 2, Luma([5000]));
        let depth = depth_from_dynamic(&DynamicImage::ImageLuma16(raw), 5000.0).unwrap();

        assert_eq!(depth.dimensions(), (3, 2));
        assert!(depth.pixels().all(|p| (p.0[0] - 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_depth_from_color_image_rejected() {
        let rgb = DynamicImage::ImageRgb8(ColorImage::new(3, 2));
        let err = depth_from_dynamic(&rgb, 5000.0).unwrap_err();
        assert!(matches!(err, MappingError::InvalidInput(_)));

        let gray = DynamicImage::ImageLuma8(image::GrayImage::new(3, 2));
        assert!(depth_from_dynamic(&gray, 5000.0).is_err());
    }
}
