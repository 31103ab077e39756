//! TOML configuration.
//!
//! Every section has defaults, so an empty file (or no file at all) yields a
//! working configuration for TUM RGB-D freiburg 1 sequences.
//!
//! ```toml
//! [camera]
//! fx = 517.3
//! depth_scale = 5000.0
//!
//! [mapper]
//! resolution = 0.04
//! output_path = "optimized_pointcloud.pcd"
//!
//! [mapper.outlier]
//! mean_k = 50
//!
//! [pose_publisher]
//! rate_hz = 100.0
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::camera::{INTRINSICS_TUM_FR1, Intrinsics};
use crate::cloud::OutlierRemovalConfig;
use crate::error::{MappingError, Result};
use crate::mapping::{DisplayConfig, ReconstructionConfig};
use crate::publish::PosePublisherConfig;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub mapper: MapperConfig,
    #[serde(default)]
    pub pose_publisher: PosePublisherConfig,
    #[serde(default)]
    pub sequence: SequenceConfig,
}

impl Config {
    /// Read and validate a TOML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            MappingError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.camera.validate()?;
        self.mapper.validate()?;
        self.pose_publisher.validate()?;
        if self.sequence.keyframe_interval == 0 {
            return Err(MappingError::Config(
                "sequence.keyframe_interval must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Depth camera calibration.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    /// Raw 16-bit depth units per meter.
    pub depth_scale: f32,
}

impl CameraConfig {
    pub fn intrinsics(&self) -> Intrinsics {
        Intrinsics::new(self.fx, self.fy, self.cx, self.cy)
    }

    fn validate(&self) -> Result<()> {
        if !self.intrinsics().is_valid() {
            return Err(MappingError::Config(
                "camera intrinsics must be finite with non-zero focal lengths".into(),
            ));
        }
        if !(self.depth_scale.is_finite() && self.depth_scale > 0.0) {
            return Err(MappingError::Config(format!(
                "camera.depth_scale must be positive, got {}",
                self.depth_scale
            )));
        }
        Ok(())
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fx: INTRINSICS_TUM_FR1.fx,
            fy: INTRINSICS_TUM_FR1.fy,
            cx: INTRINSICS_TUM_FR1.cx,
            cy: INTRINSICS_TUM_FR1.cy,
            depth_scale: 5000.0,
        }
    }
}

/// Dense mapper configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    pub reconstruction: ReconstructionConfig,
    /// Voxel leaf size in meters, shared by live fusion and the final rebuild.
    pub resolution: f32,
    pub outlier: OutlierRemovalConfig,
    pub display: DisplayConfig,
    pub output_path: PathBuf,
}

impl MapperConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.resolution.is_finite() && self.resolution > 0.0) {
            return Err(MappingError::Config(format!(
                "mapper.resolution must be positive, got {}",
                self.resolution
            )));
        }

        let r = &self.reconstruction;
        if r.sample_stride == 0 {
            return Err(MappingError::Config(
                "mapper.reconstruction.sample_stride must be at least 1".into(),
            ));
        }
        if !(r.min_depth >= 0.0 && r.min_depth < r.max_depth) {
            return Err(MappingError::Config(format!(
                "mapper.reconstruction needs 0 <= min_depth < max_depth, got [{}, {}]",
                r.min_depth, r.max_depth
            )));
        }

        if self.outlier.mean_k == 0 {
            return Err(MappingError::Config(
                "mapper.outlier.mean_k must be at least 1".into(),
            ));
        }
        if !self.outlier.stddev_mul_thresh.is_finite() {
            return Err(MappingError::Config(
                "mapper.outlier.stddev_mul_thresh must be finite".into(),
            ));
        }

        if self.display.z_min > self.display.z_max {
            return Err(MappingError::Config(format!(
                "mapper.display needs z_min <= z_max, got [{}, {}]",
                self.display.z_min, self.display.z_max
            )));
        }
        Ok(())
    }
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            reconstruction: ReconstructionConfig::default(),
            resolution: 0.04,
            outlier: OutlierRemovalConfig::default(),
            display: DisplayConfig::default(),
            output_path: PathBuf::from("optimized_pointcloud.pcd"),
        }
    }
}

/// Dataset replay settings for the binary.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    /// Insert every n-th frame as a keyframe.
    pub keyframe_interval: usize,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            keyframe_interval: 10,
        }
    }
}
