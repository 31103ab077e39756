//! TUM RGB-D sequence reader.
//!
//! Expects the usual layout of a sequence directory:
//! - `associations.txt`: `rgb_ts rgb/<file>.png depth_ts depth/<file>.png`
//!   per line, as produced by the dataset's `associate.py`
//! - `groundtruth.txt`: `ts tx ty tz qx qy qz qw` per line (camera → world)
//!
//! Both files are space separated with `#` comment lines.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use csv::{ReaderBuilder, StringRecord, Trim};
use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use tracing::warn;

use crate::geometry::SE3;
use crate::keyframes::{ColorImage, DepthImage, depth_from_dynamic};

#[derive(Debug, Clone, PartialEq)]
pub struct FrameEntry {
    pub rgb_timestamp: f64,
    pub rgb_file: String,
    pub depth_timestamp: f64,
    pub depth_file: String,
}

#[derive(Debug, Clone)]
pub struct GroundTruthEntry {
    pub timestamp: f64,
    /// Camera → world.
    pub t_wc: SE3,
}

/// Decoded color + depth pair.
#[derive(Debug, Clone)]
pub struct RgbdFrame {
    pub timestamp: f64,
    pub color: ColorImage,
    /// Depth in meters.
    pub depth: DepthImage,
}

#[derive(Debug)]
pub struct TumRgbdDataset {
    root: PathBuf,
    pub frames: Vec<FrameEntry>,
    pub groundtruth: Vec<GroundTruthEntry>,
}

impl TumRgbdDataset {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let frames = load_associations(&root.join("associations.txt"))?;
        if frames.is_empty() {
            bail!("No frames listed in {}", root.join("associations.txt").display());
        }

        let groundtruth = load_groundtruth(&root.join("groundtruth.txt")).unwrap_or_else(|e| {
            warn!("Could not load ground truth: {:#}. Continuing without it.", e);
            Vec::new()
        });

        Ok(Self {
            root,
            frames,
            groundtruth,
        })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Decode frame `idx`, converting raw depth with `depth_scale` units per meter.
    pub fn frame(&self, idx: usize, depth_scale: f32) -> Result<RgbdFrame> {
        let entry = self
            .frames
            .get(idx)
            .with_context(|| format!("No frame at index {}", idx))?;

        let rgb_path = self.root.join(&entry.rgb_file);
        let depth_path = self.root.join(&entry.depth_file);

        let color = image::open(&rgb_path)
            .with_context(|| format!("Failed to read color image {}", rgb_path.display()))?
            .to_rgb8();
        let raw_depth = image::open(&depth_path)
            .with_context(|| format!("Failed to read depth image {}", depth_path.display()))?;
        let depth = depth_from_dynamic(&raw_depth, depth_scale)
            .with_context(|| format!("Unusable depth image {}", depth_path.display()))?;

        Ok(RgbdFrame {
            timestamp: entry.rgb_timestamp,
            color,
            depth,
        })
    }

    /// Ground-truth entry closest in time to `timestamp`.
    pub fn nearest_groundtruth(&self, timestamp: f64) -> Option<&GroundTruthEntry> {
        let idx = self
            .groundtruth
            .partition_point(|gt| gt.timestamp < timestamp);

        let after = self.groundtruth.get(idx);
        let before = idx.checked_sub(1).and_then(|i| self.groundtruth.get(i));
        match (before, after) {
            (Some(b), Some(a)) => {
                if timestamp - b.timestamp <= a.timestamp - timestamp {
                    Some(b)
                } else {
                    Some(a)
                }
            }
            (b, a) => b.or(a),
        }
    }

    /// World → camera pose (`T_cw`) at `timestamp`, from the closest
    /// ground-truth sample no more than `max_dt` seconds away.
    pub fn camera_pose(&self, timestamp: f64, max_dt: f64) -> Option<SE3> {
        self.nearest_groundtruth(timestamp)
            .filter(|gt| (gt.timestamp - timestamp).abs() <= max_dt)
            .map(|gt| gt.t_wc.inverse())
    }
}

fn reader(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b' ')
        .comment(Some(b'#'))
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))
}

fn field<T: std::str::FromStr>(rec: &StringRecord, idx: usize) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = rec
        .get(idx)
        .with_context(|| format!("Missing column {}", idx))?;
    raw.parse::<T>()
        .with_context(|| format!("Bad value {:?} in column {}", raw, idx))
}

fn load_associations(path: &Path) -> Result<Vec<FrameEntry>> {
    let mut rdr = reader(path)?;

    let mut entries = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        if rec.len() < 4 {
            continue;
        }
        entries.push(FrameEntry {
            rgb_timestamp: field(&rec, 0)?,
            rgb_file: rec[1].to_string(),
            depth_timestamp: field(&rec, 2)?,
            depth_file: rec[3].to_string(),
        });
    }
    Ok(entries)
}

fn load_groundtruth(path: &Path) -> Result<Vec<GroundTruthEntry>> {
    let mut rdr = reader(path)?;

    let mut entries = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        if rec.len() < 8 {
            continue;
        }
        let translation = Vector3::new(field(&rec, 1)?, field(&rec, 2)?, field(&rec, 3)?);
        // Quaternion is stored x, y, z, w.
        let rotation = UnitQuaternion::from_quaternion(Quaternion::new(
            field(&rec, 7)?,
            field(&rec, 4)?,
            field(&rec, 5)?,
            field(&rec, 6)?,
        ));
        entries.push(GroundTruthEntry {
            timestamp: field(&rec, 0)?,
            t_wc: SE3::from_quaternion(rotation, translation),
        });
    }

    entries.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::{ImageBuffer, Luma, Rgb};
    use std::fs;

    fn write_sequence(root: &Path) {
        fs::create_dir_all(root.join("rgb")).unwrap();
        fs::create_dir_all(root.join("depth")).unwrap();

        ColorImage::from_pixel(4, 3, Rgb([10, 20, 30]))
            .save(root.join("rgb/1.0.png"))
            .unwrap();
        ImageBuffer::<Luma<u16>, Vec<u16>>::from_pixel(4, 3, Luma([5000]))
            .save(root.join("depth/1.0.png"))
            .unwrap();

        fs::write(
            root.join("associations.txt"),
            "# rgb depth\n1.0 rgb/1.0.png 1.01 depth/1.0.png\n",
        )
        .unwrap();
        fs::write(
            root.join("groundtruth.txt"),
            "# timestamp tx ty tz qx qy qz qw\n\
             0.9 0.0 0.0 0.0 0.0 0.0 0.0 1.0\n\
             1.02 1.0 2.0 3.0 0.0 0.0 0.0 1.0\n",
        )
        .unwrap();
    }

    #[test]
    fn test_loads_sequence() {
        let dir = tempfile::tempdir().unwrap();
        write_sequence(dir.path());

        let dataset = TumRgbdDataset::new(dir.path()).unwrap();
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.frames[0].depth_file, "depth/1.0.png");
        assert_eq!(dataset.groundtruth.len(), 2);

        let frame = dataset.frame(0, 5000.0).unwrap();
        assert_eq!(frame.color.dimensions(), (4, 3));
        assert_eq!(frame.depth.get_pixel(2, 1).0[0], 1.0);
    }

    #[test]
    fn test_camera_pose_is_inverse_of_nearest_groundtruth() {
        let dir = tempfile::tempdir().unwrap();
        write_sequence(dir.path());
        let dataset = TumRgbdDataset::new(dir.path()).unwrap();

        let t_cw = dataset.camera_pose(1.0, 0.05).unwrap();
        assert_relative_eq!(t_cw.translation, Vector3::new(-1.0, -2.0, -3.0), epsilon = 1e-12);

        assert!(dataset.camera_pose(5.0, 0.05).is_none());
    }

    #[test]
    fn test_missing_groundtruth_is_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        write_sequence(dir.path());
        fs::remove_file(dir.path().join("groundtruth.txt")).unwrap();

        let dataset = TumRgbdDataset::new(dir.path()).unwrap();
        assert!(dataset.groundtruth.is_empty());
        assert!(dataset.camera_pose(1.0, 1.0).is_none());
    }

    #[test]
    fn test_missing_associations_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(TumRgbdDataset::new(dir.path()).is_err());
    }
}
