//! Finalizer - clean rebuild, denoise and persistence of the map on shutdown.
//!
//! The live map is accumulated incrementally and re-sampled every cycle.
//! At shutdown the Finalizer ignores it and rebuilds from the full keyframe
//! history instead:
//! 1. Reconstruct every keyframe again
//! 2. Voxel-filter each keyframe cloud on its own, then concatenate
//! 3. Statistical outlier removal over the concatenated map
//! 4. Write the result as binary PCD
//!
//! The two paths share the reconstructor and leaf size but do not produce
//! identical clouds: the live map re-samples across keyframes, the rebuild
//! only within each keyframe.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::cloud::pcd::write_pcd_binary;
use crate::cloud::{OutlierRemovalConfig, PointCloud, StatisticalOutlierRemoval, VoxelGrid};
use crate::error::{MappingError, Result};
use crate::keyframes::KeyFrame;

use super::reconstruct::Reconstructor;

/// Result of a successful finalization.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizeReport {
    /// Keyframes in the rebuilt history.
    pub keyframes: usize,
    /// Points after the per-keyframe rebuild, before outlier removal.
    pub rebuilt_points: usize,
    /// Points written to disk.
    pub points: usize,
    /// Location of the written PCD file.
    pub output_path: PathBuf,
}

/// Rebuilt and denoised map, not yet persisted.
#[derive(Debug, Clone)]
pub struct FinalizedMap {
    pub map: PointCloud,
    pub keyframes: usize,
    pub rebuilt_points: usize,
}

pub struct Finalizer {
    reconstructor: Reconstructor,
    voxel: VoxelGrid,
    outlier_removal: StatisticalOutlierRemoval,
    output_path: PathBuf,
}

impl Finalizer {
    pub fn new(
        reconstructor: Reconstructor,
        resolution: f32,
        outlier: OutlierRemovalConfig,
        output_path: PathBuf,
    ) -> Self {
        Self {
            reconstructor,
            voxel: VoxelGrid::new(resolution),
            outlier_removal: StatisticalOutlierRemoval::new(outlier),
            output_path,
        }
    }

    /// Rebuild the map from scratch, one voxel-filtered keyframe at a time.
    pub fn rebuild(&self, keyframes: &[Arc<KeyFrame>]) -> PointCloud {
        let mut map = PointCloud::new();
        for (i, keyframe) in keyframes.iter().enumerate() {
            let cloud = self.voxel.filter(&self.reconstructor.reconstruct(keyframe));
            debug!(
                "Rebuild {}/{}: {} contributes {} points",
                i + 1,
                keyframes.len(),
                keyframe.id,
                cloud.len()
            );
            map.append(cloud);
        }
        map
    }

    /// Rebuild and denoise.
    pub fn finalize(&self, keyframes: &[Arc<KeyFrame>]) -> FinalizedMap {
        let rebuilt = self.rebuild(keyframes);
        let rebuilt_points = rebuilt.len();
        let map = self.outlier_removal.filter(&rebuilt);

        info!(
            "Final map rebuilt from {} keyframes: {} points ({} after outlier removal)",
            keyframes.len(),
            rebuilt_points,
            map.len()
        );

        FinalizedMap {
            map,
            keyframes: keyframes.len(),
            rebuilt_points,
        }
    }

    /// Write the finalized map to the configured output path.
    pub fn persist(&self, finalized: &FinalizedMap) -> Result<FinalizeReport> {
        write_pcd_binary(&finalized.map, &self.output_path).map_err(|e| {
            MappingError::PersistenceFailure {
                path: self.output_path.clone(),
                source: Arc::new(e),
            }
        })?;

        info!(
            "Saved point cloud ({} points) to {}",
            finalized.map.len(),
            self.output_path.display()
        );

        Ok(FinalizeReport {
            keyframes: finalized.keyframes,
            rebuilt_points: finalized.rebuilt_points,
            points: finalized.map.len(),
            output_path: self.output_path.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    use crate::camera::Intrinsics;
    use crate::cloud::pcd::read_pcd_binary;
    use crate::geometry::SE3;
    use crate::keyframes::{ColorImage, DepthImage, KeyFrameId};
    use crate::mapping::reconstruct::ReconstructionConfig;

    fn keyframe(id: u64, depth: f32) -> Arc<KeyFrame> {
        Arc::new(
            KeyFrame::new(
                KeyFrameId::new(id),
                SE3::identity(),
                ColorImage::from_pixel(30, 30, Rgb([90, 80, 70])),
                DepthImage::from_pixel(30, 30, Luma([depth])),
                Intrinsics::new(30.0, 30.0, 15.0, 15.0),
            )
            .unwrap(),
        )
    }

    fn finalizer(path: PathBuf) -> Finalizer {
        Finalizer::new(
            Reconstructor::new(ReconstructionConfig::default()),
            0.01,
            OutlierRemovalConfig::default(),
            path,
        )
    }

    #[test]
    fn test_rebuild_includes_every_keyframe() {
        let f = finalizer(PathBuf::from("unused.pcd"));
        let depths = [0.5, 1.0, 2.0, 3.25, 6.0];
        let keyframes: Vec<_> = depths
            .iter()
            .enumerate()
            .map(|(i, &d)| keyframe(i as u64, d))
            .collect();

        let rebuilt = f.rebuild(&keyframes);
        let per_keyframe: usize = keyframes.iter().map(|kf| f.rebuild(&[Arc::clone(kf)]).len()).sum();

        assert_eq!(rebuilt.len(), per_keyframe);
        assert!(!rebuilt.is_dense);
        for d in depths {
            assert!(
                rebuilt.iter().any(|p| (p.position.z - d).abs() < 1e-4),
                "no rebuilt points at depth {}",
                d
            );
        }
    }

    #[test]
    fn test_finalize_and_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.pcd");
        let f = finalizer(path.clone());

        let finalized = f.finalize(&[keyframe(0, 1.0), keyframe(1, 1.5)]);
        let report = f.persist(&finalized).unwrap();

        assert_eq!(report.keyframes, 2);
        assert!(report.points <= report.rebuilt_points);
        assert_eq!(read_pcd_binary(&path).unwrap().len(), report.points);
    }

    #[test]
    fn test_empty_history_persists_empty_map() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.pcd");
        let f = finalizer(path.clone());

        let report = f.persist(&f.finalize(&[])).unwrap();
        assert_eq!(report.points, 0);
        assert!(read_pcd_binary(&path).unwrap().is_empty());
    }

    #[test]
    fn test_unwritable_path_is_persistence_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("map.pcd");
        let f = finalizer(path);

        let finalized = f.finalize(&[keyframe(0, 1.0)]);
        let err = f.persist(&finalized).unwrap_err();
        assert!(matches!(err, MappingError::PersistenceFailure { .. }));
        assert!(!finalized.map.is_empty());
    }
}
