//! Map fusion: concatenate new clouds into the global map, then re-sample
//! the whole map on the voxel grid.
//!
//! The downsample runs over the entire accumulated map on every call, so the
//! cost of a fusion cycle grows with the map, not with the batch. Callers
//! with high keyframe rates should batch through [`MapFuser::fuse_batch`].

use tracing::debug;

use crate::cloud::{PointCloud, VoxelGrid};

/// Merges reconstructed clouds into the global map with voxel downsampling.
#[derive(Debug, Clone, Copy)]
pub struct MapFuser {
    voxel: VoxelGrid,
}

impl MapFuser {
    pub fn new(resolution: f32) -> Self {
        Self {
            voxel: VoxelGrid::new(resolution),
        }
    }

    /// Fuse a single cloud into `map`.
    pub fn fuse(&self, map: &mut PointCloud, cloud: PointCloud) {
        self.fuse_batch(map, std::iter::once(cloud));
    }

    /// Append every cloud of the batch, then downsample once.
    pub fn fuse_batch<I>(&self, map: &mut PointCloud, clouds: I)
    where
        I: IntoIterator<Item = PointCloud>,
    {
        let before = map.len();
        let mut appended = 0;
        for cloud in clouds {
            appended += cloud.len();
            map.append(cloud);
        }

        *map = self.voxel.filter(map);
        debug!(
            "Fused {} new points: map {} -> {} points",
            appended,
            before,
            map.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::ColoredPoint;
    use image::Rgb;
    use nalgebra::Vector3;

    fn patch(offset: f32) -> PointCloud {
        (0..10)
            .flat_map(|i| {
                (0..10).map(move |j| {
                    ColoredPoint::new(
                        Vector3::new(offset + i as f32 * 0.01, j as f32 * 0.01, 1.0),
                        Rgb([50, 60, 70]),
                    )
                })
            })
            .collect()
    }

    #[test]
    fn test_fuse_empty_cloud_keeps_map() {
        let fuser = MapFuser::new(0.05);
        let mut map = PointCloud::new();
        fuser.fuse(&mut map, patch(0.0));
        let before = map.len();

        fuser.fuse(&mut map, PointCloud::new());
        assert_eq!(map.len(), before);
    }

    #[test]
    fn test_fusing_same_cloud_twice_is_bounded() {
        let fuser = MapFuser::new(0.05);
        let mut map = PointCloud::new();
        fuser.fuse(&mut map, patch(0.0));
        let once = map.len();

        fuser.fuse(&mut map, patch(0.0));
        assert_eq!(map.len(), once);
    }

    #[test]
    fn test_batch_matches_sequential_point_count() {
        let fuser = MapFuser::new(0.05);

        let mut batched = PointCloud::new();
        fuser.fuse_batch(&mut batched, vec![patch(0.0), patch(1.0)]);

        let mut sequential = PointCloud::new();
        fuser.fuse(&mut sequential, patch(0.0));
        fuser.fuse(&mut sequential, patch(1.0));

        assert_eq!(batched.len(), sequential.len());
    }

    #[test]
    fn test_leaf_larger_than_scene_collapses_map() {
        let fuser = MapFuser::new(100.0);
        let mut map = PointCloud::new();
        fuser.fuse_batch(&mut map, vec![patch(0.0), patch(0.5)]);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_map_of_sparse_clouds_is_not_dense() {
        let fuser = MapFuser::new(0.05);
        let mut map = PointCloud::new();
        let mut cloud = patch(0.0);
        cloud.is_dense = false;

        fuser.fuse(&mut map, cloud);
        fuser.fuse(&mut map, patch(1.0));
        assert!(!map.is_dense);
    }
}
