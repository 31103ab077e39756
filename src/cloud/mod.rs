//! Point cloud data structures and filters.
//!
//! - [`PointCloud`] / [`ColoredPoint`] - append-ordered colored points
//! - [`VoxelGrid`] - bounded-density downsampling
//! - [`StatisticalOutlierRemoval`] - k-NN distance based denoising
//! - [`pcd`] - binary PCD persistence

pub mod outlier;
pub mod pcd;
pub mod point;
pub mod voxel;

pub use outlier::{OutlierRemovalConfig, StatisticalOutlierRemoval};
pub use point::{ColoredPoint, PointCloud};
pub use voxel::VoxelGrid;
