//! Dataset readers.

pub mod tum_rgbd;

pub use tum_rgbd::TumRgbdDataset;
