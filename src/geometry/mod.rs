//! Geometry utilities: SE3 transforms and frame conventions.

pub mod frames;
pub mod se3;

pub use frames::{AxisRemap, SignedAxis};
pub use se3::SE3;
