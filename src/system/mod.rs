//! Mapper orchestration and thread management.
//!
//! This module contains the top-level [`PointCloudMapping`] that spawns and
//! coordinates the mapping worker, along with the state it shares with it.

pub mod shared_state;
pub mod state;
mod point_cloud_mapping;

pub use point_cloud_mapping::PointCloudMapping;
pub use shared_state::SharedState;
pub use state::MapperState;
