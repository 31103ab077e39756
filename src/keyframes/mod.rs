//! Keyframe history shared between the tracker and the mapping worker.
//!
//! - [`KeyFrame`] - immutable pose + color + depth + intrinsics record
//! - [`KeyFrameStore`] - append-only log with blocking wait for new entries

pub mod keyframe;
pub mod store;
pub mod types;

pub use keyframe::{KeyFrame, depth_from_dynamic};
pub use store::{KeyFrameStore, StoreEvent};
pub use types::{ColorImage, DepthImage, KeyFrameId};
