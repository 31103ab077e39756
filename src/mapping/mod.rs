//! Dense mapping pipeline.
//!
//! Keyframe → [`Reconstructor`] → [`MapFuser`] → live global map, driven by
//! the [`MappingWorker`] thread; [`Finalizer`] rebuilds and persists the map
//! on shutdown.

pub mod display;
pub mod finalizer;
pub mod fuser;
pub mod reconstruct;
pub mod worker;

pub use display::{DisplayConfig, DisplayPolicy};
pub use finalizer::{FinalizeReport, FinalizedMap, Finalizer};
pub use fuser::MapFuser;
pub use reconstruct::{ReconstructionConfig, Reconstructor};
pub use worker::{MappingStats, MappingWorker};
