//! Mapper lifecycle state.

use std::fmt;

/// Lifecycle of a [`PointCloudMapping`](super::PointCloudMapping).
///
/// Transitions only move forward: `Running → ShuttingDown → Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapperState {
    /// Accepting keyframes, worker fusing.
    Running,
    /// Store closed, worker finalizing.
    ShuttingDown,
    /// Worker exited; final map available.
    Stopped,
}

impl fmt::Display for MapperState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MapperState::Running => "running",
            MapperState::ShuttingDown => "shutting down",
            MapperState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}
