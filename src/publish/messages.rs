//! Pose message types emitted by the [`PosePublisher`](super::PosePublisher).
//!
//! Plain data, shaped after the usual robotics middleware messages so a
//! transport adapter can forward them field by field.

use std::time::SystemTime;

use nalgebra::{UnitQuaternion, Vector3};

/// Stamp and frame shared by all messages of one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    /// Tick sequence number, starting at 0 for the first published tick.
    pub seq: u64,
    pub stamp: SystemTime,
    pub frame_id: String,
}

/// Position + orientation in the map frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vector3<f64>,
    pub orientation: UnitQuaternion<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PoseStamped {
    pub header: Header,
    pub pose: Pose,
}

/// Pose with a row-major 6x6 covariance over (x, y, z, roll, pitch, yaw).
#[derive(Debug, Clone, PartialEq)]
pub struct PoseWithCovarianceStamped {
    pub header: Header,
    pub pose: Pose,
    pub covariance: [f64; 36],
}

/// Transform from `header.frame_id` (parent) to `child_frame_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformStamped {
    pub header: Header,
    pub child_frame_id: String,
    pub transform: Pose,
}

/// Everything published on one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseUpdate {
    pub pose: PoseStamped,
    pub odometry: PoseWithCovarianceStamped,
    pub transform: TransformStamped,
}

/// Diagonal 6x6 covariance with `value` on every diagonal term.
pub fn diagonal_covariance(value: f64) -> [f64; 36] {
    let mut cov = [0.0; 36];
    for i in 0..6 {
        cov[i * 6 + i] = value;
    }
    cov
}
