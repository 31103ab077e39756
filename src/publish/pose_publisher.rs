//! Fixed-rate camera pose publisher.
//!
//! The tracker hands over its latest world → camera pose (`T_cw`) whenever it
//! has one; a dedicated thread turns the most recent pose into camera → world
//! messages in the consumer's map frame and pushes them to a [`PoseSink`] on
//! every tick.
//!
//! Per tick:
//! 1. No pose yet: the tick is skipped
//! 2. Invert: `R_wc = R_cwᵀ`, `t_wc = -R_wc · t_cw`
//! 3. Apply the configured [`AxisRemap`]
//! 4. Emit pose, pose-with-covariance and the parent → child transform

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};

use anyhow::anyhow;
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded, select, tick};
use nalgebra::Matrix4;
use parking_lot::Mutex;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{MappingError, Result};
use crate::geometry::{AxisRemap, SE3};

use super::messages::{
    Header, Pose, PoseStamped, PoseUpdate, PoseWithCovarianceStamped, TransformStamped,
    diagonal_covariance,
};

const PUBLISHER_THREAD_NAME: &str = "pose-publisher";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PosePublisherConfig {
    /// Publication cadence.
    pub rate_hz: f64,
    /// Frame id stamped on the pose messages.
    pub frame_id: String,
    /// Parent frame of the published transform.
    pub parent_frame_id: String,
    /// Child frame of the published transform.
    pub child_frame_id: String,
    /// Value on every diagonal term of the pose covariance.
    pub covariance_diagonal: f64,
    pub axis_remap: AxisRemap,
}

impl PosePublisherConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.rate_hz.is_finite() && self.rate_hz > 0.0) {
            return Err(MappingError::Config(format!(
                "pose_publisher.rate_hz must be positive, got {}",
                self.rate_hz
            )));
        }
        if !(self.covariance_diagonal.is_finite() && self.covariance_diagonal >= 0.0) {
            return Err(MappingError::Config(format!(
                "pose_publisher.covariance_diagonal must be non-negative, got {}",
                self.covariance_diagonal
            )));
        }
        if !self.axis_remap.is_signed_permutation() {
            return Err(MappingError::Config(format!(
                "pose_publisher.axis_remap must use each axis once, got {:?}",
                self.axis_remap
            )));
        }
        Ok(())
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.rate_hz)
    }
}

impl Default for PosePublisherConfig {
    fn default() -> Self {
        Self {
            rate_hz: 100.0,
            frame_id: "/camera_rgb_frame".to_string(),
            parent_frame_id: "/map".to_string(),
            child_frame_id: "/odom".to_string(),
            covariance_diagonal: 0.01,
            axis_remap: AxisRemap::default(),
        }
    }
}

/// Transport for published pose updates.
pub trait PoseSink: Send {
    fn publish(&mut self, update: PoseUpdate) -> anyhow::Result<()>;
}

/// [`PoseSink`] backed by a bounded channel. A full channel drops the tick.
pub struct ChannelSink {
    sender: Sender<PoseUpdate>,
}

impl ChannelSink {
    pub fn bounded(capacity: usize) -> (Self, Receiver<PoseUpdate>) {
        let (sender, receiver) = bounded(capacity);
        (Self { sender }, receiver)
    }
}

impl PoseSink for ChannelSink {
    fn publish(&mut self, update: PoseUpdate) -> anyhow::Result<()> {
        self.sender.try_send(update).map_err(|e| match e {
            TrySendError::Full(_) => anyhow!("pose channel full"),
            TrySendError::Disconnected(_) => anyhow!("pose channel disconnected"),
        })
    }
}

/// Build the messages of one tick from a world → camera pose.
pub fn compose_update(
    config: &PosePublisherConfig,
    t_cw: &SE3,
    seq: u64,
    stamp: SystemTime,
) -> PoseUpdate {
    let t_wc = t_cw.inverse();
    let pose = Pose {
        position: config.axis_remap.remap_position(&t_wc.translation),
        orientation: config.axis_remap.remap_orientation(&t_wc.rotation),
    };

    let header = Header {
        seq,
        stamp,
        frame_id: config.frame_id.clone(),
    };

    PoseUpdate {
        pose: PoseStamped {
            header: header.clone(),
            pose,
        },
        odometry: PoseWithCovarianceStamped {
            header,
            pose,
            covariance: diagonal_covariance(config.covariance_diagonal),
        },
        transform: TransformStamped {
            header: Header {
                seq,
                stamp,
                frame_id: config.parent_frame_id.clone(),
            },
            child_frame_id: config.child_frame_id.clone(),
            transform: pose,
        },
    }
}

#[derive(Default)]
struct PublisherState {
    latest: Mutex<Option<SE3>>,
    published: AtomicU64,
    skipped: AtomicU64,
    dropped: AtomicU64,
    rejected: AtomicU64,
}

/// Background thread publishing the latest camera pose at a fixed rate.
pub struct PosePublisher {
    state: Arc<PublisherState>,
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl PosePublisher {
    pub fn spawn<S: PoseSink + 'static>(config: PosePublisherConfig, sink: S) -> Result<Self> {
        config.validate()?;

        let state = Arc::new(PublisherState::default());
        let (stop_tx, stop_rx) = bounded::<()>(0);

        let thread_state = Arc::clone(&state);
        let handle = thread::Builder::new()
            .name(PUBLISHER_THREAD_NAME.to_string())
            .spawn(move || run(config, sink, thread_state, stop_rx))
            .map_err(|e| MappingError::Spawn {
                name: PUBLISHER_THREAD_NAME,
                source: Arc::new(e),
            })?;

        Ok(Self {
            state,
            stop: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Replace the pose published from the next tick on.
    pub fn set_pose(&self, t_cw: SE3) {
        *self.state.latest.lock() = Some(t_cw);
    }

    /// Replace the pose from a 4x4 `T_cw` matrix.
    ///
    /// Non-rigid matrices are dropped and the previous pose is kept; returns
    /// whether the pose was accepted.
    pub fn set_pose_matrix(&self, t_cw: &Matrix4<f64>) -> bool {
        match SE3::from_matrix(t_cw) {
            Some(pose) => {
                self.set_pose(pose);
                true
            }
            None => {
                self.state.rejected.fetch_add(1, Ordering::Relaxed);
                warn!("Dropping non-rigid camera pose matrix");
                false
            }
        }
    }

    /// Ticks that reached the sink.
    pub fn published(&self) -> u64 {
        self.state.published.load(Ordering::Relaxed)
    }

    /// Ticks with no pose to publish.
    pub fn skipped(&self) -> u64 {
        self.state.skipped.load(Ordering::Relaxed)
    }

    /// Ticks the sink refused.
    pub fn dropped(&self) -> u64 {
        self.state.dropped.load(Ordering::Relaxed)
    }

    /// Pose matrices rejected by [`set_pose_matrix`](Self::set_pose_matrix).
    pub fn rejected(&self) -> u64 {
        self.state.rejected.load(Ordering::Relaxed)
    }

    /// Stop the publisher thread and wait for it. Idempotent.
    pub fn stop(&mut self) {
        // Dropping the sender disconnects the stop channel.
        self.stop.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Pose publisher thread panicked");
            }
        }
    }
}

impl Drop for PosePublisher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run<S: PoseSink>(
    config: PosePublisherConfig,
    mut sink: S,
    state: Arc<PublisherState>,
    stop: Receiver<()>,
) {
    info!(
        "Pose publisher started at {} Hz (frame {})",
        config.rate_hz, config.frame_id
    );

    let ticker = tick(config.period());
    let mut seq = 0u64;
    loop {
        select! {
            recv(stop) -> _ => break,
            recv(ticker) -> _ => publish_tick(&config, &mut sink, &state, &mut seq),
        }
    }

    info!(
        "Pose publisher stopped ({} published, {} skipped, {} dropped)",
        state.published.load(Ordering::Relaxed),
        state.skipped.load(Ordering::Relaxed),
        state.dropped.load(Ordering::Relaxed)
    );
}

fn publish_tick<S: PoseSink>(
    config: &PosePublisherConfig,
    sink: &mut S,
    state: &PublisherState,
    seq: &mut u64,
) {
    let latest = *state.latest.lock();
    let Some(t_cw) = latest else {
        state.skipped.fetch_add(1, Ordering::Relaxed);
        return;
    };

    let update = compose_update(config, &t_cw, *seq, SystemTime::now());
    match sink.publish(update) {
        Ok(()) => {
            state.published.fetch_add(1, Ordering::Relaxed);
        }
        Err(e) => {
            state.dropped.fetch_add(1, Ordering::Relaxed);
            debug!("Dropped pose tick {}: {}", *seq, e);
        }
    }
    *seq += 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{UnitQuaternion, Vector3};

    use crate::geometry::SignedAxis;

    fn fast_config() -> PosePublisherConfig {
        PosePublisherConfig {
            rate_hz: 500.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_compose_inverts_and_remaps() {
        let config = PosePublisherConfig::default();
        // Camera at world (1, 2, 3), no rotation: t_cw = -(1, 2, 3).
        let t_cw = SE3::from_quaternion(UnitQuaternion::identity(), Vector3::new(-1.0, -2.0, -3.0));

        let update = compose_update(&config, &t_cw, 7, SystemTime::UNIX_EPOCH);

        assert_relative_eq!(update.pose.pose.position, Vector3::new(1.0, 3.0, -2.0), epsilon = 1e-12);
        assert_relative_eq!(update.pose.pose.orientation.w, 1.0, epsilon = 1e-12);
        assert_eq!(update.pose.header.seq, 7);
        assert_eq!(update.pose.header.frame_id, "/camera_rgb_frame");
        assert_eq!(update.odometry.pose, update.pose.pose);
        assert_eq!(update.odometry.covariance[0], 0.01);
        assert_eq!(update.odometry.covariance[35], 0.01);
        assert_eq!(update.odometry.covariance[1], 0.0);
        assert_eq!(update.transform.header.frame_id, "/map");
        assert_eq!(update.transform.child_frame_id, "/odom");
    }

    #[test]
    fn test_compose_rotation_uses_camera_to_world() {
        let config = PosePublisherConfig {
            axis_remap: AxisRemap::identity(),
            ..Default::default()
        };
        let r_wc = UnitQuaternion::from_euler_angles(0.0, 0.0, 0.4);
        let t_wc = SE3::from_quaternion(r_wc, Vector3::new(0.5, 0.0, 0.0));

        let update = compose_update(&config, &t_wc.inverse(), 0, SystemTime::UNIX_EPOCH);

        assert_relative_eq!(update.pose.pose.position, t_wc.translation, epsilon = 1e-12);
        assert_relative_eq!(update.pose.pose.orientation.angle_to(&r_wc), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rejects_bad_rate() {
        let (sink, _rx) = ChannelSink::bounded(1);
        let config = PosePublisherConfig {
            rate_hz: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            PosePublisher::spawn(config, sink),
            Err(MappingError::Config(_))
        ));
    }

    #[test]
    fn test_rejects_degenerate_axis_remap() {
        let (sink, _rx) = ChannelSink::bounded(1);
        let config = PosePublisherConfig {
            axis_remap: AxisRemap {
                orientation: [SignedAxis::X, SignedAxis::X, SignedAxis::X],
                ..AxisRemap::identity()
            },
            ..Default::default()
        };
        assert!(matches!(
            PosePublisher::spawn(config, sink),
            Err(MappingError::Config(_))
        ));
    }

    #[test]
    fn test_publishes_after_pose_set() {
        let (sink, rx) = ChannelSink::bounded(16);
        let mut publisher = PosePublisher::spawn(fast_config(), sink).unwrap();

        publisher.set_pose(SE3::identity());
        let update = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_relative_eq!(update.pose.pose.position, Vector3::zeros(), epsilon = 1e-12);

        publisher.stop();
        assert!(publisher.published() >= 1);
    }

    #[test]
    fn test_skips_ticks_without_pose() {
        let (sink, rx) = ChannelSink::bounded(16);
        let mut publisher = PosePublisher::spawn(fast_config(), sink).unwrap();

        thread::sleep(Duration::from_millis(50));
        publisher.stop();

        assert!(publisher.skipped() >= 1);
        assert_eq!(publisher.published(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_invalid_matrix_keeps_previous_pose() {
        let (sink, _rx) = ChannelSink::bounded(1);
        let publisher = PosePublisher::spawn(fast_config(), sink).unwrap();

        let mut scaled = Matrix4::identity();
        scaled[(0, 0)] = 2.0;
        assert!(!publisher.set_pose_matrix(&scaled));
        assert!(publisher.set_pose_matrix(&Matrix4::identity()));
        assert_eq!(publisher.rejected(), 1);
    }

    #[test]
    fn test_full_sink_drops_ticks() {
        let (sink, _rx) = ChannelSink::bounded(1);
        let mut publisher = PosePublisher::spawn(fast_config(), sink).unwrap();

        publisher.set_pose(SE3::identity());
        thread::sleep(Duration::from_millis(50));
        publisher.stop();

        assert_eq!(publisher.published(), 1);
        assert!(publisher.dropped() >= 1);
    }
}
