//! Replays a TUM RGB-D sequence through the dense mapper.
//!
//! ```text
//! dense-mapper <sequence_dir> [config.toml]
//! ```
//!
//! Ground-truth poses stand in for a tracker: every frame updates the pose
//! publisher, every `keyframe_interval`-th frame becomes a keyframe.

use std::thread;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use dense_mapper::config::Config;
use dense_mapper::io::TumRgbdDataset;
use dense_mapper::publish::{ChannelSink, PosePublisher};
use dense_mapper::system::PointCloudMapping;

/// Largest accepted gap between a frame and its ground-truth pose.
const MAX_POSE_DT: f64 = 0.02;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("dense_mapper=info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let dataset_path = args
        .next()
        .unwrap_or_else(|| "data/tum/rgbd_dataset_freiburg1_xyz".to_string());

    let config = match args.next() {
        Some(path) => {
            info!("Loading configuration from {}", path);
            Config::load(&path).with_context(|| format!("Invalid configuration {}", path))?
        }
        None => Config::default(),
    };

    info!("Loading TUM RGB-D sequence from: {}", dataset_path);
    let dataset = TumRgbdDataset::new(&dataset_path)?;
    info!(
        "Loaded {} frames, {} ground truth entries",
        dataset.len(),
        dataset.groundtruth.len()
    );

    let intrinsics = config.camera.intrinsics();
    let mapper = PointCloudMapping::new(config.mapper.clone())?;

    let (sink, poses) = ChannelSink::bounded(64);
    let mut publisher = PosePublisher::spawn(config.pose_publisher.clone(), sink)?;
    let consumer = thread::Builder::new()
        .name("pose-consumer".to_string())
        .spawn(move || {
            let mut received = 0u64;
            for update in poses.iter() {
                received += 1;
                if received % 100 == 0 {
                    debug!(
                        "Pose #{}: position {:?}",
                        update.pose.header.seq,
                        update.pose.pose.position.as_slice()
                    );
                }
            }
            received
        })
        .context("Failed to spawn pose consumer")?;

    let interval = config.sequence.keyframe_interval;
    let mut inserted = 0usize;
    for (i, entry) in dataset.frames.iter().enumerate() {
        let Some(t_cw) = dataset.camera_pose(entry.rgb_timestamp, MAX_POSE_DT) else {
            debug!("No ground truth near frame {} ({:.4})", i, entry.rgb_timestamp);
            continue;
        };
        publisher.set_pose(t_cw);

        if i % interval != 0 {
            continue;
        }

        let frame = match dataset.frame(i, config.camera.depth_scale) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Skipping frame {}: {:#}", i, e);
                continue;
            }
        };

        let id = mapper.insert_keyframe(t_cw, frame.color, frame.depth, intrinsics)?;
        inserted += 1;
        debug!("Frame {} inserted as {}", i, id);
    }

    let stats = mapper.stats();
    info!(
        "Sequence done: {} keyframes inserted, {} fused live ({} map points)",
        inserted, stats.keyframes_fused, stats.map_points
    );

    publisher.stop();
    info!(
        "Pose publisher: {} published, {} skipped, {} dropped",
        publisher.published(),
        publisher.skipped(),
        publisher.dropped()
    );
    drop(publisher);
    match consumer.join() {
        Ok(received) => info!("Pose consumer received {} updates", received),
        Err(_) => warn!("Pose consumer panicked"),
    }

    let report = mapper.shutdown()?;
    info!(
        "Final map: {} points from {} keyframes written to {}",
        report.points,
        report.keyframes,
        report.output_path.display()
    );

    Ok(())
}
