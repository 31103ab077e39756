//! PointCloudMapping - the mapper object users interact with.
//!
//! Owns the shared state and the mapping worker thread. The caller thread
//! inserts keyframes and reads snapshots; the worker fuses and, on shutdown,
//! finalizes. Shutdown is idempotent: the first call joins the worker and
//! caches its outcome, every later call (including the one from `Drop`)
//! returns the cached outcome.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::{error, info, warn};

use crate::camera::Intrinsics;
use crate::cloud::PointCloud;
use crate::config::MapperConfig;
use crate::error::{MappingError, Result};
use crate::geometry::SE3;
use crate::keyframes::{ColorImage, DepthImage, KeyFrameId};
use crate::mapping::{
    DisplayPolicy, FinalizeReport, Finalizer, MapFuser, MappingStats, MappingWorker,
    Reconstructor,
};

use super::shared_state::SharedState;
use super::state::MapperState;

const WORKER_THREAD_NAME: &str = "dense-mapping";

struct Lifecycle {
    worker: Option<JoinHandle<Result<FinalizeReport>>>,
    outcome: Option<Result<FinalizeReport>>,
}

/// Dense point cloud mapper running a background fusion thread.
pub struct PointCloudMapping {
    shared: Arc<SharedState>,
    lifecycle: Mutex<Lifecycle>,
}

impl PointCloudMapping {
    /// Validate `config` and start the mapping worker.
    pub fn new(config: MapperConfig) -> Result<Self> {
        config.validate()?;

        let shared = SharedState::new();
        let worker = Self::spawn_worker(&config, Arc::clone(&shared))?;

        info!(
            "Point cloud mapping started (resolution {} m, output {})",
            config.resolution,
            config.output_path.display()
        );

        Ok(Self {
            shared,
            lifecycle: Mutex::new(Lifecycle {
                worker: Some(worker),
                outcome: None,
            }),
        })
    }

    fn spawn_worker(
        config: &MapperConfig,
        shared: Arc<SharedState>,
    ) -> Result<JoinHandle<Result<FinalizeReport>>> {
        let reconstructor = Reconstructor::new(config.reconstruction);
        let worker = MappingWorker::new(
            reconstructor,
            MapFuser::new(config.resolution),
            DisplayPolicy::new(config.display),
            Finalizer::new(
                reconstructor,
                config.resolution,
                config.outlier,
                config.output_path.clone(),
            ),
        );

        thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || worker.run(shared))
            .map_err(|e| MappingError::Spawn {
                name: WORKER_THREAD_NAME,
                source: Arc::new(e),
            })
    }

    /// Hand a keyframe to the mapper.
    ///
    /// `pose` is the world → camera transform (`T_cw`). Fails with
    /// `InvalidInput` for malformed rasters and with `NotAccepting` once
    /// shutdown has begun.
    pub fn insert_keyframe(
        &self,
        pose: SE3,
        color: ColorImage,
        depth: DepthImage,
        intrinsics: Intrinsics,
    ) -> Result<KeyFrameId> {
        let state = self.shared.state();
        if state != MapperState::Running {
            return Err(MappingError::NotAccepting(state));
        }

        self.shared
            .keyframes
            .insert(pose, color, depth, intrinsics)
            .map_err(|e| match e {
                MappingError::NotAccepting(_) => MappingError::NotAccepting(self.shared.state()),
                other => other,
            })
    }

    /// Latest display snapshot. Never aliased with the live map.
    pub fn display_cloud(&self) -> Arc<PointCloud> {
        self.shared.display_cloud()
    }

    /// Finalized map, available once the worker has rebuilt it.
    pub fn final_map(&self) -> Option<Arc<PointCloud>> {
        self.shared.final_map()
    }

    pub fn state(&self) -> MapperState {
        self.shared.state()
    }

    pub fn stats(&self) -> MappingStats {
        self.shared.stats()
    }

    pub fn keyframe_count(&self) -> usize {
        self.shared.keyframes.len()
    }

    /// Stop accepting keyframes, let the worker finalize, and wait for it.
    pub fn shutdown(&self) -> Result<FinalizeReport> {
        let mut lifecycle = self.lifecycle.lock();
        if let Some(outcome) = &lifecycle.outcome {
            return outcome.clone();
        }

        if self.shared.begin_shutdown() {
            info!(
                "Shutdown requested with {} keyframes",
                self.shared.keyframes.len()
            );
        }
        self.shared.keyframes.close();

        let outcome = match lifecycle.worker.take() {
            Some(handle) => match handle.join() {
                Ok(outcome) => outcome,
                Err(_) => {
                    error!("Mapping worker panicked");
                    self.shared.set_state(MapperState::Stopped);
                    Err(MappingError::WorkerPanicked)
                }
            },
            None => Err(MappingError::WorkerPanicked),
        };

        lifecycle.outcome = Some(outcome.clone());
        outcome
    }
}

impl Drop for PointCloudMapping {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!("Point cloud mapping shut down with error: {}", e);
        }
    }
}
