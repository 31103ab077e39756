//! Background mapping worker.
//!
//! Runs on its own thread. Each cycle blocks on the keyframe store, fuses
//! every keyframe accepted since the previous cycle into the global map and
//! publishes a fresh display snapshot. When the store is closed the worker
//! hands the full history to the [`Finalizer`] and exits.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cloud::PointCloud;
use crate::error::Result;
use crate::keyframes::StoreEvent;
use crate::system::{MapperState, SharedState};

use super::display::DisplayPolicy;
use super::finalizer::{FinalizeReport, Finalizer};
use super::fuser::MapFuser;
use super::reconstruct::Reconstructor;

/// Progress counters of the mapping worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MappingStats {
    /// Completed fusion cycles.
    pub cycles: u64,
    /// Keyframes fused into the live map so far.
    pub keyframes_fused: usize,
    /// Number of keyframes already consumed; the next cycle starts here.
    pub last_processed: usize,
    /// Points in the live global map.
    pub map_points: usize,
    /// Points in the latest display snapshot.
    pub display_points: usize,
}

pub struct MappingWorker {
    reconstructor: Reconstructor,
    fuser: MapFuser,
    display: DisplayPolicy,
    finalizer: Finalizer,
    global_map: PointCloud,
    stats: MappingStats,
}

impl MappingWorker {
    pub fn new(
        reconstructor: Reconstructor,
        fuser: MapFuser,
        display: DisplayPolicy,
        finalizer: Finalizer,
    ) -> Self {
        Self {
            reconstructor,
            fuser,
            display,
            finalizer,
            global_map: PointCloud::new(),
            stats: MappingStats::default(),
        }
    }

    /// Main loop. Returns once the store is closed and the final map is written.
    pub fn run(mut self, shared: Arc<SharedState>) -> Result<FinalizeReport> {
        info!("Mapping worker started");
        loop {
            match shared.keyframes.wait_for_update(self.stats.last_processed) {
                StoreEvent::Grown(count) => self.fuse_pending(count, &shared),
                StoreEvent::Closed => break,
            }
        }

        let pending = shared.keyframes.len() - self.stats.last_processed;
        if pending > 0 {
            debug!("{} keyframes not fused live, covered by the final rebuild", pending);
        }

        self.finish(&shared)
    }

    /// One fusion cycle over keyframes `[last_processed, count)`.
    fn fuse_pending(&mut self, count: usize, shared: &SharedState) {
        let start = self.stats.last_processed;
        let batch = shared.keyframes.range(start, count);
        if batch.is_empty() {
            return;
        }

        let clouds: Vec<PointCloud> = batch
            .iter()
            .map(|kf| self.reconstructor.reconstruct(kf))
            .collect();
        self.fuser.fuse_batch(&mut self.global_map, clouds);

        let end = start + batch.len();
        debug_assert!(end > self.stats.last_processed);
        self.stats.last_processed = end;

        let snapshot = Arc::new(self.display.apply(&self.global_map));
        self.stats.cycles += 1;
        self.stats.keyframes_fused += batch.len();
        self.stats.map_points = self.global_map.len();
        self.stats.display_points = snapshot.len();

        shared.publish_display(snapshot);
        shared.set_stats(self.stats);

        info!(
            "Mapping cycle {}: fused keyframes {}..{}, map has {} points ({} displayed)",
            self.stats.cycles,
            start,
            end,
            self.stats.map_points,
            self.stats.display_points
        );
    }

    fn finish(self, shared: &SharedState) -> Result<FinalizeReport> {
        let keyframes = shared.keyframes.snapshot();
        info!("Finalizing map from {} keyframes", keyframes.len());

        let finalized = self.finalizer.finalize(&keyframes);
        shared.set_final_map(Arc::new(finalized.map.clone()));

        let outcome = self.finalizer.persist(&finalized);
        if let Err(e) = &outcome {
            warn!("Final map kept in memory only: {}", e);
        }

        shared.set_state(MapperState::Stopped);
        outcome
    }
}
