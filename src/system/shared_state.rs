//! Shared state between the caller thread and the mapping worker.
//!
//! The keyframe store carries its own lock and condition variable. Everything
//! the worker publishes (display snapshot, final map, stats, lifecycle state)
//! sits behind short-lived `RwLock`s so readers never wait on a fusion cycle.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::cloud::PointCloud;
use crate::keyframes::KeyFrameStore;
use crate::mapping::MappingStats;

use super::state::MapperState;

pub struct SharedState {
    /// Append-only keyframe history. Caller inserts, worker reads.
    pub keyframes: KeyFrameStore,

    state: RwLock<MapperState>,

    /// Latest display snapshot. Replaced wholesale each cycle.
    display: RwLock<Arc<PointCloud>>,

    /// Set once by the finalizer, before the map is written to disk.
    final_map: RwLock<Option<Arc<PointCloud>>>,

    stats: RwLock<MappingStats>,
}

impl SharedState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn state(&self) -> MapperState {
        *self.state.read()
    }

    pub fn set_state(&self, state: MapperState) {
        *self.state.write() = state;
    }

    /// Move `Running → ShuttingDown`. Returns false if already past Running.
    pub fn begin_shutdown(&self) -> bool {
        let mut state = self.state.write();
        if *state != MapperState::Running {
            return false;
        }
        *state = MapperState::ShuttingDown;
        true
    }

    pub fn display_cloud(&self) -> Arc<PointCloud> {
        self.display.read().clone()
    }

    pub fn publish_display(&self, cloud: Arc<PointCloud>) {
        *self.display.write() = cloud;
    }

    pub fn final_map(&self) -> Option<Arc<PointCloud>> {
        self.final_map.read().clone()
    }

    pub fn set_final_map(&self, map: Arc<PointCloud>) {
        *self.final_map.write() = Some(map);
    }

    pub fn stats(&self) -> MappingStats {
        *self.stats.read()
    }

    pub fn set_stats(&self, stats: MappingStats) {
        *self.stats.write() = stats;
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self {
            keyframes: KeyFrameStore::new(),
            state: RwLock::new(MapperState::Running),
            display: RwLock::new(Arc::new(PointCloud::new())),
            final_map: RwLock::new(None),
            stats: RwLock::new(MappingStats::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_shutdown_only_once() {
        let shared = SharedState::new();
        assert_eq!(shared.state(), MapperState::Running);
        assert!(shared.begin_shutdown());
        assert!(!shared.begin_shutdown());
        assert_eq!(shared.state(), MapperState::ShuttingDown);
    }

    #[test]
    fn test_display_snapshot_is_not_aliased() {
        let shared = SharedState::new();
        let before = shared.display_cloud();
        shared.publish_display(Arc::new(PointCloud::with_capacity(4)));
        let after = shared.display_cloud();

        assert!(!Arc::ptr_eq(&before, &after));
        assert!(before.is_empty());
    }
}
