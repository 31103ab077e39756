//! KeyFrameStore - thread-safe, append-only keyframe history.
//!
//! The tracker thread inserts keyframes; the mapping worker blocks in
//! [`KeyFrameStore::wait_for_update`] until the history grows or the store is
//! closed. Both the producer side (`insert`, `close`) and the consumer's
//! predicate check run under the same mutex, so a notification can never be
//! lost between the check and the wait.

use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use tracing::debug;

use crate::camera::Intrinsics;
use crate::error::{MappingError, Result};
use crate::geometry::SE3;
use crate::system::MapperState;

use super::keyframe::{KeyFrame, validate_inputs};
use super::types::{ColorImage, DepthImage, KeyFrameId};

/// What woke a waiting consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    /// The history grew; carries the current length.
    Grown(usize),
    /// The store was closed; no more keyframes will arrive.
    Closed,
}

struct StoreInner {
    keyframes: Vec<Arc<KeyFrame>>,
    closed: bool,
}

/// Append-only keyframe log guarded by a single lock + condition variable.
pub struct KeyFrameStore {
    inner: Mutex<StoreInner>,
    updated: Condvar,
}

impl KeyFrameStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                keyframes: Vec::new(),
                closed: false,
            }),
            updated: Condvar::new(),
        }
    }

    /// Validate and append a keyframe, then wake one waiting consumer.
    ///
    /// Validation happens before the lock is taken; a rejected keyframe
    /// leaves the store untouched.
    pub fn insert(
        &self,
        pose: SE3,
        color: ColorImage,
        depth: DepthImage,
        intrinsics: Intrinsics,
    ) -> Result<KeyFrameId> {
        validate_inputs(&color, &depth, &intrinsics)?;

        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(MappingError::NotAccepting(MapperState::ShuttingDown));
        }

        let id = KeyFrameId::new(inner.keyframes.len() as u64);
        inner.keyframes.push(Arc::new(KeyFrame {
            id,
            pose,
            color,
            depth,
            intrinsics,
        }));
        debug!("Received keyframe {} (history size {})", id, inner.keyframes.len());

        self.updated.notify_one();
        Ok(id)
    }

    /// Number of accepted keyframes.
    pub fn len(&self) -> usize {
        self.inner.lock().keyframes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<Arc<KeyFrame>> {
        self.inner.lock().keyframes.get(index).cloned()
    }

    /// Keyframes with index in `[start, end)`, clamped to the history length.
    pub fn range(&self, start: usize, end: usize) -> Vec<Arc<KeyFrame>> {
        let inner = self.inner.lock();
        let end = end.min(inner.keyframes.len());
        if start >= end {
            return Vec::new();
        }
        inner.keyframes[start..end].to_vec()
    }

    /// The full history at the time of the call.
    pub fn snapshot(&self) -> Vec<Arc<KeyFrame>> {
        self.inner.lock().keyframes.clone()
    }

    /// Block until the store holds more than `last_seen` keyframes or is closed.
    ///
    /// Closing takes priority: once closed, `Closed` is returned even if
    /// unseen keyframes remain.
    pub fn wait_for_update(&self, last_seen: usize) -> StoreEvent {
        let mut inner = self.inner.lock();
        loop {
            if inner.closed {
                return StoreEvent::Closed;
            }
            if inner.keyframes.len() > last_seen {
                return StoreEvent::Grown(inner.keyframes.len());
            }
            self.updated.wait(&mut inner);
        }
    }

    /// Stop accepting keyframes and wake every waiter.
    ///
    /// Returns `true` for the call that actually closed the store.
    pub fn close(&self) -> bool {
        let mut inner = self.inner.lock();
        let first = !inner.closed;
        inner.closed = true;
        self.updated.notify_all();
        first
    }
}

impl Default for KeyFrameStore {
    fn default() -> Self {
        Self::new()
    }
}
