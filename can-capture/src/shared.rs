//! Thread-shared frame store
//!
//! Puts every mutation of a [`FrameStore`] behind one mutex. Analytics copy
//! the frames they need while holding the lock and compute after releasing
//! it, so a slow query never stalls the capture thread.

use crate::analytics::{AnalyticsEngine, FrameSnapshot};
use crate::store::FrameStore;
use crate::types::Frame;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Cloneable handle to a store shared between a producer and its viewers
#[derive(Clone, Default)]
pub struct SharedFrameStore {
    inner: Arc<Mutex<FrameStore>>,
}

impl SharedFrameStore {
    pub fn new(store: FrameStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    /// Lock the store. A poisoned lock is recovered; every store mutation
    /// leaves the views consistent before it can panic.
    pub fn lock(&self) -> MutexGuard<'_, FrameStore> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with exclusive access to the store
    pub fn with_store<T>(&self, f: impl FnOnce(&mut FrameStore) -> T) -> T {
        f(&mut self.lock())
    }

    pub fn ingest(&self, frame: Frame, notify: bool) {
        self.lock().ingest(frame, notify);
    }

    /// Batch-ingest and announce the new rows with a single event
    pub fn ingest_batch(&self, frames: &[Frame]) -> usize {
        let mut store = self.lock();
        store.ingest_batch(frames);
        store.flush_appended_rows()
    }

    /// Copy of the full history
    pub fn snapshot_history(&self) -> Vec<Frame> {
        self.lock().history().to_vec()
    }

    /// Copy of the filtered view
    pub fn snapshot_filtered(&self) -> Vec<Frame> {
        self.lock().filtered().to_vec()
    }

    /// Statistics for one identifier, computed outside the lock
    pub fn analyze(&self, identifier: u32) -> Option<FrameSnapshot> {
        let frames = self.lock().frames_for(identifier);
        AnalyticsEngine::compute(&frames, identifier)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
