//! Per-stream stop offsets and completion counters.
//!
//! This is the only state shared between in-flight probes. Every
//! read-compare-write happens under one mutex so the stop offset of a stream
//! can only ever move down, whatever order concurrent probes finish in.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use rankscrape_core::StreamId;

#[derive(Debug, Default)]
struct StreamProgress {
    stop: Option<u32>,
    completed: usize,
}

#[derive(Debug, Default)]
pub struct StopOffsets {
    inner: Mutex<HashMap<StreamId, StreamProgress>>,
}

impl StopOffsets {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<StreamId, StreamProgress>> {
        // The map holds plain integers; a panicking holder cannot leave it
        // half-updated.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current stop offset of `stream`; `None` means unbounded.
    #[must_use]
    pub fn get(&self, stream: &StreamId) -> Option<u32> {
        self.lock().get(stream).and_then(|p| p.stop)
    }

    /// Whether `offset` lies beyond the known tail of `stream`.
    #[must_use]
    pub fn exceeds(&self, stream: &StreamId, offset: u32) -> bool {
        self.get(stream).is_some_and(|stop| offset > stop)
    }

    /// Records an empty page at `offset`. Returns `true` if this lowered the
    /// stop offset.
    pub fn record_empty(&self, stream: &StreamId, offset: u32) -> bool {
        let mut map = self.lock();
        let progress = map.entry(stream.clone()).or_default();
        match progress.stop {
            Some(stop) if stop <= offset => false,
            _ => {
                progress.stop = Some(offset);
                true
            }
        }
    }

    /// Bumps the completion counter of `stream` and returns the new count.
    pub fn record_completed(&self, stream: &StreamId) -> usize {
        let mut map = self.lock();
        let progress = map.entry(stream.clone()).or_default();
        progress.completed += 1;
        progress.completed
    }

    #[must_use]
    pub fn completed(&self, stream: &StreamId) -> usize {
        self.lock().get(stream).map_or(0, |p| p.completed)
    }

    /// Stop offsets of every stream seen so far.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<StreamId, Option<u32>> {
        self.lock()
            .iter()
            .map(|(id, p)| (id.clone(), p.stop))
            .collect()
    }
}
