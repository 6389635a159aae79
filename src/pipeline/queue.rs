use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::session::TrackId;

/// Tracks awaiting an album metadata lookup
///
/// Handled as a stack: the most recently queued track is looked up first.
/// Completions are unordered anyway, so order only decides which albums are
/// fetched first under the ceiling.
#[derive(Debug, Default)]
pub struct WorkQueue {
    tracks: Mutex<Vec<TrackId>>,
    in_flight: AtomicUsize,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, track: TrackId) {
        self.lock().push(track);
    }

    /// Pop a track and count it as in flight, unless `ceiling` requests are
    /// already in flight or nothing is queued.
    pub fn claim(&self, ceiling: usize) -> Option<TrackId> {
        let mut tracks = self.lock();
        if self.in_flight.load(Ordering::SeqCst) >= ceiling {
            return None;
        }
        let track = tracks.pop()?;
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        Some(track)
    }

    /// Free the in-flight slot of a resolved metadata request
    pub fn finish(&self) {
        let _ = self
            .in_flight
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<TrackId>> {
        // A panic while holding the lock leaves a plain Vec behind, still usable
        self.tracks.lock().unwrap_or_else(|e| e.into_inner())
    }
}
