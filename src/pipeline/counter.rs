use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Number of tracks whose artwork fetch is not yet resolved
///
/// Starts at one so the driver keeps running until the target playlist has
/// been found and the real track count is seeded. Reaching zero ends the run.
#[derive(Debug)]
pub struct OutstandingCounter {
    remaining: AtomicUsize,
    cancelled: AtomicBool,
}

impl Default for OutstandingCounter {
    fn default() -> Self {
        Self {
            remaining: AtomicUsize::new(1),
            cancelled: AtomicBool::new(false),
        }
    }
}

impl OutstandingCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the discovery placeholder with the playlist's track count.
    /// Ignored after cancellation.
    pub fn seed(&self, tracks: usize) {
        if !self.is_cancelled() {
            self.remaining.store(tracks, Ordering::SeqCst);
        }
    }

    /// Resolve one track. Saturates at zero, so completions arriving after a
    /// cancellation are harmless.
    pub fn decrement(&self) -> usize {
        match self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        {
            Ok(previous) => previous - 1,
            Err(_) => 0,
        }
    }

    /// Force the counter to zero
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.remaining.store(0, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::SeqCst)
    }

    pub fn is_settled(&self) -> bool {
        self.remaining() == 0
    }
}
