//! Throttled fetch worker

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::PipelineContext;
use crate::session::CatalogSession;

/// Background task issuing album metadata requests for queued tracks
///
/// Polls the work queue every `poll_interval`; the queue is filled from the
/// driver task and nothing signals new arrivals.
pub struct FetchWorker {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl FetchWorker {
    pub fn spawn<S: CatalogSession>(
        session: Arc<S>,
        ctx: Arc<PipelineContext>,
        max_in_flight: usize,
        poll_interval: Duration,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();

        let handle = tokio::spawn(async move {
            while !flag.load(Ordering::SeqCst) {
                if let Some(track) = ctx.queue.claim(max_in_flight) {
                    let request = session.request_album_metadata(track);
                    debug!(
                        "Album lookup {} for {} ({} in flight)",
                        request,
                        track,
                        ctx.queue.in_flight()
                    );
                }
                tokio::time::sleep(poll_interval).await;
            }
            debug!("Fetch worker stopped");
        });

        Self { stop, handle }
    }

    /// Signal the worker and wait for it to exit
    pub async fn stop(self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Err(e) = self.handle.await {
            warn!("Fetch worker panicked: {}", e);
        }
    }
}
