//! Pipeline driver: the session event loop

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{
    CompletionHandlers, FetchWorker, LocateOutcome, PipelineContext, PipelineError,
    PipelineSettings, PlaylistLocator, RunStatus, RunSummary,
};
use crate::session::{CallbackSet, CatalogSession, Credentials, PlaylistId, SessionEvent};
use crate::storage::ArtworkStorage;

/// Stops a running pipeline from outside (e.g. a Ctrl-C handler)
#[derive(Debug, Clone)]
pub struct CancelHandle {
    ctx: Arc<PipelineContext>,
}

impl CancelHandle {
    /// Abandon all outstanding work. The driver exits on its next wake-up.
    pub fn cancel(&self) {
        self.ctx.counter.cancel();
        self.ctx.wake.notify();
    }
}

/// Owns the event loop and every handler that runs on it
pub struct PipelineDriver<S: CatalogSession> {
    session: Arc<S>,
    ctx: Arc<PipelineContext>,
    settings: PipelineSettings,
    storage: ArtworkStorage,
    locator: PlaylistLocator<S>,
    handlers: CompletionHandlers<S>,
    unavailable_tracks: usize,
}

impl<S: CatalogSession> PipelineDriver<S> {
    /// `ctx.wake` must be the signal the session notifies
    pub fn new(session: Arc<S>, ctx: Arc<PipelineContext>, settings: PipelineSettings) -> Self {
        let storage = ArtworkStorage::new(settings.output_dir.clone());
        let locator =
            PlaylistLocator::new(session.clone(), ctx.clone(), settings.target_playlist.clone());
        let handlers = CompletionHandlers::new(
            session.clone(),
            ctx.clone(),
            storage.clone(),
            settings.image_size,
            settings.expected_format,
        );

        Self {
            session,
            ctx,
            settings,
            storage,
            locator,
            handlers,
            unavailable_tracks: 0,
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            ctx: self.ctx.clone(),
        }
    }

    /// Log in, fetch artwork for the target playlist, log out
    pub async fn run(mut self, credentials: Credentials) -> Result<RunSummary, PipelineError> {
        self.storage
            .init()
            .map_err(|source| PipelineError::OutputDir {
                path: self.storage.root().to_path_buf(),
                source,
            })?;

        self.session
            .login(&credentials.username, &credentials.password);

        let worker = FetchWorker::spawn(
            self.session.clone(),
            self.ctx.clone(),
            self.settings.max_in_flight,
            self.settings.poll_interval,
        );

        let outcome = self.event_loop().await;

        worker.stop().await;
        self.session.logout();

        let status = outcome?;
        Ok(RunSummary {
            status,
            written: self.handlers.written(),
            skipped: self.handlers.skipped() + self.unavailable_tracks,
            failed: self.handlers.failed(),
        })
    }

    async fn event_loop(&mut self) -> Result<RunStatus, PipelineError> {
        let mut next_timeout = Duration::ZERO;

        while !self.ctx.counter.is_settled() {
            self.ctx.wake.wait(next_timeout).await;

            loop {
                let batch = self.session.process_events();
                for event in batch.events {
                    if let ControlFlow::Break(status) = self.dispatch(event).await? {
                        return Ok(status);
                    }
                }
                next_timeout = batch.next_timeout;
                if !next_timeout.is_zero() {
                    break;
                }
            }

            if let Some(playlist) = self.ctx.matched.take_pending_swap() {
                self.swap_callbacks(playlist);
            }

            let in_flight = self.ctx.queue.in_flight();
            if in_flight > 0 {
                debug!(
                    "Currently processing {} tracks ({} remaining)",
                    in_flight,
                    self.ctx.counter.remaining()
                );
            }
        }

        if self.ctx.counter.is_cancelled() {
            info!("Cancelled, abandoning outstanding requests");
            Ok(RunStatus::Cancelled)
        } else {
            Ok(RunStatus::Completed)
        }
    }

    async fn dispatch(
        &mut self,
        event: SessionEvent,
    ) -> Result<ControlFlow<RunStatus>, PipelineError> {
        match event {
            SessionEvent::LoggedIn(Ok(())) => info!("Login successful"),
            SessionEvent::LoggedIn(Err(e)) => return Err(PipelineError::Login(e)),
            SessionEvent::ConnectionError(e) => warn!("Catalog connection error: {}", e),
            SessionEvent::LogMessage(message) => debug!("{}", message.trim_end()),
            SessionEvent::ContainerLoaded { playlists } => {
                info!("{} root playlists loaded", playlists.len());
                if playlists.is_empty() {
                    return Ok(ControlFlow::Break(RunStatus::NoPlaylists));
                }
                self.locator.container_loaded(playlists.len());
                for playlist in playlists {
                    if let Err(e) = self.session.subscribe(playlist, CallbackSet::Skim) {
                        warn!("Failed to watch {}: {}", playlist, e);
                    }
                }
            }
            SessionEvent::PlaylistMetadataUpdated(playlist) => {
                match self.locator.on_metadata_updated(playlist) {
                    LocateOutcome::Enumerated { queued, skipped } => {
                        self.unavailable_tracks += skipped;
                        debug!("{} tracks queued, {} unavailable", queued, skipped);
                    }
                    LocateOutcome::NotFound => {
                        return Err(PipelineError::PlaylistNotFound(
                            self.settings.target_playlist.clone(),
                        ));
                    }
                    LocateOutcome::Ignored | LocateOutcome::Deferred => {}
                }
            }
            SessionEvent::TracksAdded { playlist, count } => {
                self.locator.on_tracks_added(playlist, count)
            }
            SessionEvent::AlbumMetadataLoaded { request, album } => {
                self.handlers.on_album_metadata(request, album)
            }
            SessionEvent::ArtworkLoaded { request, image } => {
                self.handlers.on_artwork(request, image).await
            }
        }
        Ok(ControlFlow::Continue(()))
    }

    /// Move the matched playlist from the skim set to the scan set.
    /// Only called between event batches, never from a handler.
    fn swap_callbacks(&self, playlist: PlaylistId) {
        if let Err(e) = self.session.subscribe(playlist, CallbackSet::Scan) {
            warn!("Failed to scan {}: {}", playlist, e);
        }
        self.session.unsubscribe(playlist, CallbackSet::Skim);
        debug!("{} switched to scan callbacks", playlist);
    }
}
