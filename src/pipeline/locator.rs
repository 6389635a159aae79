//! Target playlist discovery and track enumeration

use std::collections::HashSet;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

use super::PipelineContext;
use crate::session::{CatalogSession, PlaylistId, TrackInfo};

/// Progress of the playlist match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MatchState {
    Unmatched = 0,
    /// Tracks enumerated, callback-set swap not yet applied
    Browsing = 1,
    /// Playlist observed through the scan set
    Done = 2,
}

impl From<u8> for MatchState {
    fn from(value: u8) -> Self {
        match value {
            0 => MatchState::Unmatched,
            1 => MatchState::Browsing,
            _ => MatchState::Done,
        }
    }
}

/// Match state plus the matched playlist, shared through the context
#[derive(Debug, Default)]
pub struct MatchTracker {
    state: AtomicU8,
    playlist: OnceLock<PlaylistId>,
}

impl MatchTracker {
    pub fn state(&self) -> MatchState {
        self.state.load(Ordering::SeqCst).into()
    }

    pub fn is_matched(&self) -> bool {
        self.state() != MatchState::Unmatched
    }

    pub fn playlist(&self) -> Option<PlaylistId> {
        self.playlist.get().copied()
    }

    /// Unmatched -> Browsing. Succeeds once per run.
    fn begin_browsing(&self, playlist: PlaylistId) -> bool {
        let won = self
            .state
            .compare_exchange(
                MatchState::Unmatched as u8,
                MatchState::Browsing as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok();
        if won {
            let _ = self.playlist.set(playlist);
        }
        won
    }

    /// Browsing -> Done, handing out the playlist whose subscription must be
    /// swapped. Returns `None` on every later call.
    pub fn take_pending_swap(&self) -> Option<PlaylistId> {
        self.state
            .compare_exchange(
                MatchState::Browsing as u8,
                MatchState::Done as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .ok()
            .and_then(|_| self.playlist())
    }
}

/// What a metadata notification led to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocateOutcome {
    /// Not the target, or the target was already matched
    Ignored,
    /// Target found but not fully loaded yet
    Deferred,
    /// Target enumerated into the work queue
    Enumerated { queued: usize, skipped: usize },
    /// Every playlist loaded and none matched
    NotFound,
}

/// Compares playlist names the way the target is matched
pub fn names_match(name: &str, target: &str) -> bool {
    name.eq_ignore_ascii_case(target)
}

pub struct PlaylistLocator<S> {
    session: Arc<S>,
    ctx: Arc<PipelineContext>,
    target: String,
    container_size: Option<usize>,
    loaded_elsewhere: HashSet<PlaylistId>,
}

impl<S: CatalogSession> PlaylistLocator<S> {
    pub fn new(session: Arc<S>, ctx: Arc<PipelineContext>, target: impl Into<String>) -> Self {
        Self {
            session,
            ctx,
            target: target.into(),
            container_size: None,
            loaded_elsewhere: HashSet::new(),
        }
    }

    /// Record how many playlists the container holds
    pub fn container_loaded(&mut self, playlists: usize) {
        self.container_size = Some(playlists);
    }

    pub fn on_metadata_updated(&mut self, playlist: PlaylistId) -> LocateOutcome {
        if self.ctx.matched.is_matched() {
            return LocateOutcome::Ignored;
        }

        let Some(info) = self.session.playlist(playlist) else {
            debug!("Metadata update for unknown {}", playlist);
            return LocateOutcome::Ignored;
        };

        if !names_match(&info.name, &self.target) {
            if info.loaded {
                self.loaded_elsewhere.insert(playlist);
                if self
                    .container_size
                    .is_some_and(|size| self.loaded_elsewhere.len() >= size)
                {
                    return LocateOutcome::NotFound;
                }
            }
            return LocateOutcome::Ignored;
        }

        if !info.loaded {
            debug!("Playlist {} not loaded yet", info.name);
            return LocateOutcome::Deferred;
        }

        let tracks: Option<Vec<TrackInfo>> = info
            .tracks
            .iter()
            .map(|id| self.session.track(*id).filter(|t| t.loaded))
            .collect();
        let Some(tracks) = tracks else {
            debug!("Playlist {} has tracks still loading", info.name);
            return LocateOutcome::Deferred;
        };

        if !self.ctx.matched.begin_browsing(playlist) {
            return LocateOutcome::Ignored;
        }

        info!("Playlist loaded: {} ({} tracks)", info.name, tracks.len());
        self.ctx.counter.seed(tracks.len());

        let mut queued = 0;
        let mut skipped = 0;
        for (index, track) in tracks.into_iter().enumerate() {
            if track.is_available() {
                self.ctx.queue.push(track.id);
                queued += 1;
            } else {
                warn!("Track {}: {} is not available", index + 1, track.name);
                self.ctx.counter.decrement();
                skipped += 1;
            }
        }

        LocateOutcome::Enumerated { queued, skipped }
    }

    pub fn on_tracks_added(&self, playlist: PlaylistId, count: usize) {
        if let Some(info) = self.session.playlist(playlist) {
            if names_match(&info.name, &self.target) {
                info!("{} tracks added to {}", count, info.name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::mock::MockSession;
    use crate::session::WakeSignal;

    fn setup() -> (Arc<MockSession>, Arc<PipelineContext>) {
        let wake = WakeSignal::new();
        (
            Arc::new(MockSession::new(wake.clone())),
            Arc::new(PipelineContext::new(wake)),
        )
    }

    #[test]
    fn test_names_match_ignores_case() {
        assert!(names_match("Road Trip", "road trip"));
        assert!(names_match("ROAD TRIP", "Road Trip"));
        assert!(!names_match("Road Trip 2", "Road Trip"));
    }

    #[test]
    fn test_road_trip_skips_unavailable_track() {
        let (session, ctx) = setup();
        let album = session.add_album("Artist", "Album", true, None);
        let t1 = session.add_track("One", Some(album), true);
        let t2 = session.add_track("Two", Some(album), false);
        let t3 = session.add_track("Three", Some(album), true);
        let playlist = session.add_playlist("Road Trip", vec![t1, t2, t3]);

        let mut locator = PlaylistLocator::new(session, ctx.clone(), "road trip");
        let outcome = locator.on_metadata_updated(playlist);

        assert_eq!(outcome, LocateOutcome::Enumerated { queued: 2, skipped: 1 });
        assert_eq!(ctx.counter.remaining(), 2);
        assert_eq!(ctx.queue.len(), 2);
        assert_eq!(ctx.matched.state(), MatchState::Browsing);
        assert_eq!(ctx.matched.playlist(), Some(playlist));
    }

    #[test]
    fn test_defers_until_tracks_loaded() {
        let (session, ctx) = setup();
        let t1 = session.add_track("One", None, true);
        let playlist = session.add_playlist("Mix", vec![t1]);
        session.set_track_loaded(t1, false);

        let mut locator = PlaylistLocator::new(session.clone(), ctx.clone(), "Mix");
        assert_eq!(locator.on_metadata_updated(playlist), LocateOutcome::Deferred);
        assert_eq!(ctx.matched.state(), MatchState::Unmatched);
        assert_eq!(ctx.counter.remaining(), 1);

        session.set_track_loaded(t1, true);
        assert_eq!(
            locator.on_metadata_updated(playlist),
            LocateOutcome::Enumerated { queued: 1, skipped: 0 }
        );
    }

    #[test]
    fn test_repeated_notifications_do_not_requeue() {
        let (session, ctx) = setup();
        let t1 = session.add_track("One", None, true);
        let playlist = session.add_playlist("Mix", vec![t1]);
        let other = session.add_playlist("mix", vec![t1]);

        let mut locator = PlaylistLocator::new(session, ctx.clone(), "Mix");
        locator.on_metadata_updated(playlist);
        assert_eq!(locator.on_metadata_updated(playlist), LocateOutcome::Ignored);
        assert_eq!(locator.on_metadata_updated(other), LocateOutcome::Ignored);
        assert_eq!(ctx.queue.len(), 1);
    }

    #[test]
    fn test_not_found_after_all_playlists_loaded() {
        let (session, ctx) = setup();
        let a = session.add_playlist("Chill", vec![]);
        let b = session.add_playlist("Focus", vec![]);

        let mut locator = PlaylistLocator::new(session, ctx, "Road Trip");
        locator.container_loaded(2);
        assert_eq!(locator.on_metadata_updated(a), LocateOutcome::Ignored);
        assert_eq!(locator.on_metadata_updated(b), LocateOutcome::NotFound);
    }

    #[test]
    fn test_swap_is_handed_out_once() {
        let (session, ctx) = setup();
        let playlist = session.add_playlist("Mix", vec![]);
        let mut locator = PlaylistLocator::new(session, ctx.clone(), "Mix");

        assert_eq!(ctx.matched.take_pending_swap(), None);
        locator.on_metadata_updated(playlist);
        assert_eq!(ctx.matched.take_pending_swap(), Some(playlist));
        assert_eq!(ctx.matched.take_pending_swap(), None);
        assert_eq!(ctx.matched.state(), MatchState::Done);
    }
}
