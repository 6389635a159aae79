//! In-memory catalog session for tests

use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use super::*;

const IDLE_TIMEOUT: Duration = Duration::from_millis(20);

/// Minimal JPEG header, enough for format sniffing
pub fn jpeg_bytes() -> Bytes {
    Bytes::from_static(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00])
}

pub fn png_bytes() -> Bytes {
    Bytes::from_static(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00])
}

#[derive(Default)]
struct MockState {
    events: VecDeque<SessionEvent>,
    subscriptions: Subscriptions,
    playlists: Vec<PlaylistInfo>,
    tracks: Vec<TrackInfo>,
    albums: Vec<AlbumInfo>,
    covers: HashMap<AlbumId, Result<Bytes, SessionError>>,
    login_error: Option<SessionError>,
    hold_metadata: bool,
    held: VecDeque<(RequestId, Option<AlbumId>)>,
    next_request: u32,
    metadata_requests: Vec<TrackId>,
    artwork_requests: Vec<ImageId>,
    outstanding_metadata: usize,
    max_outstanding_metadata: usize,
    logged_out: bool,
}

impl MockState {
    fn next_request(&mut self) -> RequestId {
        let id = RequestId(self.next_request);
        self.next_request += 1;
        id
    }
}

/// Scripted session: everything is loaded up front and requests resolve on
/// the next `process_events` unless metadata requests are held.
pub struct MockSession {
    wake: WakeSignal,
    state: Mutex<MockState>,
}

impl MockSession {
    pub fn new(wake: WakeSignal) -> Self {
        Self {
            wake,
            state: Mutex::new(MockState::default()),
        }
    }

    /// Add an album; `cover` of `None` means the album has no cover image
    pub fn add_album(
        &self,
        artist: &str,
        name: &str,
        available: bool,
        cover: Option<Result<Bytes, SessionError>>,
    ) -> AlbumId {
        let mut state = self.state.lock().unwrap();
        let id = AlbumId(state.albums.len() as u32);
        state.albums.push(AlbumInfo {
            id,
            name: name.to_string(),
            artist: artist.to_string(),
            available,
        });
        if let Some(cover) = cover {
            state.covers.insert(id, cover);
        }
        id
    }

    pub fn add_track(&self, name: &str, album: Option<AlbumId>, available: bool) -> TrackId {
        let mut state = self.state.lock().unwrap();
        let id = TrackId(state.tracks.len() as u32);
        state.tracks.push(TrackInfo {
            id,
            name: name.to_string(),
            loaded: true,
            availability: if available {
                TrackAvailability::Available
            } else {
                TrackAvailability::Unavailable
            },
            album,
        });
        id
    }

    pub fn add_playlist(&self, name: &str, tracks: Vec<TrackId>) -> PlaylistId {
        let mut state = self.state.lock().unwrap();
        let id = PlaylistId(state.playlists.len() as u32);
        state.playlists.push(PlaylistInfo {
            id,
            name: name.to_string(),
            loaded: true,
            tracks,
        });
        id
    }

    pub fn set_track_loaded(&self, track: TrackId, loaded: bool) {
        let mut state = self.state.lock().unwrap();
        state.tracks[track.0 as usize].loaded = loaded;
    }

    pub fn fail_login(&self, error: SessionError) {
        self.state.lock().unwrap().login_error = Some(error);
    }

    /// Keep metadata requests unresolved until [`Self::release_metadata`]
    pub fn hold_metadata(&self, hold: bool) {
        self.state.lock().unwrap().hold_metadata = hold;
    }

    /// Resolve up to `count` held metadata requests, oldest first
    pub fn release_metadata(&self, count: usize) {
        {
            let mut state = self.state.lock().unwrap();
            for _ in 0..count {
                let Some((request, album)) = state.held.pop_front() else {
                    break;
                };
                state
                    .events
                    .push_back(SessionEvent::AlbumMetadataLoaded { request, album });
            }
        }
        self.wake.notify();
    }

    pub fn push_event(&self, event: SessionEvent) {
        self.state.lock().unwrap().events.push_back(event);
        self.wake.notify();
    }

    pub fn metadata_requests(&self) -> Vec<TrackId> {
        self.state.lock().unwrap().metadata_requests.clone()
    }

    pub fn artwork_requests(&self) -> Vec<ImageId> {
        self.state.lock().unwrap().artwork_requests.clone()
    }

    pub fn max_outstanding_metadata(&self) -> usize {
        self.state.lock().unwrap().max_outstanding_metadata
    }

    pub fn is_subscribed(&self, playlist: PlaylistId, set: CallbackSet) -> bool {
        self.state.lock().unwrap().subscriptions.contains(playlist, set)
    }

    pub fn is_logged_out(&self) -> bool {
        self.state.lock().unwrap().logged_out
    }
}

impl CatalogSession for MockSession {
    fn login(&self, _username: &str, _password: &str) {
        {
            let mut state = self.state.lock().unwrap();
            match state.login_error.clone() {
                Some(error) => state.events.push_back(SessionEvent::LoggedIn(Err(error))),
                None => {
                    let playlists = state.playlists.iter().map(|p| p.id).collect();
                    state.events.push_back(SessionEvent::LoggedIn(Ok(())));
                    state
                        .events
                        .push_back(SessionEvent::ContainerLoaded { playlists });
                }
            }
        }
        self.wake.notify();
    }

    fn logout(&self) {
        self.state.lock().unwrap().logged_out = true;
    }

    fn process_events(&self) -> EventBatch {
        let mut state = self.state.lock().unwrap();
        let mut events = Vec::new();
        while let Some(event) = state.events.pop_front() {
            if matches!(event, SessionEvent::AlbumMetadataLoaded { .. }) {
                state.outstanding_metadata = state.outstanding_metadata.saturating_sub(1);
            }
            if state.subscriptions.admits(&event) {
                events.push(event);
            }
        }
        EventBatch {
            events,
            next_timeout: IDLE_TIMEOUT,
        }
    }

    fn subscribe(&self, playlist: PlaylistId, set: CallbackSet) -> Result<(), SessionError> {
        {
            let mut state = self.state.lock().unwrap();
            if playlist.0 as usize >= state.playlists.len() {
                return Err(SessionError::NotFound(playlist.to_string()));
            }
            state.subscriptions.add(playlist, set);
            if set == CallbackSet::Skim {
                state
                    .events
                    .push_back(SessionEvent::PlaylistMetadataUpdated(playlist));
            }
        }
        self.wake.notify();
        Ok(())
    }

    fn unsubscribe(&self, playlist: PlaylistId, set: CallbackSet) {
        self.state.lock().unwrap().subscriptions.remove(playlist, set);
    }

    fn playlist(&self, id: PlaylistId) -> Option<PlaylistInfo> {
        self.state.lock().unwrap().playlists.get(id.0 as usize).cloned()
    }

    fn track(&self, id: TrackId) -> Option<TrackInfo> {
        self.state.lock().unwrap().tracks.get(id.0 as usize).cloned()
    }

    fn album(&self, id: AlbumId) -> Option<AlbumInfo> {
        self.state.lock().unwrap().albums.get(id.0 as usize).cloned()
    }

    fn album_cover(&self, album: AlbumId, size: ImageSize) -> Option<ImageId> {
        let state = self.state.lock().unwrap();
        state.covers.contains_key(&album).then(|| ImageId {
            key: album.0.to_string(),
            size,
        })
    }

    fn request_album_metadata(&self, track: TrackId) -> RequestId {
        let request = {
            let mut state = self.state.lock().unwrap();
            let request = state.next_request();
            let album = state.tracks.get(track.0 as usize).and_then(|t| t.album);
            state.metadata_requests.push(track);
            state.outstanding_metadata += 1;
            state.max_outstanding_metadata = state
                .max_outstanding_metadata
                .max(state.outstanding_metadata);
            if state.hold_metadata {
                state.held.push_back((request, album));
            } else {
                state
                    .events
                    .push_back(SessionEvent::AlbumMetadataLoaded { request, album });
            }
            request
        };
        self.wake.notify();
        request
    }

    fn request_artwork(&self, image: &ImageId) -> Result<RequestId, SessionError> {
        let request = {
            let mut state = self.state.lock().unwrap();
            if state.logged_out {
                return Err(SessionError::Closed);
            }
            let album = image
                .key
                .parse::<u32>()
                .map(AlbumId)
                .map_err(|_| SessionError::NotFound(image.key.clone()))?;
            let cover = state
                .covers
                .get(&album)
                .cloned()
                .ok_or(SessionError::NoCoverImage)?;
            let request = state.next_request();
            state.artwork_requests.push(image.clone());
            state.events.push_back(SessionEvent::ArtworkLoaded {
                request,
                image: cover.map(Artwork::new),
            });
            request
        };
        self.wake.notify();
        Ok(request)
    }
}
