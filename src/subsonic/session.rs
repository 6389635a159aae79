//! [`CatalogSession`] backed by a Subsonic server
//!
//! Every request runs as a tokio task against [`SubsonicClient`]; its outcome
//! is queued as a [`SessionEvent`] and the driver is woken. Entities are kept
//! in arenas indexed by the session's ids.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::runtime::Handle;
use tracing::debug;

use super::client::{ClientError, SubsonicClient};
use super::models::{AlbumWithSongs, PlaylistSummary, PlaylistWithSongs};
use crate::session::{
    AlbumId, AlbumInfo, Artwork, CallbackSet, CatalogSession, EventBatch, ImageId, ImageSize,
    PlaylistId, PlaylistInfo, RequestId, SessionError, SessionEvent, Subscriptions,
    TrackAvailability, TrackId, TrackInfo, WakeSignal,
};

/// Events handed out per `process_events` call
const BATCH_LIMIT: usize = 16;

/// Suggested wait when nothing is pending
const IDLE_TIMEOUT: Duration = Duration::from_secs(1);

const LOAD_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_millis(500);

struct PlaylistRecord {
    key: String,
    info: PlaylistInfo,
}

struct AlbumRecord {
    key: String,
    cover_art: Option<String>,
    info: AlbumInfo,
}

/// Everything the session knows, guarded by one lock
#[derive(Default)]
struct Catalog {
    events: VecDeque<SessionEvent>,
    subscriptions: Subscriptions,
    playlists: Vec<PlaylistRecord>,
    tracks: Vec<TrackInfo>,
    albums: Vec<AlbumRecord>,
    album_index: HashMap<String, AlbumId>,
    closed: bool,
}

impl Catalog {
    fn push(&mut self, event: SessionEvent) {
        if !self.closed {
            self.events.push_back(event);
        }
    }

    fn add_playlists(&mut self, summaries: Vec<PlaylistSummary>) -> Vec<PlaylistId> {
        summaries
            .into_iter()
            .map(|summary| {
                let id = PlaylistId(self.playlists.len() as u32);
                self.playlists.push(PlaylistRecord {
                    key: summary.id,
                    info: PlaylistInfo {
                        id,
                        name: summary.name,
                        loaded: false,
                        tracks: Vec::new(),
                    },
                });
                id
            })
            .collect()
    }

    fn playlist_key(&self, id: PlaylistId) -> Option<String> {
        self.playlists.get(id.0 as usize).map(|p| p.key.clone())
    }

    /// Album record for the song's album, created on first sight
    fn intern_album(
        &mut self,
        key: &str,
        name: Option<&str>,
        artist: Option<&str>,
        cover_art: Option<&str>,
    ) -> AlbumId {
        if let Some(id) = self.album_index.get(key) {
            return *id;
        }
        let id = AlbumId(self.albums.len() as u32);
        self.albums.push(AlbumRecord {
            key: key.to_string(),
            cover_art: cover_art.map(str::to_string),
            info: AlbumInfo {
                id,
                name: name.unwrap_or_default().to_string(),
                artist: artist.unwrap_or_default().to_string(),
                available: false,
            },
        });
        self.album_index.insert(key.to_string(), id);
        id
    }

    /// Store a loaded playlist. Entries beyond the ones already known become
    /// new tracks. Returns whether the playlist was loaded before and how
    /// many tracks were added.
    fn fill_playlist(&mut self, id: PlaylistId, loaded: PlaylistWithSongs) -> (bool, usize) {
        let Some(known) = self.playlists.get(id.0 as usize).map(|p| p.info.tracks.len()) else {
            return (false, 0);
        };

        let mut added = Vec::new();
        for song in loaded.songs.into_iter().skip(known) {
            let album = song.album_id.as_deref().map(|key| {
                self.intern_album(
                    key,
                    song.album.as_deref(),
                    song.artist.as_deref(),
                    song.cover_art.as_deref(),
                )
            });
            let track = TrackId(self.tracks.len() as u32);
            self.tracks.push(TrackInfo {
                id: track,
                name: song.title,
                loaded: true,
                availability: if album.is_some() {
                    TrackAvailability::Available
                } else {
                    TrackAvailability::Unavailable
                },
                album,
            });
            added.push(track);
        }

        let record = &mut self.playlists[id.0 as usize];
        let was_loaded = record.info.loaded;
        record.info.name = loaded.name;
        record.info.loaded = true;
        let count = added.len();
        record.info.tracks.extend(added);
        (was_loaded, count)
    }

    /// An album only counts as available if the server lists songs for it
    fn apply_album(&mut self, id: AlbumId, loaded: &AlbumWithSongs) {
        if let Some(record) = self.albums.get_mut(id.0 as usize) {
            record.info.name = loaded.name.clone();
            if let Some(artist) = &loaded.artist {
                record.info.artist = artist.clone();
            }
            if loaded.cover_art.is_some() {
                record.cover_art = loaded.cover_art.clone();
            }
            record.info.available = !loaded.song.is_empty();
        }
    }

    fn track_album(&self, track: TrackId) -> Option<(AlbumId, String)> {
        let album = self.tracks.get(track.0 as usize)?.album?;
        let key = self.albums.get(album.0 as usize)?.key.clone();
        Some((album, key))
    }
}

struct Shared {
    catalog: Mutex<Catalog>,
    wake: WakeSignal,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Catalog> {
        self.catalog.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, events: impl IntoIterator<Item = SessionEvent>) {
        {
            let mut catalog = self.lock();
            for event in events {
                catalog.push(event);
            }
        }
        self.wake.notify();
    }
}

fn connection_error(error: &ClientError) -> SessionError {
    SessionError::Connection(error.to_string())
}

/// Catalog session talking to a Subsonic server
pub struct SubsonicSession {
    client: Mutex<SubsonicClient>,
    shared: Arc<Shared>,
    runtime: Handle,
    next_request: AtomicU32,
}

impl SubsonicSession {
    /// Must be called from within a tokio runtime; requests are spawned on it
    pub fn new(client: SubsonicClient, wake: WakeSignal) -> Self {
        Self {
            client: Mutex::new(client),
            shared: Arc::new(Shared {
                catalog: Mutex::new(Catalog::default()),
                wake,
            }),
            runtime: Handle::current(),
            next_request: AtomicU32::new(0),
        }
    }

    fn client(&self) -> SubsonicClient {
        self.client
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn next_request(&self) -> RequestId {
        RequestId(self.next_request.fetch_add(1, Ordering::Relaxed))
    }

    fn spawn_playlist_load(&self, playlist: PlaylistId, key: String) {
        let client = self.client();
        let shared = self.shared.clone();

        self.runtime.spawn(async move {
            let mut attempt = 1;
            let loaded = loop {
                match client.get_playlist(&key).await {
                    Ok(loaded) => break loaded,
                    Err(e) if attempt < LOAD_ATTEMPTS && !e.is_not_found() => {
                        shared.emit([SessionEvent::LogMessage(format!(
                            "Loading {} failed ({}), retrying",
                            playlist, e
                        ))]);
                        tokio::time::sleep(RETRY_DELAY * attempt).await;
                        attempt += 1;
                    }
                    Err(e) => {
                        shared.emit([SessionEvent::ConnectionError(connection_error(&e))]);
                        return;
                    }
                }
            };

            let (was_loaded, added) = shared.lock().fill_playlist(playlist, loaded);
            let mut events = Vec::new();
            if was_loaded && added > 0 {
                events.push(SessionEvent::TracksAdded {
                    playlist,
                    count: added,
                });
            }
            if !was_loaded || added > 0 {
                events.push(SessionEvent::PlaylistMetadataUpdated(playlist));
            }
            shared.emit(events);
        });
    }
}

impl CatalogSession for SubsonicSession {
    fn login(&self, username: &str, password: &str) {
        let client = {
            let mut guard = self
                .client
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            *guard = guard.with_credentials(username, password);
            guard.clone()
        };
        let shared = self.shared.clone();

        self.runtime.spawn(async move {
            if let Err(e) = client.ping().await {
                let error = if e.is_auth_failure() {
                    SessionError::LoginFailed(e.to_string())
                } else {
                    connection_error(&e)
                };
                shared.emit([SessionEvent::LoggedIn(Err(error))]);
                return;
            }

            match client.get_playlists().await {
                Ok(summaries) => {
                    let playlists = shared.lock().add_playlists(summaries);
                    shared.emit([
                        SessionEvent::LoggedIn(Ok(())),
                        SessionEvent::ContainerLoaded { playlists },
                    ]);
                }
                Err(e) => shared.emit([SessionEvent::LoggedIn(Err(connection_error(&e)))]),
            }
        });
    }

    fn logout(&self) {
        let mut catalog = self.shared.lock();
        catalog.closed = true;
        catalog.events.clear();
        debug!("Session closed");
    }

    fn process_events(&self) -> EventBatch {
        let mut catalog = self.shared.lock();
        let mut events = Vec::new();
        while events.len() < BATCH_LIMIT {
            let Some(event) = catalog.events.pop_front() else {
                break;
            };
            if catalog.subscriptions.admits(&event) {
                events.push(event);
            }
        }

        let next_timeout = if catalog.events.is_empty() {
            IDLE_TIMEOUT
        } else {
            Duration::ZERO
        };
        EventBatch {
            events,
            next_timeout,
        }
    }

    fn subscribe(&self, playlist: PlaylistId, set: CallbackSet) -> Result<(), SessionError> {
        let key = {
            let mut catalog = self.shared.lock();
            if catalog.closed {
                return Err(SessionError::Closed);
            }
            let key = catalog
                .playlist_key(playlist)
                .ok_or_else(|| SessionError::NotFound(playlist.to_string()))?;
            if !catalog.subscriptions.add(playlist, set) {
                return Ok(());
            }
            key
        };

        // A first subscription loads the entries, a scan subscription
        // refreshes them to pick up additions
        self.spawn_playlist_load(playlist, key);
        Ok(())
    }

    fn unsubscribe(&self, playlist: PlaylistId, set: CallbackSet) {
        self.shared.lock().subscriptions.remove(playlist, set);
    }

    fn playlist(&self, id: PlaylistId) -> Option<PlaylistInfo> {
        self.shared
            .lock()
            .playlists
            .get(id.0 as usize)
            .map(|p| p.info.clone())
    }

    fn track(&self, id: TrackId) -> Option<TrackInfo> {
        self.shared.lock().tracks.get(id.0 as usize).cloned()
    }

    fn album(&self, id: AlbumId) -> Option<AlbumInfo> {
        self.shared
            .lock()
            .albums
            .get(id.0 as usize)
            .map(|a| a.info.clone())
    }

    fn album_cover(&self, album: AlbumId, size: ImageSize) -> Option<ImageId> {
        let catalog = self.shared.lock();
        let key = catalog.albums.get(album.0 as usize)?.cover_art.clone()?;
        Some(ImageId { key, size })
    }

    fn request_album_metadata(&self, track: TrackId) -> RequestId {
        let request = self.next_request();
        let Some((album, key)) = self.shared.lock().track_album(track) else {
            self.shared
                .emit([SessionEvent::AlbumMetadataLoaded { request, album: None }]);
            return request;
        };

        let client = self.client();
        let shared = self.shared.clone();
        self.runtime.spawn(async move {
            let events = match client.get_album(&key).await {
                Ok(loaded) => {
                    shared.lock().apply_album(album, &loaded);
                    vec![SessionEvent::AlbumMetadataLoaded {
                        request,
                        album: Some(album),
                    }]
                }
                Err(e) if e.is_not_found() => {
                    vec![SessionEvent::AlbumMetadataLoaded { request, album: None }]
                }
                Err(e) => vec![
                    SessionEvent::ConnectionError(connection_error(&e)),
                    SessionEvent::AlbumMetadataLoaded { request, album: None },
                ],
            };
            shared.emit(events);
        });
        request
    }

    fn request_artwork(&self, image: &ImageId) -> Result<RequestId, SessionError> {
        if self.shared.lock().closed {
            return Err(SessionError::Closed);
        }

        let request = self.next_request();
        let client = self.client();
        let shared = self.shared.clone();
        let key = image.key.clone();
        let pixels = image.size.pixels();

        self.runtime.spawn(async move {
            let image = client
                .get_cover_art(&key, pixels)
                .await
                .map(Artwork::new)
                .map_err(|e| {
                    if e.is_not_found() {
                        SessionError::NoCoverImage
                    } else {
                        connection_error(&e)
                    }
                });
            shared.emit([SessionEvent::ArtworkLoaded { request, image }]);
        });
        Ok(request)
    }
}
