//! Media catalog session abstraction
//!
//! The pipeline talks to the catalog only through [`CatalogSession`]. A session
//! issues requests without blocking and reports every completion as a
//! [`SessionEvent`], which the driver drains with
//! [`CatalogSession::process_events`] on its own task. Whenever new events are
//! queued the session pokes the shared [`WakeSignal`].

#[cfg(test)]
pub mod mock;
mod subscriptions;
mod types;
mod wake;

pub use subscriptions::{CallbackSet, Subscriptions};
pub use types::*;
pub use wake::WakeSignal;

use std::time::Duration;

/// Errors reported by a catalog session
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("login failed: {0}")]
    LoginFailed(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("no cover image available")]
    NoCoverImage,

    #[error("session is closed")]
    Closed,
}

/// Notification produced by the session, consumed by the pipeline driver
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Result of a [`CatalogSession::login`] call
    LoggedIn(Result<(), SessionError>),
    /// Transient connection problem; processing continues
    ConnectionError(SessionError),
    /// Diagnostic message from the session internals
    LogMessage(String),
    /// The user's root playlist container finished loading
    ContainerLoaded { playlists: Vec<PlaylistId> },
    /// Metadata of a subscribed playlist changed (name, load state, tracks)
    PlaylistMetadataUpdated(PlaylistId),
    /// New entries were appended to a playlist subscribed with the scan set
    TracksAdded { playlist: PlaylistId, count: usize },
    /// An album metadata request resolved; `album` is `None` if the lookup
    /// produced no album at all
    AlbumMetadataLoaded {
        request: RequestId,
        album: Option<AlbumId>,
    },
    /// An artwork request resolved
    ArtworkLoaded {
        request: RequestId,
        image: Result<Artwork, SessionError>,
    },
}

/// Events drained by one [`CatalogSession::process_events`] call
#[derive(Debug, Default)]
pub struct EventBatch {
    pub events: Vec<SessionEvent>,
    /// Delay before the session wants to be processed again. Zero means more
    /// work is immediately pending.
    pub next_timeout: Duration,
}

/// Session-based access to a media catalog
///
/// Accessors return snapshots; handles are arena ids owned by the session.
pub trait CatalogSession: Send + Sync + 'static {
    /// Start logging in. The outcome arrives as [`SessionEvent::LoggedIn`],
    /// followed by [`SessionEvent::ContainerLoaded`] on success.
    fn login(&self, username: &str, password: &str);

    /// Tear the session down. Requests still in flight are abandoned.
    fn logout(&self);

    /// Drain pending events
    fn process_events(&self) -> EventBatch;

    /// Register a callback set for a playlist
    fn subscribe(&self, playlist: PlaylistId, set: CallbackSet) -> Result<(), SessionError>;

    /// Remove a callback set from a playlist
    fn unsubscribe(&self, playlist: PlaylistId, set: CallbackSet);

    fn playlist(&self, id: PlaylistId) -> Option<PlaylistInfo>;

    fn track(&self, id: TrackId) -> Option<TrackInfo>;

    fn album(&self, id: AlbumId) -> Option<AlbumInfo>;

    /// Cover image identifier for an album at the given size tier
    fn album_cover(&self, album: AlbumId, size: ImageSize) -> Option<ImageId>;

    /// Look up the album of a track; resolves as
    /// [`SessionEvent::AlbumMetadataLoaded`]
    fn request_album_metadata(&self, track: TrackId) -> RequestId;

    /// Fetch an image; resolves as [`SessionEvent::ArtworkLoaded`]
    fn request_artwork(&self, image: &ImageId) -> Result<RequestId, SessionError>;
}
