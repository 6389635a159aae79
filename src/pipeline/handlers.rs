//! Completion handlers for album metadata and artwork requests
//!
//! Both run on the driver task. Every path that ends a track's journey
//! decrements the outstanding counter exactly once.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::PipelineContext;
use crate::session::{
    AlbumId, Artwork, CatalogSession, ImageFormat, ImageSize, RequestId, SessionError,
};
use crate::storage::{ArtworkLabel, ArtworkStorage};

pub struct CompletionHandlers<S> {
    session: Arc<S>,
    ctx: Arc<PipelineContext>,
    storage: ArtworkStorage,
    image_size: ImageSize,
    expected_format: ImageFormat,
    pending: HashMap<RequestId, ArtworkLabel>,
    requested_albums: HashSet<AlbumId>,
    written: usize,
    skipped: usize,
    failed: usize,
}

impl<S: CatalogSession> CompletionHandlers<S> {
    pub fn new(
        session: Arc<S>,
        ctx: Arc<PipelineContext>,
        storage: ArtworkStorage,
        image_size: ImageSize,
        expected_format: ImageFormat,
    ) -> Self {
        Self {
            session,
            ctx,
            storage,
            image_size,
            expected_format,
            pending: HashMap::new(),
            requested_albums: HashSet::new(),
            written: 0,
            skipped: 0,
            failed: 0,
        }
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Artwork requests not resolved yet
    pub fn pending_artwork(&self) -> usize {
        self.pending.len()
    }

    /// An album lookup resolved: request the cover, or skip the track
    pub fn on_album_metadata(&mut self, request: RequestId, album: Option<AlbumId>) {
        self.ctx.queue.finish();

        let Some(album) = album.and_then(|id| self.session.album(id)) else {
            warn!("Null album in lookup {}", request);
            self.skip();
            return;
        };

        if !album.available {
            warn!("Album not available: {} - {}", album.artist, album.name);
            self.skip();
            return;
        }

        if !self.requested_albums.insert(album.id) {
            debug!("Artwork for {} - {} already requested", album.artist, album.name);
            self.skip();
            return;
        }

        let requested = self
            .session
            .album_cover(album.id, self.image_size)
            .ok_or(SessionError::NoCoverImage)
            .and_then(|image| self.session.request_artwork(&image));

        match requested {
            Ok(artwork_request) => {
                debug!(
                    "Artwork {} requested for {} - {}",
                    artwork_request, album.artist, album.name
                );
                self.pending
                    .insert(artwork_request, ArtworkLabel::new(album.artist, album.name));
            }
            Err(e) => {
                warn!(
                    "Album cover not available for {} - {}: {}",
                    album.artist, album.name, e
                );
                self.skip();
            }
        }
    }

    /// An artwork request resolved: write the file
    pub async fn on_artwork(&mut self, request: RequestId, image: Result<Artwork, SessionError>) {
        let Some(label) = self.pending.remove(&request) else {
            debug!("Ignoring artwork for unknown request {}", request);
            return;
        };

        match image {
            Ok(artwork) => self.write(&label, artwork).await,
            Err(e) => {
                warn!("Failed to fetch artwork for {} - {}: {}", label.artist, label.album, e);
                self.failed += 1;
            }
        }

        self.ctx.counter.decrement();
    }

    async fn write(&mut self, label: &ArtworkLabel, artwork: Artwork) {
        if artwork.format != self.expected_format {
            warn!(
                "Unsupported image format for {} - {}: {}",
                label.artist, label.album, artwork.format
            );
        }

        let path = self.storage.path_for(label, self.expected_format);
        info!("Writing {} --- {} bytes", path.display(), artwork.data.len());

        match self
            .storage
            .write(label, self.expected_format, &artwork.data)
            .await
        {
            Ok(_) => self.written += 1,
            Err(e) => {
                warn!("{:#}", e);
                self.failed += 1;
            }
        }
    }

    fn skip(&mut self) {
        self.skipped += 1;
        self.ctx.counter.decrement();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::mock::{jpeg_bytes, png_bytes, MockSession};
    use crate::session::{SessionEvent, WakeSignal};

    struct Fixture {
        session: Arc<MockSession>,
        ctx: Arc<PipelineContext>,
        handlers: CompletionHandlers<MockSession>,
        dir: tempfile::TempDir,
    }

    fn fixture(tracks: usize) -> Fixture {
        let wake = WakeSignal::new();
        let session = Arc::new(MockSession::new(wake.clone()));
        let ctx = Arc::new(PipelineContext::new(wake));
        ctx.counter.seed(tracks);
        let dir = tempfile::tempdir().unwrap();
        let storage = ArtworkStorage::new(dir.path());
        let handlers = CompletionHandlers::new(
            session.clone(),
            ctx.clone(),
            storage,
            ImageSize::Large,
            ImageFormat::Jpeg,
        );
        Fixture {
            session,
            ctx,
            handlers,
            dir,
        }
    }

    /// Deliver queued artwork events to the handlers
    async fn drain_artwork(f: &mut Fixture) {
        for event in f.session.process_events().events {
            if let SessionEvent::ArtworkLoaded { request, image } = event {
                f.handlers.on_artwork(request, image).await;
            }
        }
    }

    #[tokio::test]
    async fn test_available_album_writes_file() {
        let mut f = fixture(1);
        let album = f
            .session
            .add_album("Boards of Canada", "Geogaddi", true, Some(Ok(jpeg_bytes())));

        f.handlers.on_album_metadata(RequestId(100), Some(album));
        assert_eq!(f.ctx.counter.remaining(), 1);
        assert_eq!(f.handlers.pending_artwork(), 1);
        assert_eq!(f.session.artwork_requests()[0].size, ImageSize::Large);

        drain_artwork(&mut f).await;

        let path = f.dir.path().join("Boards of Canada - Geogaddi.jpg");
        assert_eq!(std::fs::read(path).unwrap(), jpeg_bytes().to_vec());
        assert_eq!(f.ctx.counter.remaining(), 0);
        assert_eq!(f.handlers.written(), 1);
    }

    #[tokio::test]
    async fn test_unexpected_format_still_written() {
        let mut f = fixture(1);
        let album = f.session.add_album("Artist", "Album", true, Some(Ok(png_bytes())));

        f.handlers.on_album_metadata(RequestId(1), Some(album));
        drain_artwork(&mut f).await;

        let path = f.dir.path().join("Artist - Album.jpg");
        assert_eq!(std::fs::read(path).unwrap(), png_bytes().to_vec());
        assert!(f.ctx.counter.is_settled());
    }

    #[test]
    fn test_null_and_unavailable_album_skip() {
        let mut f = fixture(2);
        let album = f.session.add_album("Artist", "Gone", false, Some(Ok(jpeg_bytes())));

        f.handlers.on_album_metadata(RequestId(1), None);
        f.handlers.on_album_metadata(RequestId(2), Some(album));

        assert!(f.ctx.counter.is_settled());
        assert_eq!(f.handlers.skipped(), 2);
        assert!(f.session.artwork_requests().is_empty());
    }

    #[test]
    fn test_missing_cover_resolves_track() {
        let mut f = fixture(1);
        let album = f.session.add_album("Artist", "No Cover", true, None);

        f.handlers.on_album_metadata(RequestId(1), Some(album));

        assert!(f.ctx.counter.is_settled());
        assert_eq!(f.handlers.pending_artwork(), 0);
    }

    #[tokio::test]
    async fn test_failed_fetch_resolves_track() {
        let mut f = fixture(1);
        let album = f.session.add_album(
            "Artist",
            "Broken",
            true,
            Some(Err(SessionError::Connection("reset".into()))),
        );

        f.handlers.on_album_metadata(RequestId(1), Some(album));
        drain_artwork(&mut f).await;

        assert!(f.ctx.counter.is_settled());
        assert_eq!(f.handlers.failed(), 1);
        assert_eq!(f.handlers.written(), 0);
    }

    #[test]
    fn test_same_album_requested_once() {
        let mut f = fixture(2);
        let album = f.session.add_album("Artist", "Album", true, Some(Ok(jpeg_bytes())));

        f.handlers.on_album_metadata(RequestId(1), Some(album));
        f.handlers.on_album_metadata(RequestId(2), Some(album));

        assert_eq!(f.session.artwork_requests().len(), 1);
        assert_eq!(f.ctx.counter.remaining(), 1);
    }

    #[tokio::test]
    async fn test_unknown_artwork_request_ignored() {
        let mut f = fixture(1);
        f.handlers
            .on_artwork(RequestId(42), Ok(Artwork::new(jpeg_bytes())))
            .await;
        assert_eq!(f.ctx.counter.remaining(), 1);
    }

    #[test]
    fn test_metadata_completion_frees_slot() {
        let mut f = fixture(1);
        f.ctx.queue.push(crate::session::TrackId(0));
        f.ctx.queue.claim(5);
        assert_eq!(f.ctx.queue.in_flight(), 1);

        f.handlers.on_album_metadata(RequestId(1), None);
        assert_eq!(f.ctx.queue.in_flight(), 0);
    }
}
