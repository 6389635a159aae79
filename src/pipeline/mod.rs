//! Playlist artwork fetch pipeline
//!
//! - Locator: finds the target playlist and fills the work queue
//! - Worker: turns queued tracks into album metadata requests, at most
//!   `max_in_flight` at a time
//! - Handlers: metadata completion issues the artwork request, artwork
//!   completion writes the file
//! - Driver: runs the session event loop until every track is resolved

mod counter;
mod driver;
mod handlers;
mod locator;
mod queue;
mod worker;

pub use counter::OutstandingCounter;
pub use driver::{CancelHandle, PipelineDriver};
pub use handlers::CompletionHandlers;
pub use locator::{LocateOutcome, MatchState, MatchTracker, PlaylistLocator};
pub use queue::WorkQueue;
pub use worker::FetchWorker;

use std::path::PathBuf;
use std::time::Duration;

use crate::session::{ImageFormat, ImageSize, SessionError, WakeSignal};

/// Tunables of a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Playlist name to look for (compared case-insensitively)
    pub target_playlist: String,
    /// Directory receiving `<artist> - <album>.jpg` files
    pub output_dir: PathBuf,
    /// Cover size tier requested for every album
    pub image_size: ImageSize,
    /// Maximum album metadata requests in flight
    pub max_in_flight: usize,
    /// Fetch worker polling interval
    pub poll_interval: Duration,
    /// Format the artwork is expected in; others are written with a warning
    pub expected_format: ImageFormat,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            target_playlist: String::new(),
            output_dir: PathBuf::from("img"),
            image_size: ImageSize::Large,
            max_in_flight: 5,
            poll_interval: Duration::from_millis(10),
            expected_format: ImageFormat::Jpeg,
        }
    }
}

/// State shared between the driver task and the fetch worker
#[derive(Debug, Default)]
pub struct PipelineContext {
    pub counter: OutstandingCounter,
    pub queue: WorkQueue,
    pub matched: MatchTracker,
    pub wake: WakeSignal,
}

impl PipelineContext {
    pub fn new(wake: WakeSignal) -> Self {
        Self {
            wake,
            ..Default::default()
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every track was written or skipped
    Completed,
    /// Interrupted before all tracks were resolved
    Cancelled,
    /// The account has no playlists at all
    NoPlaylists,
}

/// Result of a pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub status: RunStatus,
    /// Artwork files written
    pub written: usize,
    /// Tracks resolved without a fetch: unavailable, duplicate album or no cover
    pub skipped: usize,
    /// Artwork fetches or writes that failed
    pub failed: usize,
}

/// Fatal pipeline failures
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("login failed: {0}")]
    Login(#[source] SessionError),

    #[error("playlist '{0}' not found")]
    PlaylistNotFound(String),

    #[error("failed to prepare output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
