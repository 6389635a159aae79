//! Catalog entities as seen by the pipeline

use bytes::Bytes;
use std::fmt;

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }
    };
}

arena_id!(
    /// One playlist entry. The same song listed twice gets two ids.
    TrackId
);
arena_id!(AlbumId);
arena_id!(PlaylistId);
arena_id!(
    /// An in-flight album metadata or artwork request
    RequestId
);

/// Account used to log a session in
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Whether a track can be looked up at all
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackAvailability {
    Available,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackInfo {
    pub id: TrackId,
    pub name: String,
    pub loaded: bool,
    pub availability: TrackAvailability,
    pub album: Option<AlbumId>,
}

impl TrackInfo {
    pub fn is_available(&self) -> bool {
        self.availability == TrackAvailability::Available
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlbumInfo {
    pub id: AlbumId,
    pub name: String,
    pub artist: String,
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistInfo {
    pub id: PlaylistId,
    pub name: String,
    pub loaded: bool,
    pub tracks: Vec<TrackId>,
}

/// Cover image size tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, clap::ValueEnum)]
pub enum ImageSize {
    Small,
    Normal,
    #[default]
    Large,
}

impl ImageSize {
    /// Edge length in pixels requested from the server
    pub fn pixels(self) -> u32 {
        match self {
            ImageSize::Small => 64,
            ImageSize::Normal => 300,
            ImageSize::Large => 640,
        }
    }
}

/// Identifies one cover image at one size tier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageId {
    pub key: String,
    pub size: ImageSize,
}

/// Encoded format of an image payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Unknown,
}

impl ImageFormat {
    /// Sniff the format from the payload's magic bytes
    pub fn detect(data: &[u8]) -> Self {
        match image::guess_format(data) {
            Ok(image::ImageFormat::Jpeg) => ImageFormat::Jpeg,
            Ok(image::ImageFormat::Png) => ImageFormat::Png,
            _ => ImageFormat::Unknown,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Unknown => "bin",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImageFormat::Jpeg => "JPEG",
            ImageFormat::Png => "PNG",
            ImageFormat::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// A loaded image
#[derive(Debug, Clone, PartialEq)]
pub struct Artwork {
    pub data: Bytes,
    pub format: ImageFormat,
}

impl Artwork {
    pub fn new(data: Bytes) -> Self {
        let format = ImageFormat::detect(&data);
        Self { data, format }
    }
}
