//! Subsonic API response models (only the calls the session needs)

use serde::Deserialize;

/// Wrapper for all Subsonic API responses
#[derive(Debug, Clone, Deserialize)]
pub struct SubsonicResponse<T> {
    #[serde(rename = "subsonic-response")]
    pub body: ResponseBody<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseBody<T> {
    pub status: String,
    #[serde(flatten)]
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T> ResponseBody<T> {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    pub code: i32,
    pub message: String,
}

/// Payload of calls that only report status (ping)
#[derive(Debug, Clone, Deserialize)]
pub struct Empty {}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistsData {
    pub playlists: PlaylistsList,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistsList {
    #[serde(default)]
    pub playlist: Vec<PlaylistSummary>,
}

/// Playlist as listed by getPlaylists
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
    pub song_count: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistData {
    pub playlist: PlaylistWithSongs,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistWithSongs {
    pub id: String,
    pub name: String,
    #[serde(default, rename = "entry")]
    pub songs: Vec<Song>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlbumData {
    pub album: AlbumWithSongs,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumWithSongs {
    pub id: String,
    pub name: String,
    pub artist: Option<String>,
    pub cover_art: Option<String>,
    #[serde(default)]
    pub song: Vec<Song>,
}

/// Song/track entry
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub id: String,
    pub title: String,
    pub album: Option<String>,
    pub album_id: Option<String>,
    pub artist: Option<String>,
    pub cover_art: Option<String>,
}
