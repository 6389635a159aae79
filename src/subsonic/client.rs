//! Subsonic API HTTP client

use bytes::Bytes;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::auth::TokenAuth;
use super::models::*;

/// Errors from a single API call
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Subsonic error {code}: {message}")]
    Api { code: i32, message: String },

    #[error("server returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("response carried no {0}")]
    MissingData(&'static str),
}

impl ClientError {
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ClientError::Api { code, .. } if matches!(code, 40 | 41 | 44))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Api { code: 70, .. })
            || matches!(self, ClientError::Status(s) if *s == reqwest::StatusCode::NOT_FOUND)
    }
}

impl From<ApiError> for ClientError {
    fn from(error: ApiError) -> Self {
        ClientError::Api {
            code: error.code,
            message: error.message,
        }
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// HTTP client for the Subsonic REST API
#[derive(Clone)]
pub struct SubsonicClient {
    base_url: String,
    username: String,
    password: String,
    http_client: Client,
}

impl SubsonicClient {
    pub fn new(base_url: &str, username: &str, password: &str) -> ClientResult<Self> {
        let http_client = Client::builder()
            .user_agent(concat!("coverdrop/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
            http_client,
        })
    }

    /// Same server, other account
    pub fn with_credentials(&self, username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
            ..self.clone()
        }
    }

    /// `<base>/rest/<endpoint>?<auth>&<params>`
    fn build_url(&self, endpoint: &str, params: &[(&str, &str)]) -> String {
        let auth = TokenAuth::new(&self.username, &self.password);
        let query = auth
            .query_pairs()
            .into_iter()
            .chain(params.iter().copied())
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        format!("{}/rest/{}?{}", self.base_url, endpoint, query)
    }

    /// GET a JSON endpoint and unwrap the Subsonic envelope
    async fn call<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> ClientResult<Option<T>> {
        let url = self.build_url(endpoint, params);
        debug!("GET {} {:?}", endpoint, params);

        let response: SubsonicResponse<T> =
            self.http_client.get(&url).send().await?.json().await?;

        let body = response.body;
        if !body.is_ok() {
            return Err(body
                .error
                .map(ClientError::from)
                .unwrap_or_else(|| ClientError::Api {
                    code: 0,
                    message: format!("unknown error (status {})", body.status),
                }));
        }
        Ok(body.data)
    }

    /// Verify the credentials
    pub async fn ping(&self) -> ClientResult<()> {
        self.call::<Empty>("ping", &[]).await.map(|_| ())
    }

    pub async fn get_playlists(&self) -> ClientResult<Vec<PlaylistSummary>> {
        let playlists = self
            .call::<PlaylistsData>("getPlaylists", &[])
            .await?
            .map(|d| d.playlists.playlist)
            .unwrap_or_default();
        debug!("Found {} playlists", playlists.len());
        Ok(playlists)
    }

    pub async fn get_playlist(&self, id: &str) -> ClientResult<PlaylistWithSongs> {
        self.call::<PlaylistData>("getPlaylist", &[("id", id)])
            .await?
            .map(|d| d.playlist)
            .ok_or(ClientError::MissingData("playlist"))
    }

    pub async fn get_album(&self, id: &str) -> ClientResult<AlbumWithSongs> {
        self.call::<AlbumData>("getAlbum", &[("id", id)])
            .await?
            .map(|d| d.album)
            .ok_or(ClientError::MissingData("album"))
    }

    /// Download a cover image scaled to `size` pixels
    pub async fn get_cover_art(&self, id: &str, size: u32) -> ClientResult<Bytes> {
        let size = size.to_string();
        let url = self.build_url("getCoverArt", &[("id", id), ("size", &size)]);
        debug!("Fetching cover art {} at {}px", id, size);

        let response = self.http_client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::Status(response.status()));
        }

        // Errors come back as a JSON envelope instead of image bytes
        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("json"));
        let bytes = response.bytes().await?;

        if is_json {
            if let Ok(envelope) = serde_json::from_slice::<SubsonicResponse<Empty>>(&bytes) {
                if let Some(error) = envelope.body.error {
                    return Err(error.into());
                }
            }
        }

        Ok(bytes)
    }
}
