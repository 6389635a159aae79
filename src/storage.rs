//! Artwork file storage

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::session::ImageFormat;
use crate::utils::sanitize_filename;

/// Artist and album names an artwork file is named after
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtworkLabel {
    pub artist: String,
    pub album: String,
}

impl ArtworkLabel {
    pub fn new(artist: impl Into<String>, album: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
            album: album.into(),
        }
    }
}

/// Writes artwork files into one flat directory
#[derive(Debug, Clone)]
pub struct ArtworkStorage {
    root: PathBuf,
}

impl ArtworkStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the output directory if it is missing
    pub fn init(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.root)?;
        debug!("Output directory ready at {}", self.root.display());
        Ok(())
    }

    /// `<root>/<artist> - <album>.<ext>`
    pub fn path_for(&self, label: &ArtworkLabel, format: ImageFormat) -> PathBuf {
        let filename = format!(
            "{} - {}.{}",
            sanitize_filename(&label.artist),
            sanitize_filename(&label.album),
            format.extension()
        );
        self.root.join(filename)
    }

    /// Write the payload, replacing any file of the same name
    pub async fn write(
        &self,
        label: &ArtworkLabel,
        format: ImageFormat,
        data: &[u8],
    ) -> Result<PathBuf> {
        let path = self.path_for(label, format);
        fs::write(&path, data)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}
