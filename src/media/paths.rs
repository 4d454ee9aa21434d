//! Destination paths for downloaded tracks.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::AudioFormat;
use crate::pipeline::TrackDescriptor;

const ILLEGAL_FILE_CHARS: &[char] = &['/', '\\', '?', '%', '*', ':', '|', '"', '<', '>'];

/// Replace characters that are not allowed in file names with `-`.
pub fn strip_file_illegal_chars(text: &str) -> String {
    text.chars()
        .map(|c| if ILLEGAL_FILE_CHARS.contains(&c) { '-' } else { c })
        .collect()
}

/// Lays out downloads as `<downloads>/<artist>/<artist> - <title>.<ext>`.
#[derive(Debug, Clone)]
pub struct TrackPaths {
    downloads_path: PathBuf,
    format: AudioFormat,
}

impl TrackPaths {
    pub fn new(downloads_path: impl Into<PathBuf>, format: AudioFormat) -> Self {
        Self {
            downloads_path: downloads_path.into(),
            format,
        }
    }

    pub fn downloads_path(&self) -> &Path {
        &self.downloads_path
    }

    /// Folder for `artist` directly under the downloads path. Names made of
    /// dots only would resolve to the downloads path or its parent.
    pub fn artist_folder(&self, artist: &str) -> PathBuf {
        let folder = strip_file_illegal_chars(artist);
        if folder.trim().trim_matches('.').trim().is_empty() {
            return self.downloads_path.join("unknown_artist");
        }
        self.downloads_path.join(folder)
    }

    pub fn file_name(&self, descriptor: &TrackDescriptor) -> String {
        let artist = if descriptor.artist.is_empty() {
            "unknown_artist"
        } else {
            &descriptor.artist
        };
        let title = if descriptor.title.is_empty() {
            "unknown_track"
        } else {
            &descriptor.title
        };
        format!(
            "{}.{}",
            strip_file_illegal_chars(&format!("{} - {}", artist, title)),
            self.format.extension()
        )
    }

    /// Full destination path. Creates the artist folder if needed.
    pub async fn prepare_destination(&self, descriptor: &TrackDescriptor) -> Result<PathBuf> {
        let folder = self.artist_folder(&descriptor.artist);
        tokio::fs::create_dir_all(&folder)
            .await
            .with_context(|| format!("Failed to create artist folder {:?}", folder))?;
        Ok(folder.join(self.file_name(descriptor)))
    }
}
