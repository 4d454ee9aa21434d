//! Collaborators the pipeline delegates real work to.

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::AudioFormat;

use super::models::TrackId;

/// Options passed to the fetcher for a single download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatOptions {
    pub format: AudioFormat,
    /// Path to a cookies file forwarded to the media index
    pub cookies: Option<String>,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            format: AudioFormat::M4a,
            cookies: None,
        }
    }
}

/// Downloads and transcodes the audio behind a URL.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn download(&self, url: &str, destination: &Path, options: &FormatOptions) -> Result<()>;
}

/// Writes cover art and basic tags into a downloaded file.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait Tagger: Send + Sync {
    async fn embed_cover_art(
        &self,
        file_path: &Path,
        image_url: &str,
        title: &str,
        artist: &str,
    ) -> Result<()>;
}

/// Asks the owning system whether a track still exists. Tracks can be
/// deleted while they sit in a queue.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait ExistenceCheck: Send + Sync {
    async fn exists(&self, track_id: TrackId) -> bool;
}

/// Treats every track as present. Used when the pipeline is the only owner
/// of its tracks, e.g. from the CLI.
pub struct AlwaysExists;

#[async_trait]
impl ExistenceCheck for AlwaysExists {
    async fn exists(&self, _track_id: TrackId) -> bool {
        true
    }
}
