//! Cover art embedding for downloaded files.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use id3::TagLike;
use tracing::debug;

use crate::pipeline::Tagger;

/// Downloads the cover image and writes it as an ID3 front cover together
/// with title and artist frames. Files that cannot carry ID3 tags are left
/// untouched.
pub struct Id3CoverTagger {
    client: reqwest::Client,
}

impl Id3CoverTagger {
    pub fn new(timeout_sec: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }

    async fn fetch_image(&self, image_url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(image_url)
            .send()
            .await
            .context("Failed to fetch cover art")?;

        if !response.status().is_success() {
            anyhow::bail!(
                "Failed to fetch cover art {}: status {}",
                image_url,
                response.status()
            );
        }

        let bytes = response
            .bytes()
            .await
            .context("Failed to read cover art body")?;
        Ok(bytes.to_vec())
    }
}

pub fn supports_id3(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("mp3"))
}

fn image_mime_type(data: &[u8]) -> &'static str {
    if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        "image/png"
    } else {
        "image/jpeg"
    }
}

/// Merge title, artist and cover into the file's existing tag.
pub fn write_cover_tag(path: &Path, image: Vec<u8>, title: &str, artist: &str) -> Result<()> {
    let mut tag = match id3::Tag::read_from_path(path) {
        Ok(tag) => tag,
        Err(e) if matches!(e.kind, id3::ErrorKind::NoTag) => id3::Tag::new(),
        Err(e) => return Err(e).with_context(|| format!("Failed to read tag from {:?}", path)),
    };

    tag.set_title(title);
    tag.set_artist(artist);
    tag.add_frame(id3::frame::Picture {
        mime_type: image_mime_type(&image).to_string(),
        picture_type: id3::frame::PictureType::CoverFront,
        description: "cover".to_string(),
        data: image,
    });

    tag.write_to_path(path, id3::Version::Id3v24)
        .with_context(|| format!("Failed to write tag to {:?}", path))
}

#[async_trait]
impl Tagger for Id3CoverTagger {
    async fn embed_cover_art(
        &self,
        file_path: &Path,
        image_url: &str,
        title: &str,
        artist: &str,
    ) -> Result<()> {
        if !supports_id3(file_path) {
            debug!("Skipping cover art for {:?}: no ID3 support", file_path);
            return Ok(());
        }

        let image = self.fetch_image(image_url).await?;
        let path: PathBuf = file_path.to_path_buf();
        let title = title.to_string();
        let artist = artist.to_string();
        tokio::task::spawn_blocking(move || write_cover_tag(&path, image, &title, &artist))
            .await
            .context("Tagging task panicked")?
    }
}
