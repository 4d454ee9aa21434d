//! Candidate data model shared by the media index and the matcher.

use serde::{Deserialize, Serialize};

/// A single search result that may be the media source for a track.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub duration_seconds: Option<f64>,
    pub channel_name: Option<String>,
    pub uploader_name: Option<String>,
    pub is_live: bool,
}

impl Candidate {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_duration_seconds(mut self, seconds: f64) -> Self {
        self.duration_seconds = Some(seconds);
        self
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel_name = Some(channel.into());
        self
    }

    pub fn with_uploader(mut self, uploader: impl Into<String>) -> Self {
        self.uploader_name = Some(uploader.into());
        self
    }

    pub fn live(mut self) -> Self {
        self.is_live = true;
        self
    }

    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }

    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }

    /// Channel name, falling back to the uploader when no channel is known.
    pub fn author(&self) -> &str {
        self.channel_name
            .as_deref()
            .or(self.uploader_name.as_deref())
            .unwrap_or_default()
    }

    pub fn has_usable_url(&self) -> bool {
        !self.url.trim().is_empty()
    }

    /// Merge extended metadata into this candidate. Missing detail fields
    /// keep the values from the search listing.
    pub fn apply_detail(&mut self, detail: CandidateDetail) {
        if detail.description.is_some() {
            self.description = detail.description;
        }
        if let Some(seconds) = detail.duration_seconds.filter(|s| s.is_finite() && *s > 0.0) {
            self.duration_seconds = Some(seconds);
        }
        if detail.channel_name.is_some() {
            self.channel_name = detail.channel_name;
        }
        if detail.uploader_name.is_some() {
            self.uploader_name = detail.uploader_name;
        }
        self.is_live = detail.is_live;
    }
}

/// Extended metadata fetched for a single candidate URL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateDetail {
    pub description: Option<String>,
    pub duration_seconds: Option<f64>,
    pub channel_name: Option<String>,
    pub uploader_name: Option<String>,
    /// Live now, or was a live stream.
    pub is_live: bool,
    /// The URL resolved to a playlist rather than a single video.
    pub is_playlist: bool,
}

/// A candidate with its score. Only lives for the duration of one match.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub score: f64,
}
