//! Data models for the track pipeline.
//!
//! Defines track descriptors, pipeline states, and the status events emitted
//! on every transition.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of a track inside the pipeline.
pub type TrackId = u64;

/// Immutable description of the track to resolve and download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackDescriptor {
    pub id: TrackId,
    pub artist: String,
    pub title: String,
    pub duration_ms: Option<u64>,
    /// Artwork embedded after download, if any.
    pub cover_url: Option<String>,
}

impl TrackDescriptor {
    pub fn new(id: TrackId, artist: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id,
            artist: artist.into(),
            title: title.into(),
            duration_ms: None,
            cover_url: None,
        }
    }

    pub fn with_duration_ms(mut self, duration_ms: Option<u64>) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_cover_url(mut self, cover_url: impl Into<String>) -> Self {
        self.cover_url = Some(cover_url.into());
        self
    }
}

impl fmt::Display for TrackDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {} - {}", self.id, self.artist, self.title)
    }
}

/// Status of a track in the pipeline state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrackState {
    New,
    Searching,
    Queued,
    Downloading,
    Completed, // terminal
    Error,     // terminal until retried
}

impl TrackState {
    /// Returns true if this is a terminal state (Completed or Error).
    pub fn is_terminal(&self) -> bool {
        matches!(self, TrackState::Completed | TrackState::Error)
    }

    /// Whether `retry` may send a track in this state back to Searching.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TrackState::New | TrackState::Error)
    }

    /// Forward edges of the state machine plus the retry edge.
    pub fn can_transition_to(&self, next: TrackState) -> bool {
        use TrackState::*;
        matches!(
            (self, next),
            (New, Searching)
                | (Error, Searching)
                | (Searching, Queued)
                | (Searching, Error)
                | (Queued, Downloading)
                | (Downloading, Completed)
                | (Downloading, Error)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrackState::New => "NEW",
            TrackState::Searching => "SEARCHING",
            TrackState::Queued => "QUEUED",
            TrackState::Downloading => "DOWNLOADING",
            TrackState::Completed => "COMPLETED",
            TrackState::Error => "ERROR",
        }
    }
}

impl fmt::Display for TrackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the pipeline knows about one track.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackRecord {
    pub descriptor: TrackDescriptor,
    pub state: TrackState,
    /// URL chosen by the matcher
    pub resolved_url: Option<String>,
    /// Where the audio was written
    pub file_path: Option<PathBuf>,
    /// Human-readable message for the Error state
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl TrackRecord {
    pub fn new(descriptor: TrackDescriptor) -> Self {
        Self {
            descriptor,
            state: TrackState::New,
            resolved_url: None,
            file_path: None,
            error: None,
            updated_at: Utc::now(),
        }
    }
}

/// Data attached to a status event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatusPayload {
    None,
    Resolved { url: String },
    Downloaded { path: PathBuf },
    Failed { message: String },
}

/// Emitted on every state transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackStatusEvent {
    pub track_id: TrackId,
    pub state: TrackState,
    pub payload: StatusPayload,
    pub at: DateTime<Utc>,
}

impl TrackStatusEvent {
    pub fn new(track_id: TrackId, state: TrackState, payload: StatusPayload) -> Self {
        Self {
            track_id,
            state,
            payload,
            at: Utc::now(),
        }
    }
}
