#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use tempfile::TempDir;

use track_pipeline::config::{AudioFormat, PipelineSettings};
use track_pipeline::matcher::Candidate;
use track_pipeline::media::TrackPaths;
use track_pipeline::pipeline::{
    FixedRate, FormatOptions, PipelineCollaborators, PipelineOptions, TrackPipeline,
};

use super::constants::UNTHROTTLED_RATE;
use super::fakes::{FakeFetcher, FakeMediaIndex, FakeTagger, RecordingEventSink, ToggleExistence};

/// Official release upload for `artist - title`.
pub fn topic_candidate(artist: &str, title: &str) -> Candidate {
    Candidate::new(format!("https://www.youtube.com/watch?v=topic-{}", slug(title)))
        .with_title(title)
        .with_channel(format!("{} - Topic", artist))
        .with_description(format!("Provided to YouTube by Label\n\n{} · {}", title, artist))
        .with_duration_seconds(320.0)
}

/// Concert recording that must never be chosen.
pub fn live_candidate(artist: &str, title: &str) -> Candidate {
    Candidate::new(format!("https://www.youtube.com/watch?v=live-{}", slug(title)))
        .with_title(format!("{} - {} (Live at Coachella)", artist, title))
        .with_channel(artist)
        .with_duration_seconds(410.0)
}

fn slug(text: &str) -> String {
    text.to_lowercase().replace(' ', "-")
}

/// A pipeline wired to in-memory collaborators and a temporary downloads
/// directory.
pub struct TestPipeline {
    pub pipeline: TrackPipeline,
    pub index: Arc<FakeMediaIndex>,
    pub fetcher: Arc<FakeFetcher>,
    pub tagger: Arc<FakeTagger>,
    pub existence: Arc<ToggleExistence>,
    pub events: Arc<RecordingEventSink>,
    temp_dir: TempDir,
}

impl TestPipeline {
    pub fn new() -> Self {
        Self::with_rate(UNTHROTTLED_RATE)
    }

    /// Downloads spaced at `max_per_minute`.
    pub fn with_rate(max_per_minute: f64) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let index = Arc::new(FakeMediaIndex::default());
        let fetcher = Arc::new(FakeFetcher::default());
        let tagger = Arc::new(FakeTagger::default());
        let existence = Arc::new(ToggleExistence::default());
        let events = Arc::new(RecordingEventSink::default());

        let pipeline = TrackPipeline::new(
            PipelineCollaborators {
                media_index: index.clone(),
                fetcher: fetcher.clone(),
                tagger: tagger.clone(),
                existence: existence.clone(),
                events: events.clone(),
                rate_source: Arc::new(FixedRate(max_per_minute)),
            },
            PipelineOptions {
                settings: PipelineSettings {
                    max_downloads_per_minute: max_per_minute,
                    ..Default::default()
                },
                paths: TrackPaths::new(temp_dir.path(), AudioFormat::Mp3),
                format: FormatOptions {
                    format: AudioFormat::Mp3,
                    cookies: None,
                },
            },
        );

        Self {
            pipeline,
            index,
            fetcher,
            tagger,
            existence,
            events,
            temp_dir,
        }
    }

    pub fn downloads_path(&self) -> &Path {
        self.temp_dir.path()
    }
}
