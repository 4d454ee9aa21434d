//! Track Pipeline Library
//!
//! Resolves track descriptors (artist, title, duration) to the best matching
//! media source and downloads the audio through rate limited stage queues.

pub mod config;
pub mod matcher;
pub mod media;
pub mod metrics;
pub mod pipeline;

// Re-export commonly used types for convenience
pub use config::{AppConfig, AudioFormat, CliConfig, FileConfig, PipelineSettings};
pub use matcher::{Candidate, CandidateMatcher, MatchError, MediaIndex};
pub use media::{Id3CoverTagger, TrackPaths, YtDlpClient};
pub use pipeline::{
    PipelineCollaborators, PipelineError, PipelineOptions, TrackDescriptor, TrackPipeline,
    TrackState, TrackStatusEvent,
};
