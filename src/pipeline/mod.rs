//! Track pipeline module
//!
//! Resolves track descriptors to media sources and downloads them through
//! two bounded stage queues, emitting a status event on every transition.

mod collaborators;
mod dedup;
mod error;
mod manager;
mod models;
mod notifier;
mod stage_queue;
mod throttle;

pub use collaborators::{AlwaysExists, ExistenceCheck, Fetcher, FormatOptions, Tagger};
#[cfg(feature = "mock")]
pub use collaborators::{MockExistenceCheck, MockFetcher, MockTagger};
pub use dedup::{DedupGuard, DedupPermit};
pub use error::PipelineError;
pub use manager::{PipelineCollaborators, PipelineOptions, TrackPipeline};
pub use models::*;
#[cfg(feature = "mock")]
pub use notifier::MockEventSink;
pub use notifier::{BroadcastEventSink, EventSink, LoggingEventSink, NoOpEventSink};
pub use stage_queue::{QueueTask, StageQueue};
pub use throttle::{
    effective_max_per_minute, spacing_for, DownloadThrottler, FixedRate, NoOpThrottler,
    RateLimitSource, RateLimiter,
};
