//! Candidate matching.
//!
//! Resolves a track descriptor to the URL of the best candidate returned by
//! the media index: enrich, reject alternate performances, prefer artist
//! matches, official releases and close durations, then score.

mod candidate;
mod filters;
mod index;
mod scoring;
mod selector;
mod text;

pub use candidate::{Candidate, CandidateDetail, ScoredCandidate};
pub use filters::{has_version_term, is_duration_match, is_rejected, is_release_candidate};
pub use index::MediaIndex;
#[cfg(feature = "mock")]
pub use index::MockMediaIndex;
pub use scoring::{ScoringTarget, ScoringWeights};
pub use selector::{CandidateMatcher, MatchError, MatcherConfig};
pub use text::{artist_tokens, has_artist_match, normalize_text};
