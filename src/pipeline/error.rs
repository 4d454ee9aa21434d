use thiserror::Error;

use crate::matcher::MatchError;

use super::models::{TrackId, TrackState};

/// Errors that can occur while driving a track through the pipeline.
///
/// Failures while processing a track end up as that track's error message;
/// they never reach sibling tasks.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    NotFound(String),

    #[error("Search failed: {0}")]
    Search(String),

    #[error("Download failed: {0}")]
    Fetch(String),

    /// Logged only, a tagging failure never fails the track.
    #[error("Tagging failed: {0}")]
    Tagging(String),

    #[error("Track {0} no longer exists")]
    VanishedTrack(TrackId),

    #[error("Track {0} is not known to the pipeline")]
    UnknownTrack(TrackId),

    #[error("Invalid transition for track {id}: {from} -> {to}")]
    InvalidTransition {
        id: TrackId,
        from: TrackState,
        to: TrackState,
    },
}

impl From<MatchError> for PipelineError {
    fn from(error: MatchError) -> Self {
        match error {
            MatchError::NotFound { .. } => PipelineError::NotFound(error.to_string()),
            MatchError::Search(e) => PipelineError::Search(format!("{:#}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_error_conversion() {
        let not_found: PipelineError = MatchError::NotFound {
            artist: "A".to_string(),
            title: "B".to_string(),
        }
        .into();
        assert_eq!(not_found.to_string(), "No result found for A - B");

        let search: PipelineError = MatchError::Search(anyhow::anyhow!("timed out")).into();
        assert!(matches!(search, PipelineError::Search(_)));
        assert_eq!(search.to_string(), "Search failed: timed out");
    }

    #[test]
    fn test_invalid_transition_message() {
        let error = PipelineError::InvalidTransition {
            id: 4,
            from: TrackState::Completed,
            to: TrackState::Searching,
        };
        assert_eq!(
            error.to_string(),
            "Invalid transition for track 4: COMPLETED -> SEARCHING"
        );
    }
}
