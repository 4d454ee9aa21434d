use anyhow::Result;
use async_trait::async_trait;

use super::candidate::{Candidate, CandidateDetail};

/// External video index queried for candidates.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait MediaIndex: Send + Sync {
    /// Search the index. An empty result is not an error.
    async fn search(&self, query: &str) -> Result<Vec<Candidate>>;

    /// Fetch extended metadata for a single candidate URL.
    async fn enrich(&self, url: &str) -> Result<CandidateDetail>;

    /// URLs that point at playlists are never enriched.
    fn is_playlist_url(&self, _url: &str) -> bool {
        false
    }
}
