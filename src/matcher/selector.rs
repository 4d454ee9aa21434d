use std::sync::Arc;

use futures::future::join_all;
use thiserror::Error;
use tracing::debug;

use crate::pipeline::TrackDescriptor;

use super::candidate::{Candidate, ScoredCandidate};
use super::filters::{is_duration_match, is_rejected, is_release_candidate};
use super::index::MediaIndex;
use super::scoring::{ScoringTarget, ScoringWeights};
use super::text::{artist_tokens, has_artist_match};

/// Errors that can occur while resolving a track to a candidate.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("No result found for {artist} - {title}")]
    NotFound { artist: String, title: String },

    #[error("Search failed: {0}")]
    Search(#[from] anyhow::Error),
}

/// Configuration for the CandidateMatcher.
#[derive(Debug, Clone)]
pub struct MatcherConfig {
    /// Only the first N raw candidates get extended metadata.
    pub enrich_limit: usize,
    /// Candidates within this distance of the target duration are preferred.
    pub duration_window_ms: f64,
    pub weights: ScoringWeights,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            enrich_limit: 8,
            duration_window_ms: 10_000.0,
            weights: ScoringWeights::default(),
        }
    }
}

/// Picks the best media source for a track out of the index's candidates.
pub struct CandidateMatcher {
    media_index: Arc<dyn MediaIndex>,
    config: MatcherConfig,
}

impl CandidateMatcher {
    pub fn new(media_index: Arc<dyn MediaIndex>, config: MatcherConfig) -> Self {
        Self {
            media_index,
            config,
        }
    }

    /// Search the index for the track and select the best candidate URL.
    pub async fn find(&self, descriptor: &TrackDescriptor) -> Result<String, MatchError> {
        let query = format!("{} - {}", descriptor.artist, descriptor.title);
        let query = query.trim();
        debug!("Searching {} on media index", query);

        let candidates = self.media_index.search(query).await?;
        self.select_best(descriptor, candidates).await
    }

    /// Enrich, filter and score `candidates`, returning the winning URL.
    pub async fn select_best(
        &self,
        descriptor: &TrackDescriptor,
        mut candidates: Vec<Candidate>,
    ) -> Result<String, MatchError> {
        if candidates.is_empty() {
            return Err(self.not_found(descriptor));
        }
        self.enrich(&mut candidates).await;

        let ranked = self.rank(descriptor, &candidates);
        let pick = ranked
            .into_iter()
            .find(|scored| scored.candidate.has_usable_url())
            .ok_or_else(|| self.not_found(descriptor))?;

        debug!(
            "Found {} - {} on {} (score {})",
            descriptor.artist, descriptor.title, pick.candidate.url, pick.score
        );
        Ok(pick.candidate.url)
    }

    /// Narrow the candidates down to the selection pool and score it,
    /// best first. Equal scores keep their original order.
    pub fn rank(&self, descriptor: &TrackDescriptor, candidates: &[Candidate]) -> Vec<ScoredCandidate> {
        let tokens = artist_tokens(&descriptor.artist);
        let duration_ms = descriptor.duration_ms.filter(|ms| *ms > 0);

        let eligible = prefer(candidates.iter().collect(), |c| {
            !is_rejected(c, &descriptor.title)
        });
        let base = prefer(eligible, |c| has_artist_match(c, &tokens));
        let release: Vec<&Candidate> = base
            .iter()
            .copied()
            .filter(|c| is_release_candidate(c, &descriptor.artist))
            .collect();

        let window = self.config.duration_window_ms;
        let (duration_release, duration_only): (Vec<&Candidate>, Vec<&Candidate>) = match duration_ms {
            Some(target) => (
                release
                    .iter()
                    .copied()
                    .filter(|c| is_duration_match(c, target, window))
                    .collect(),
                base.iter()
                    .copied()
                    .filter(|c| is_duration_match(c, target, window))
                    .collect(),
            ),
            None => (Vec::new(), Vec::new()),
        };

        let pool = [duration_release, duration_only, release]
            .into_iter()
            .find(|pool| !pool.is_empty())
            .unwrap_or(base);

        let target = ScoringTarget {
            artist: &descriptor.artist,
            title: &descriptor.title,
            duration_ms,
            artist_tokens: &tokens,
        };
        let mut scored: Vec<ScoredCandidate> = pool
            .into_iter()
            .map(|candidate| ScoredCandidate {
                score: self.config.weights.score(candidate, &target),
                candidate: candidate.clone(),
            })
            .collect();
        // sort_by is stable
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored
    }

    /// Fetch extended metadata for the first candidates concurrently.
    /// Failures leave the candidate as listed.
    async fn enrich(&self, candidates: &mut [Candidate]) {
        let limit = self.config.enrich_limit.min(candidates.len());
        let lookups = candidates[..limit]
            .iter()
            .enumerate()
            .filter(|(_, c)| !self.media_index.is_playlist_url(&c.url))
            .map(|(i, c)| {
                let url = c.url.clone();
                async move { (i, self.media_index.enrich(&url).await, url) }
            });

        let results = join_all(lookups).await;
        for (i, result, url) in results {
            match result {
                Ok(detail) if detail.is_playlist => {}
                Ok(detail) => candidates[i].apply_detail(detail),
                Err(e) => debug!("Detail fetch failed for {}: {}", url, e),
            }
        }
    }

    fn not_found(&self, descriptor: &TrackDescriptor) -> MatchError {
        MatchError::NotFound {
            artist: descriptor.artist.clone(),
            title: descriptor.title.clone(),
        }
    }
}

/// Keep the subset matching `predicate`, or everything if none match.
fn prefer<'a>(pool: Vec<&'a Candidate>, predicate: impl Fn(&Candidate) -> bool) -> Vec<&'a Candidate> {
    let preferred: Vec<&Candidate> = pool.iter().copied().filter(|c| predicate(c)).collect();
    if preferred.is_empty() {
        pool
    } else {
        preferred
    }
}
