//! Additive candidate scoring.
//!
//! The weights are empirical; they are kept together so they can be tuned
//! without touching the scoring logic.

use super::candidate::Candidate;
use super::filters::{duration_diff_ms, mentions_provided_by};
use super::text::{has_artist_match, normalize_text};

#[derive(Debug, Clone, PartialEq)]
pub struct ScoringWeights {
    /// Title names both the artist and the track.
    pub title_has_artist_and_track: f64,
    /// Channel or uploader is an auto-generated "Topic" channel.
    pub topic_channel: f64,
    /// Channel or uploader contains the artist.
    pub channel_has_artist: f64,
    pub official_audio: f64,
    pub audio: f64,
    /// Applied to dance practice, performance video and choreography titles.
    pub performance_penalty: f64,
    pub provided_by: f64,
    pub artist_match: f64,
    pub artist_mismatch_penalty: f64,
    /// Ceiling of the duration bonus; one point is lost per
    /// `duration_penalty_step_ms` of difference.
    pub duration_max_bonus: f64,
    pub duration_penalty_step_ms: f64,
    pub duration_close_bonus: f64,
    pub duration_close_window_ms: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            title_has_artist_and_track: 3.0,
            topic_channel: 3.0,
            channel_has_artist: 2.0,
            official_audio: 2.0,
            audio: 1.0,
            performance_penalty: 3.0,
            provided_by: 2.0,
            artist_match: 3.0,
            artist_mismatch_penalty: 2.0,
            duration_max_bonus: 4.0,
            duration_penalty_step_ms: 2500.0,
            duration_close_bonus: 2.0,
            duration_close_window_ms: 10_000.0,
        }
    }
}

/// Target track information precomputed once per match.
#[derive(Debug, Clone)]
pub struct ScoringTarget<'a> {
    pub artist: &'a str,
    pub title: &'a str,
    pub duration_ms: Option<u64>,
    pub artist_tokens: &'a [String],
}

impl ScoringWeights {
    pub fn score(&self, candidate: &Candidate, target: &ScoringTarget<'_>) -> f64 {
        let normalized_title = normalize_text(candidate.title());
        let normalized_author = normalize_text(candidate.author());
        let normalized_artist = normalize_text(target.artist);
        let normalized_track = normalize_text(target.title);

        let mut score = 0.0;
        if normalized_title.contains(&normalized_artist)
            && normalized_title.contains(&normalized_track)
        {
            score += self.title_has_artist_and_track;
        }
        if normalized_author.contains("topic") {
            score += self.topic_channel;
        }
        if normalized_author.contains(&normalized_artist) {
            score += self.channel_has_artist;
        }
        if normalized_title.contains("official audio") {
            score += self.official_audio;
        } else if normalized_title.contains("audio") {
            score += self.audio;
        }
        if normalized_title.contains("dance practice")
            || normalized_title.contains("performance video")
            || normalized_title.contains("choreography")
        {
            score -= self.performance_penalty;
        }
        if mentions_provided_by(candidate) {
            score += self.provided_by;
        }
        if has_artist_match(candidate, target.artist_tokens) {
            score += self.artist_match;
        } else {
            score -= self.artist_mismatch_penalty;
        }
        if let Some(diff_ms) = duration_diff_ms(candidate, target.duration_ms) {
            let penalty = (diff_ms / self.duration_penalty_step_ms).min(self.duration_max_bonus);
            score += self.duration_max_bonus - penalty;
            if diff_ms <= self.duration_close_window_ms {
                score += self.duration_close_bonus;
            }
        }

        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::text::artist_tokens;

    fn target<'a>(tokens: &'a [String], duration_ms: Option<u64>) -> ScoringTarget<'a> {
        ScoringTarget {
            artist: "Artist",
            title: "Song",
            duration_ms,
            artist_tokens: tokens,
        }
    }

    #[test]
    fn test_topic_channel_adds_exactly_topic_weight() {
        let tokens = artist_tokens("Artist");
        let weights = ScoringWeights::default();
        let plain = Candidate::new("a")
            .with_title("Artist - Song")
            .with_channel("Artist Music");
        let topic = Candidate::new("b")
            .with_title("Artist - Song")
            .with_channel("Artist Music Topic");

        let diff = weights.score(&topic, &target(&tokens, None))
            - weights.score(&plain, &target(&tokens, None));
        assert_eq!(diff, 3.0);
    }

    #[test]
    fn test_full_score_breakdown() {
        let tokens = artist_tokens("Artist");
        let weights = ScoringWeights::default();
        let candidate = Candidate::new("u")
            .with_title("Artist - Song (Official Audio)")
            .with_channel("Artist - Topic")
            .with_description("Provided to YouTube by Label")
            .with_duration_seconds(200.0);

        // 3 title + 3 topic + 2 channel + 2 official audio + 2 provided by
        // + 3 artist match + 4 duration + 2 close duration
        let score = weights.score(&candidate, &target(&tokens, Some(200_000)));
        assert_eq!(score, 21.0);
    }

    #[test]
    fn test_penalties() {
        let tokens = artist_tokens("Artist");
        let weights = ScoringWeights::default();
        let candidate = Candidate::new("u").with_title("Song Dance Practice");

        // -3 performance, -2 no artist match
        assert_eq!(weights.score(&candidate, &target(&tokens, None)), -5.0);
    }

    #[test]
    fn test_duration_bonus_decays_and_caps() {
        let tokens = artist_tokens("Artist");
        let weights = ScoringWeights::default();
        let base = Candidate::new("u").with_title("Artist - Song");
        let no_duration = weights.score(&base, &target(&tokens, Some(200_000)));

        let near = base.clone().with_duration_seconds(205.0);
        let far = base.clone().with_duration_seconds(260.0);

        // 5s off: 4 - 2 + 2
        assert_eq!(
            weights.score(&near, &target(&tokens, Some(200_000))) - no_duration,
            4.0
        );
        // 60s off: penalty capped at 4, no close bonus
        assert_eq!(
            weights.score(&far, &target(&tokens, Some(200_000))) - no_duration,
            0.0
        );
    }
}
