//! Candidate predicates used to narrow the selection pool.

use lazy_static::lazy_static;
use regex::Regex;

use super::candidate::Candidate;
use super::text::normalize_text;

/// Phrase auto-generated into the description of label-provided uploads.
pub const PROVIDED_BY_PHRASE: &str = "provided to youtube by";

lazy_static! {
    // Word boundaries are ASCII-only so hangul next to "mv" still counts as a boundary.
    static ref HARD_REJECT: Regex = Regex::new(concat!(
        r"(?i)(^|[^A-Za-z0-9_])(mv|m/v)([^A-Za-z0-9_]|$)",
        r"|music video|official video|dance practice|performance( video)?|choreography",
        r"|live|라이브|remix|cover|karaoke|instrumental|sped\s*up|slowed|nightcore",
        r"|직캠|콘서트|행사",
    ))
    .expect("Failed to compile hard reject pattern");

    static ref VERSION_LABEL: Regex = Regex::new(
        r"(?i)(^|[^A-Za-z0-9_])ver\.?([^A-Za-z0-9_]|$)|(^|[^A-Za-z0-9_])version([^A-Za-z0-9_]|$)"
    )
    .expect("Failed to compile version label pattern");
}

/// True when the candidate is live, or its title and description look like
/// an alternate performance. A version label is tolerated only when the
/// track title carries one itself.
pub fn is_rejected(candidate: &Candidate, track_title: &str) -> bool {
    if candidate.is_live {
        return true;
    }
    let combined = format!("{} {}", candidate.title(), candidate.description());
    if HARD_REJECT.is_match(&combined) {
        return true;
    }
    VERSION_LABEL.is_match(&combined) && !has_version_term(track_title)
}

pub fn has_version_term(title: &str) -> bool {
    !title.is_empty() && VERSION_LABEL.is_match(title)
}

/// True for official studio uploads: auto-generated "Topic" channels,
/// label-provided descriptions, or audio uploads credited to the artist.
pub fn is_release_candidate(candidate: &Candidate, artist: &str) -> bool {
    let normalized_author = normalize_text(candidate.author());
    if normalized_author.contains("topic") {
        return true;
    }
    if mentions_provided_by(candidate) {
        return true;
    }
    let normalized_title = normalize_text(candidate.title());
    if normalized_title.contains("audio") {
        let normalized_artist = normalize_text(artist);
        return normalized_author.contains(&normalized_artist)
            || normalized_title.contains(&normalized_artist);
    }
    false
}

pub fn mentions_provided_by(candidate: &Candidate) -> bool {
    candidate
        .description()
        .to_lowercase()
        .contains(PROVIDED_BY_PHRASE)
}

/// Absolute distance between the candidate and target durations, in
/// milliseconds. None when either side is unknown or zero.
pub fn duration_diff_ms(candidate: &Candidate, target_ms: Option<u64>) -> Option<f64> {
    let target_ms = target_ms.filter(|ms| *ms > 0)?;
    let seconds = candidate
        .duration_seconds
        .filter(|s| s.is_finite() && *s != 0.0)?;
    Some((seconds * 1000.0 - target_ms as f64).abs())
}

pub fn is_duration_match(candidate: &Candidate, target_ms: u64, window_ms: f64) -> bool {
    duration_diff_ms(candidate, Some(target_ms)).is_some_and(|diff| diff <= window_ms)
}
