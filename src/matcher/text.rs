//! Text normalization and artist token extraction.

use lazy_static::lazy_static;
use regex::Regex;

use super::candidate::Candidate;

lazy_static! {
    static ref NON_ALPHANUMERIC: Regex =
        Regex::new(r"[^a-z0-9]+").expect("Failed to compile non-alphanumeric pattern");

    static ref ARTIST_SEPARATORS: Regex =
        Regex::new(r"(?i),|&| feat\.?| ft\.?| with | x |/|•|·")
            .expect("Failed to compile artist separator pattern");

    static ref HANGUL_RUN: Regex =
        Regex::new(r"[\x{AC00}-\x{D7A3}]+").expect("Failed to compile hangul pattern");
}

/// Lower-case and collapse every run of non `[a-z0-9]` characters into a
/// single space. Characters outside ASCII are dropped.
pub fn normalize_text(value: &str) -> String {
    let lowered = value.to_lowercase();
    NON_ALPHANUMERIC
        .replace_all(&lowered, " ")
        .trim()
        .to_string()
}

pub fn has_hangul(value: &str) -> bool {
    HANGUL_RUN.is_match(value)
}

/// Tokens that identify an artist: the full string, each collaborator split
/// on common separators, and every hangul run. Single-character tokens are
/// discarded.
pub fn artist_tokens(artist: &str) -> Vec<String> {
    let raw = artist.trim();
    if raw.is_empty() {
        return Vec::new();
    }

    let mut tokens: Vec<String> = vec![raw.to_string()];
    let mut push = |token: &str| {
        if !tokens.iter().any(|t| t == token) {
            tokens.push(token.to_string());
        }
    };

    for token in ARTIST_SEPARATORS.split(raw) {
        let token = token.trim();
        if !token.is_empty() {
            push(token);
        }
    }
    for found in HANGUL_RUN.find_iter(raw) {
        push(found.as_str());
    }

    tokens
        .into_iter()
        .filter(|token| token.chars().count() > 1)
        .collect()
}

/// True when any artist token appears in the candidate's title, description,
/// channel or uploader. Hangul tokens are matched against the raw text, all
/// others against the normalized text.
pub fn has_artist_match(candidate: &Candidate, tokens: &[String]) -> bool {
    if tokens.is_empty() {
        return false;
    }
    let combined = [
        candidate.title(),
        candidate.description(),
        candidate.channel_name.as_deref().unwrap_or_default(),
        candidate.uploader_name.as_deref().unwrap_or_default(),
    ]
    .join(" ");
    let combined = combined.trim();
    if combined.is_empty() {
        return false;
    }
    let normalized = normalize_text(combined);

    tokens.iter().any(|token| {
        if has_hangul(token) {
            return combined.contains(token.as_str());
        }
        let normalized_token = normalize_text(token);
        !normalized_token.is_empty() && normalized.contains(&normalized_token)
    })
}
