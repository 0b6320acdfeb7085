//! Title and artist cleanup for matching songs against lyric sources.
//!
//! Filenames leak into song metadata: track-number prefixes, underscores
//! for spaces, doubled whitespace. External lyric catalogs index by the
//! human-readable title, so these are stripped before lookup.

use once_cell::sync::Lazy;
use regex::Regex;

/// Leading track numbers in any of the common layouts: "07 - ", "01. ",
/// "03- ".
static TRACK_NUMBER_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\d+\s*[-.]?\s*").expect("track number regex"));

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Clean a song title: strip a track-number prefix, turn underscores into
/// spaces, collapse whitespace.
pub fn clean_title(title: &str) -> String {
    let cleaned = TRACK_NUMBER_PREFIX.replace(title, "");
    let cleaned = cleaned.replace('_', " ");
    WHITESPACE_RUN.replace_all(&cleaned, " ").trim().to_string()
}

/// Clean an artist name: underscores into spaces, collapse whitespace.
/// Artist fields never carry track numbers, so no prefix stripping.
pub fn clean_artist(artist: &str) -> String {
    let cleaned = artist.replace('_', " ");
    WHITESPACE_RUN.replace_all(&cleaned, " ").trim().to_string()
}
