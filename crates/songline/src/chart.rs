//! Heuristic parsing of plain-text chord charts.
//!
//! The expected layout interleaves three kinds of lines: bare bar numbers
//! acting as position markers, chord lines (symbols separated by barlines
//! or wide spacing), and everything else as lyrics. No timing information
//! exists in such charts, so chords are laid out one bar apiece from the
//! most recent marker and lyric lines stay untimed for a later pipeline to
//! place.

use beatgrid::{round_places, TimeSig};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::LyricLine;

/// One chord token: optional `N` no-chord, root A–G with accidental,
/// optional quality with extensions, optional slash bass.
static CHORD_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:N|[A-G](?:#|b)?(?:(?:maj|min|m|dim|aug|sus(?:2|4)?|add\d+|M7|maj7|m7|dim7|\+|°)?\d*(?:sus\d+)?)?(?:/[A-G](?:#|b)?)?)$",
    )
    .expect("chord token regex")
});

const SECTION_COLORS: [&str; 2] = ["#5B8DEF", "#F59E0B"];
const SECTION_NAMES: [&str; 2] = ["Verse", "Chorus"];

/// A chord placed on the chart's bar grid.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartChord {
    pub symbol: String,
    pub start_beat: f64,
}

/// A section window inferred over the chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSection {
    pub name: String,
    pub start_beat: f64,
    pub length_beats: f64,
    pub color: String,
}

/// Everything extracted from one text chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartDoc {
    pub bpm: f64,
    pub time_sig: TimeSig,
    pub sections: Vec<ChartSection>,
    pub chords: Vec<ChartChord>,
    pub lyrics: Vec<LyricLine>,
    /// Advisory only; never blocks parsing.
    pub issues: Vec<String>,
}

/// Quick shape check: does this blob look like a JSON chord document
/// rather than a text chart? Callers route such content to the timeline
/// mapper instead.
pub fn looks_like_json_doc(content: &str) -> bool {
    let trimmed = content.trim_start();
    trimmed.starts_with('{')
        && (trimmed.contains("\"metadata\"")
            || trimmed.contains("\"chord_progression\"")
            || trimmed.contains("\"sections\""))
}

/// Extract chord tokens from a line, or empty when the line is not a chord
/// line.
///
/// Barline and separator characters are normalized to spaces first; every
/// remaining token must match the chord grammar. Charts that use wide
/// spacing instead of barlines get a second chance via a double-space
/// split.
fn chord_tokens(line: &str) -> Vec<String> {
    let cleaned: String = line
        .chars()
        .map(|c| match c {
            '|' | '‖' | '·' | '—' => ' ',
            other => other,
        })
        .collect();
    let parts: Vec<&str> = cleaned.split_whitespace().collect();
    if !parts.is_empty() && parts.iter().all(|p| CHORD_TOKEN.is_match(p)) {
        return parts.into_iter().map(str::to_string).collect();
    }

    if line.contains("  ") && !line.starts_with('[') {
        let parts: Vec<&str> = line
            .split("  ")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        if !parts.is_empty() && parts.iter().all(|p| CHORD_TOKEN.is_match(p)) {
            return parts.into_iter().map(str::to_string).collect();
        }
    }

    Vec::new()
}

/// Parse a text chart into chords, lyrics, and inferred sections.
///
/// `bpm` is carried through untouched (text charts carry no tempo); the
/// time signature drives bar length and section window size.
pub fn parse_chart(content: &str, bpm: f64, time_sig: TimeSig) -> ChartDoc {
    let beats_per_bar = if time_sig.num == 4 { 4.0 } else { 3.0 };
    let mut next_start_beat = 0.0;
    let mut chords: Vec<ChartChord> = Vec::new();
    let mut lyrics: Vec<LyricLine> = Vec::new();

    for raw_line in content.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        // Bar-number marker repositions the grid cursor
        if line.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(bar) = line.parse::<u32>() {
                next_start_beat = bar.saturating_sub(1) as f64 * beats_per_bar;
                continue;
            }
        }

        let tokens = chord_tokens(line);
        if !tokens.is_empty() {
            for symbol in tokens {
                chords.push(ChartChord {
                    symbol,
                    start_beat: round_places(next_start_beat, 3),
                });
                next_start_beat += beats_per_bar;
            }
            continue;
        }

        lyrics.push(LyricLine::untimed(line));
    }

    let sections = infer_sections(&chords, time_sig);
    let issues = overlap_issues(&chords);

    ChartDoc {
        bpm,
        time_sig,
        sections,
        chords,
        lyrics,
        issues,
    }
}

/// Fixed-window section inference: alternating Verse/Chorus blocks until
/// one window past the last chord. 32 beats per window in 4-based meters,
/// 24 otherwise.
fn infer_sections(chords: &[ChartChord], time_sig: TimeSig) -> Vec<ChartSection> {
    let Some(last) = chords.last() else {
        return Vec::new();
    };
    let window = if time_sig.num == 4 { 32.0 } else { 24.0 };
    let end_guess = last.start_beat + window;

    let mut sections = Vec::new();
    let mut start = 0.0;
    let mut i = 0usize;
    while start < end_guess {
        sections.push(ChartSection {
            name: SECTION_NAMES[i % 2].to_string(),
            start_beat: round_places(start, 3),
            length_beats: window,
            color: SECTION_COLORS[i % 2].to_string(),
        });
        start += window;
        i += 1;
    }
    sections
}

/// Two chords sharing a start beat can't both be played; report each
/// duplicate as an advisory issue.
fn overlap_issues(chords: &[ChartChord]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut issues = Vec::new();
    for c in chords {
        // start beats are pre-rounded to 3 decimals, so a scaled integer
        // key compares them exactly
        let key = (c.start_beat * 1000.0).round() as i64;
        if !seen.insert(key) {
            issues.push(format!("overlapping chords at beat {}", c.start_beat));
        }
    }
    issues
}
