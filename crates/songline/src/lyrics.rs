//! Lyric payload parsing: LRC, WebVTT, and plain text into timestamped
//! lines.
//!
//! Output rows are [`LyricLine`] values ready for the merger or the
//! timeline mapper. Parsing is generous: anything that fails a timestamp
//! grammar simply comes through as an untimed line.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::LyricLine;

/// `[mm:ss]` or `[mm:ss.xxx]`; several stamps may prefix one line.
static LRC_STAMP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(\d{1,2}):(\d{2})(?:\.(\d{1,3}))?\]").expect("lrc stamp regex"));

/// A WebVTT cue timing line: `hh:mm:ss.mmm --> hh:mm:ss.mmm`.
static VTT_CUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2}):(\d{2}):(\d{2})\.(\d{3})\s+-->\s+(\d{2}):(\d{2}):(\d{2})\.(\d{3})")
        .expect("vtt cue regex")
});

fn to_seconds(mins: u32, secs: u32, ms: u32) -> f64 {
    mins as f64 * 60.0 + secs as f64 + ms as f64 / 1000.0
}

/// Parse LRC-format lyrics.
///
/// A line may carry several timestamps; its text is emitted once per
/// stamp. Lines without any stamp become untimed.
pub fn parse_lrc(text: &str) -> Vec<LyricLine> {
    let mut lines = Vec::new();
    for raw_line in text.lines() {
        let stamps: Vec<_> = LRC_STAMP.captures_iter(raw_line).collect();
        if stamps.is_empty() {
            let clean = raw_line.trim();
            if !clean.is_empty() {
                lines.push(LyricLine::untimed(clean));
            }
            continue;
        }

        let content = LRC_STAMP.replace_all(raw_line, "").trim().to_string();
        for cap in &stamps {
            let mins: u32 = cap[1].parse().unwrap_or(0);
            let secs: u32 = cap[2].parse().unwrap_or(0);
            // fractional part is left-aligned: ".5" means 500ms
            let ms: u32 = cap
                .get(3)
                .map(|m| {
                    let mut digits = m.as_str().to_string();
                    while digits.len() < 3 {
                        digits.push('0');
                    }
                    digits.parse().unwrap_or(0)
                })
                .unwrap_or(0);
            lines.push(LyricLine::timed(to_seconds(mins, secs, ms), content.clone()));
        }
    }
    lines
}

/// Parse WebVTT lyrics: each cue timing stamps the payload lines that
/// follow it. The `WEBVTT` header is dropped.
pub fn parse_vtt(text: &str) -> Vec<LyricLine> {
    let mut cur_ts: Option<f64> = None;
    let mut lines = Vec::new();
    for raw_line in text.lines() {
        let s = raw_line.trim();
        if let Some(cap) = VTT_CUE.captures(s) {
            let hh: u32 = cap[1].parse().unwrap_or(0);
            let mm: u32 = cap[2].parse().unwrap_or(0);
            let ss: u32 = cap[3].parse().unwrap_or(0);
            let ms: u32 = cap[4].parse().unwrap_or(0);
            cur_ts = Some(hh as f64 * 3600.0 + to_seconds(mm, ss, ms));
            continue;
        }
        if s.is_empty() || s.starts_with("WEBVTT") {
            continue;
        }
        lines.push(LyricLine {
            ts_sec: cur_ts,
            text: s.to_string(),
        });
    }
    lines
}

/// Plain text: every non-empty line is an untimed lyric.
pub fn parse_plain(text: &str) -> Vec<LyricLine> {
    text.lines()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(LyricLine::untimed)
        .collect()
}

/// Route a lyric payload to the right parser by filename hint, falling
/// back to a `WEBVTT` content sniff and finally plain text.
pub fn parse_payload(text: &str, filename: Option<&str>) -> Vec<LyricLine> {
    let name = filename.unwrap_or("").to_lowercase();
    if name.ends_with(".lrc") {
        return parse_lrc(text);
    }
    let head: String = text.chars().take(20).collect();
    if name.ends_with(".vtt") || head.to_uppercase().contains("WEBVTT") {
        return parse_vtt(text);
    }
    parse_plain(text)
}
