//! Merging a chord progression with lyric lines into one bar-aligned chart.
//!
//! Chords and lyrics usually arrive from independent sources with
//! independent clocks: chord segments timestamped by analysis, lyric lines
//! timestamped by an LRC file or not at all. This module reconciles them.
//! It shifts the grid so the first musical event lands on a downbeat,
//! windows each lyric line against the chords sounding under it,
//! synthesizes timestamps for untimed lines, marks lyric-free spans of
//! chord activity as instrumental, and renders the result as a bar-grouped
//! text chart.

use beatgrid::{bar_beat_one_indexed, round_places, sec_to_qbeats};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::raw;
use crate::types::LyricLine;

/// Leftover annotation markup like `[Verse]` is stripped from rendered
/// text.
static BRACKETED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\]]*\]").expect("bracket regex"));

/// First event within this many seconds of zero needs no downbeat shift.
const NEAR_ZERO_SEC: f64 = 0.25;
/// Events this close to beat 1 already sit on a downbeat.
const DOWNBEAT_TOLERANCE_BEATS: f64 = 0.3;
/// Gap edges are pulled in by this much to avoid tying into lyric lines.
const GAP_EDGE_EPS_SEC: f64 = 0.05;

/// Where bar 1 starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BarStart {
    /// Shift the grid so the earliest musical event lands on bar 1 beat 1.
    Auto,
    /// Bar 1 starts at zero seconds, pickup or not.
    Zero,
}

impl BarStart {
    pub fn as_str(&self) -> &'static str {
        match self {
            BarStart::Auto => "auto",
            BarStart::Zero => "zero",
        }
    }
}

impl Default for BarStart {
    fn default() -> Self {
        BarStart::Auto
    }
}

#[derive(Debug, Clone)]
pub struct MergeOptions {
    pub bar_start: BarStart,
    /// Minimum length, in bars, for a lyric-free span to earn an
    /// instrumental line.
    pub instrumental_min_bars: f64,
}

impl Default for MergeOptions {
    fn default() -> Self {
        MergeOptions {
            bar_start: BarStart::Auto,
            instrumental_min_bars: 1.0,
        }
    }
}

/// A chord active over `[start_sec, end_sec)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordSegment {
    pub start_sec: f64,
    pub end_sec: f64,
    pub chord: Option<String>,
}

/// A chord pinned to a bar/beat position on the merged grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedChord {
    pub chord: Option<String>,
    pub bar: u32,
    pub beat_in_bar: f64,
}

/// One line of the merged chart: a lyric or instrumental marker with the
/// chords sounding in its window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedLine {
    pub ts_sec: Option<f64>,
    pub bar: Option<u32>,
    pub beat_in_bar: Option<f64>,
    pub qbeats: Option<f64>,
    pub text: String,
    pub chords: Vec<PlacedChord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeOutput {
    pub metadata: Value,
    pub lines: Vec<CombinedLine>,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChordsOnlyOutput {
    pub metadata: Value,
    pub chords: Vec<PlacedChord>,
    pub content: String,
}

/// The merged grid: quarter-beat tempo, bar length, meter numerator, and
/// the downbeat offset subtracted from every placement.
#[derive(Debug, Clone, Copy)]
struct Grid {
    qbpm: f64,
    qpb: f64,
    num: u32,
    qoffset: f64,
}

impl Grid {
    /// Place a second timestamp on the grid: (bar, snapped beat, adjusted
    /// quarter-beats).
    fn place(&self, sec: f64) -> (u32, f64, f64) {
        let q_adj = (sec_to_qbeats(sec, self.qbpm) - self.qoffset).max(0.0);
        let pos = bar_beat_one_indexed(q_adj, self.qpb);
        (
            pos.bar,
            snap_beat_with_even_bias(pos.beat_in_bar, self.num),
            q_adj,
        )
    }

    fn placed_chord(&self, seg: &ChordSegment) -> PlacedChord {
        let (bar, beat_in_bar, _) = self.place(seg.start_sec);
        PlacedChord {
            chord: seg.chord.clone(),
            bar,
            beat_in_bar,
        }
    }
}

/// Collect chord segments from a JCRD document, preferring
/// `chord_progression` over `sections[].chords[]`.
pub fn collect_chord_segments(jcrd: &Value) -> Vec<ChordSegment> {
    let mut segs: Vec<ChordSegment> = Vec::new();
    for it in jcrd
        .get("chord_progression")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
    {
        let st = raw::num_field(it, "time").unwrap_or(0.0);
        let dur = raw::num_field(it, "duration").unwrap_or(0.0);
        segs.push(ChordSegment {
            start_sec: st,
            end_sec: st + dur,
            chord: raw::str_field(it, "chord"),
        });
    }
    if !segs.is_empty() {
        return segs;
    }

    for sec in jcrd
        .get("sections")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
    {
        for ch in sec.get("chords").and_then(Value::as_array).into_iter().flatten() {
            let st = raw::num_field(ch, "start_time").unwrap_or(0.0);
            let et = raw::num_field(ch, "end_time").unwrap_or(st);
            segs.push(ChordSegment {
                start_sec: st,
                end_sec: et,
                chord: raw::str_field(ch, "chord"),
            });
        }
    }
    segs.sort_by(|a, b| a.start_sec.total_cmp(&b.start_sec));
    segs
}

/// Snap a 1-indexed beat-in-bar to one decimal place for display.
///
/// Rounds to the nearest half beat first; values within 0.15 of an integer
/// snap to it. In 4/4 an integer landing on beat 3 is further biased to
/// beat 4, favoring the even-beat chord placements typical of that meter.
/// Whether the even bias generalizes to other numerators is an open
/// question; it applies only when `num == 4`.
pub fn snap_beat_with_even_bias(beat_in_bar: f64, num: u32) -> f64 {
    let v = beat_in_bar.clamp(1.0, num.max(1) as f64);
    let mut v05 = (v * 2.0).round() / 2.0;
    if (v05 - v05.round()).abs() <= 0.15 {
        v05 = v05.round();
        if num == 4 && v05 as i64 == 3 {
            // bias beat 3 to the nearest even beat, which in 4/4 is 4
            v05 = 4.0;
        }
    }
    round_places(v05, 1)
}

/// Estimate the quarter-beat offset that puts the earliest musical event
/// on bar 1 beat 1.
///
/// Chord starts are preferred; lyric timestamps are consulted only when no
/// chords exist. Events effectively at the song start, or already close to
/// a downbeat, need no offset.
fn detect_qoffset(segs: &[ChordSegment], lyrics: &[LyricLine], qbpm: f64, qpb: f64) -> f64 {
    let mut candidates: Vec<f64> = segs.iter().map(|s| s.start_sec).collect();
    if candidates.is_empty() {
        candidates.extend(lyrics.iter().filter_map(|l| l.ts_sec));
    }
    let Some(earliest) = candidates.into_iter().reduce(f64::min) else {
        return 0.0;
    };
    let t0 = earliest.max(0.0);
    if t0 <= NEAR_ZERO_SEC {
        return 0.0;
    }
    if qpb <= 0.0 {
        return 0.0;
    }
    let start_q = sec_to_qbeats(t0, qbpm);
    let rem = start_q % qpb;
    let beat_in_bar = (rem % qpb) + 1.0;
    if (beat_in_bar - 1.0).abs() <= DOWNBEAT_TOLERANCE_BEATS {
        return 0.0;
    }
    rem
}

/// The chord sounding at `ts`, falling back to the final chord for
/// positions past the end of the progression.
fn find_chord(segs: &[ChordSegment], ts: f64) -> Option<String> {
    for s in segs {
        if s.start_sec <= ts && ts < s.end_sec {
            return s.chord.clone();
        }
    }
    match segs.last() {
        Some(last) if ts >= last.start_sec => last.chord.clone(),
        _ => None,
    }
}

/// Merge a JCRD chord document with lyric lines into a combined chart.
pub fn merge_with_lyrics(jcrd: &Value, lyrics: &[LyricLine], opts: &MergeOptions) -> MergeOutput {
    let meta = raw::metadata_of(jcrd);
    let tempo = raw::tempo_of(&meta);
    let sig = raw::time_sig_of(&meta);
    let qbpm = sig.qbpm(tempo.unwrap_or(0.0));
    let qpb = sig.quarter_beats_per_bar();

    let segs = collect_chord_segments(jcrd);
    let last_end = segs.iter().map(|s| s.end_sec).fold(0.0, f64::max);

    let qoffset = match opts.bar_start {
        BarStart::Zero => 0.0,
        BarStart::Auto => detect_qoffset(&segs, lyrics, qbpm, qpb),
    };
    let grid = Grid {
        qbpm,
        qpb,
        num: sig.num,
        qoffset,
    };

    let lyric_ts: Vec<Option<f64>> = lyrics.iter().map(|l| l.ts_sec).collect();
    let n_lyrics = lyrics.len();
    let mut combined: Vec<CombinedLine> = Vec::new();

    for (idx, ln) in lyrics.iter().enumerate() {
        let text = ln.text.trim();
        if text.is_empty() {
            continue;
        }

        // The next timed line bounds this line's chord window
        let mut next_ts: Option<f64> = lyric_ts[idx + 1..].iter().copied().flatten().next();

        let tsf = match lyric_ts[idx] {
            Some(ts) => ts,
            None => {
                // Untimed line: spread pseudo-timestamps evenly over the
                // chord span. When the following lines are untimed too,
                // window against their pseudo stamps.
                let pseudo = if last_end > 0.0 && n_lyrics > 1 {
                    last_end * idx as f64 / (n_lyrics - 1) as f64
                } else {
                    0.0
                };
                if next_ts.is_none() {
                    for (j, ts) in lyric_ts.iter().enumerate().skip(idx + 1) {
                        if ts.is_none() {
                            next_ts = Some(if last_end > 0.0 && n_lyrics > 1 {
                                last_end * j as f64 / (n_lyrics - 1) as f64
                            } else {
                                last_end
                            });
                            break;
                        }
                    }
                }
                pseudo
            }
        };

        let window_start = tsf;
        let window_end = next_ts.unwrap_or(last_end);
        let mut chords_for_line: Vec<PlacedChord> = segs
            .iter()
            .filter(|s| !(s.end_sec <= window_start || s.start_sec >= window_end))
            .map(|s| grid.placed_chord(s))
            .collect();
        if chords_for_line.is_empty() {
            // Nothing overlaps the window; fall back to whatever sounds
            // exactly at the lyric's timestamp
            let (bar, beat_in_bar, _) = grid.place(tsf);
            chords_for_line.push(PlacedChord {
                chord: find_chord(&segs, tsf),
                bar,
                beat_in_bar,
            });
        }

        let (bar, beat_in_bar, q_adj) = grid.place(tsf);
        combined.push(CombinedLine {
            ts_sec: Some(round_places(tsf, 3)),
            bar: Some(bar),
            beat_in_bar: Some(beat_in_bar),
            qbeats: Some(round_places(q_adj, 3)),
            text: text.to_string(),
            chords: chords_for_line,
        });
    }

    insert_instrumental_lines(
        &mut combined,
        &segs,
        &lyric_ts,
        last_end,
        grid,
        opts.instrumental_min_bars,
    );

    combined.sort_by(|a, b| {
        let key = |cl: &CombinedLine| {
            (
                cl.ts_sec.unwrap_or(1e12),
                cl.bar.map(f64::from).unwrap_or(1e9),
                cl.beat_in_bar.unwrap_or(1e6),
            )
        };
        let (ka, kb) = (key(a), key(b));
        ka.0.total_cmp(&kb.0)
            .then(ka.1.total_cmp(&kb.1))
            .then(ka.2.total_cmp(&kb.2))
    });

    let content = render_content(&combined, sig.num);

    debug!(
        lines = combined.len(),
        segments = segs.len(),
        qoffset,
        "merged chords with lyrics"
    );

    MergeOutput {
        metadata: merged_metadata(&meta, tempo, sig.to_string(), qbpm, qpb, opts.bar_start, qoffset),
        lines: combined,
        content,
    }
}

/// Bar-grouped chords-only rendering: same offset detection and grid
/// logic as the full merge, no lyric machinery.
pub fn chords_only(jcrd: &Value, bar_start: BarStart) -> ChordsOnlyOutput {
    let meta = raw::metadata_of(jcrd);
    let tempo = raw::tempo_of(&meta);
    let sig = raw::time_sig_of(&meta);
    let qbpm = sig.qbpm(tempo.unwrap_or(0.0));
    let qpb = sig.quarter_beats_per_bar();

    let segs = collect_chord_segments(jcrd);
    let qoffset = match bar_start {
        BarStart::Zero => 0.0,
        BarStart::Auto => detect_qoffset(&segs, &[], qbpm, qpb),
    };
    let grid = Grid {
        qbpm,
        qpb,
        num: sig.num,
        qoffset,
    };

    let group_size = sig.num.max(1);
    let mut chord_rows: Vec<PlacedChord> = Vec::new();
    let mut content_lines: Vec<String> = Vec::new();
    let mut last_group_start: Option<u32> = None;

    for seg in &segs {
        let row = grid.placed_chord(seg);
        let bar = row.bar;
        let has_chord = row.chord.as_deref().map(|c| !c.is_empty()).unwrap_or(false);
        if has_chord {
            let group_start = (bar - 1) / group_size * group_size + 1;
            if last_group_start != Some(group_start) {
                if last_group_start.is_some() {
                    content_lines.push(String::new());
                }
                content_lines.push(group_start.to_string());
                last_group_start = Some(group_start);
            }
            content_lines.push(row.chord.clone().unwrap_or_default());
        }
        chord_rows.push(row);
    }

    let content = sanitize_lines(&content_lines);

    ChordsOnlyOutput {
        metadata: merged_metadata(&meta, tempo, sig.to_string(), qbpm, qpb, bar_start, qoffset),
        chords: chord_rows,
        content,
    }
}

/// Mark lyric-free spans of chord activity as instrumental lines.
///
/// Only the lead-in before the first timed lyric and the tail after the
/// last are considered (the whole song when no line is timed). Gaps
/// between two lyric lines are deliberately left alone: chords there
/// belong to the bounding lines' windows.
fn insert_instrumental_lines(
    combined: &mut Vec<CombinedLine>,
    segs: &[ChordSegment],
    lyric_ts: &[Option<f64>],
    last_end: f64,
    grid: Grid,
    min_bars: f64,
) {
    if segs.is_empty() {
        return;
    }

    let mut timed: Vec<f64> = lyric_ts.iter().copied().flatten().collect();
    timed.sort_by(f64::total_cmp);

    let sec_per_q = if grid.qbpm > 0.0 { 60.0 / grid.qbpm } else { 0.5 };
    let sec_per_bar = if grid.qpb > 0.0 {
        sec_per_q * grid.qpb
    } else {
        2.0
    };
    let gap_threshold = (min_bars * sec_per_bar).max(0.5);

    match (timed.first(), timed.last()) {
        (Some(&first_ts), Some(&last_ts)) => {
            push_gap(combined, segs, 0.0, first_ts, gap_threshold, grid);
            push_gap(combined, segs, last_ts, last_end, gap_threshold, grid);
        }
        _ => {
            // No timed lyric at all: the whole chord span is instrumental
            push_gap(combined, segs, 0.0, last_end, gap_threshold, grid);
        }
    }
}

fn push_gap(
    combined: &mut Vec<CombinedLine>,
    segs: &[ChordSegment],
    seg_start: f64,
    seg_end: f64,
    gap_threshold: f64,
    grid: Grid,
) {
    if seg_end - seg_start < gap_threshold {
        return;
    }
    let seg_start = seg_start + GAP_EDGE_EPS_SEC;
    let seg_end = seg_end - GAP_EDGE_EPS_SEC;
    if seg_end <= seg_start {
        return;
    }

    let overlapping: Vec<&ChordSegment> = segs
        .iter()
        .filter(|s| !(s.end_sec <= seg_start || s.start_sec >= seg_end))
        .collect();
    if overlapping.is_empty() {
        return;
    }

    let chords_for_line: Vec<PlacedChord> =
        overlapping.iter().map(|s| grid.placed_chord(s)).collect();
    // Anchor the line at the first chord inside the span
    let tsf = overlapping[0].start_sec.max(seg_start);
    let (bar, beat_in_bar, q_adj) = grid.place(tsf);
    combined.push(CombinedLine {
        ts_sec: Some(round_places(tsf, 3)),
        bar: Some(bar),
        beat_in_bar: Some(beat_in_bar),
        qbeats: Some(round_places(q_adj, 3)),
        text: "(instrumental)".to_string(),
        chords: chords_for_line,
    });
}

/// Render combined lines as text: a bar-group marker whenever the group
/// changes, chord names over each line, then the line itself.
fn render_content(combined: &[CombinedLine], num: u32) -> String {
    let group_size = num.max(1);
    let mut out: Vec<String> = Vec::new();
    let mut last_group_start: Option<u32> = None;

    for cl in combined {
        if let Some(bar) = cl.bar {
            let group_start = (bar - 1) / group_size * group_size + 1;
            if last_group_start != Some(group_start) {
                if last_group_start.is_some() {
                    out.push(String::new());
                }
                out.push(group_start.to_string());
                last_group_start = Some(group_start);
            }
        }
        let header: Vec<&str> = cl
            .chords
            .iter()
            .filter_map(|c| c.chord.as_deref())
            .filter(|c| !c.is_empty())
            .collect();
        if !header.is_empty() {
            out.push(header.join("  "));
        }
        out.push(cl.text.clone());
    }

    sanitize_lines(&out)
}

fn sanitize_lines(lines: &[String]) -> String {
    lines
        .iter()
        .map(|ln| BRACKETED.replace_all(ln, "-").into_owned())
        .collect::<Vec<_>>()
        .join("\n")
}

fn merged_metadata(
    meta: &serde_json::Map<String, Value>,
    tempo: Option<f64>,
    time_signature: String,
    qbpm: f64,
    qpb: f64,
    bar_start: BarStart,
    qoffset: f64,
) -> Value {
    let mut out = meta.clone();
    out.insert("time_signature".into(), json!(time_signature));
    out.insert("bpm".into(), json!(tempo.unwrap_or(120.0)));
    out.insert("qbpm".into(), json!(round_places(qbpm, 4)));
    out.insert("quarter_beats_per_bar".into(), json!(round_places(qpb, 4)));
    out.insert("bar_start".into(), json!(bar_start.as_str()));
    out.insert("qoffset".into(), json!(round_places(qoffset, 4)));
    Value::Object(out)
}
