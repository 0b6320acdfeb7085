//! Canonical timeline normalization over raw song documents.
//!
//! The mapper tolerates every input shape the import pipelines produce:
//! tempo under four different keys, sections in beats or seconds, chords
//! at the top level, in a JCRD `chord_progression`, or nested inside
//! sections, lyrics as strings or timestamped objects. It resolves all of
//! them into one [`Timeline`] with every event quantized to the snap
//! grid, recording advisory warnings for heuristics applied and
//! validation warnings for structural problems. It never fails: a
//! document of entirely the wrong shape yields an empty timeline plus
//! validation warnings.

use std::str::FromStr;

use beatgrid::{beats_to_seconds, quantize, seconds_to_beats, TimeSig};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::raw;
use crate::types::{
    codes, ChordEvent, LyricEvent, Section, SectionKind, TempoMark, TimeSigMark, Timeline, Warning,
};

const DEFAULT_BPM: f64 = 120.0;

/// How to resolve chords when a document carries more than one chord
/// source (top-level `chords`, `chord_progression`, nested section
/// chords).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MergeStrategy {
    /// Append every source in order, keeping duplicates. Matches the
    /// historical behavior this engine replaces.
    AppendAll,
    /// Use only the first non-empty source.
    PreferFirst,
}

impl Default for MergeStrategy {
    fn default() -> Self {
        MergeStrategy::AppendAll
    }
}

#[derive(Debug, Clone)]
pub struct MapOptions {
    /// Snap grid in beats applied to every resolved beat position.
    pub snap: f64,
    pub merge_strategy: MergeStrategy,
}

impl Default for MapOptions {
    fn default() -> Self {
        MapOptions {
            snap: 0.25,
            merge_strategy: MergeStrategy::AppendAll,
        }
    }
}

/// A mapped timeline plus everything noteworthy that happened on the way.
///
/// `warnings` records heuristics applied (advisory only); `validation`
/// records structural problems, some of which callers treat as fatal (see
/// [`Warning::is_fatal`]).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapResult {
    pub timeline: Timeline,
    pub warnings: Vec<Warning>,
    pub validation: Vec<Warning>,
}

impl MapResult {
    /// True when any validation warning is fatal.
    pub fn has_fatal(&self) -> bool {
        self.validation.iter().any(Warning::is_fatal)
    }
}

/// Normalize a raw document into the canonical timeline.
pub fn to_timeline(raw_doc: &Value, opts: &MapOptions) -> MapResult {
    let mut warnings: Vec<Warning> = Vec::new();
    let mut validation: Vec<Warning> = Vec::new();

    let empty = Map::new();
    let obj = raw_doc.as_object().unwrap_or(&empty);
    let meta = obj
        .get("metadata")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    // Tempo: first usable alias wins; zero and malformed values fall
    // through to the next alias
    let bpm_candidate = [
        obj.get("bpm"),
        meta.get("bpm"),
        meta.get("tempo"),
        obj.get("tempo"),
    ]
    .into_iter()
    .flatten()
    .filter(|v| raw::truthy(v))
    .filter_map(raw::num)
    .next();
    let mut bpm = bpm_candidate.unwrap_or(DEFAULT_BPM);
    if !bpm.is_finite() || bpm <= 0.0 {
        bpm = DEFAULT_BPM;
        validation.push(Warning::new(
            codes::BPM_INVALID,
            "Invalid BPM, defaulted to 120",
        ));
    }

    let sig = match [
        obj.get("timeSignature"),
        meta.get("time_signature"),
        obj.get("time_signature"),
        meta.get("ts"),
    ]
    .into_iter()
    .flatten()
    .find(|v| raw::truthy(v))
    {
        None => TimeSig::default(),
        Some(v) => {
            let s = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            match TimeSig::from_str(&s) {
                Ok(sig) => sig,
                Err(_) => {
                    validation.push(Warning::new(
                        codes::TIMESIG_INVALID,
                        "Invalid time signature, defaulted to 4/4",
                    ));
                    TimeSig::default()
                }
            }
        }
    };

    let tempo_map = vec![TempoMark { at_sec: 0.0, bpm }];
    let time_sig_map = vec![TimeSigMark {
        at_sec: 0.0,
        num: sig.num,
        den: sig.den,
    }];

    let (mut sections, nested_chords) = map_sections(obj, bpm);
    let chord_rows = resolve_chord_rows(obj, nested_chords, opts.merge_strategy);
    let mut chords = map_chords(&chord_rows, bpm, opts.snap);
    infer_durations(&mut chords, &sections, bpm);
    let mut chords: Vec<ChordEvent> = chords.into_iter().map(|(ch, _)| ch).collect();

    let lyrics = map_lyrics(obj, bpm, opts.snap);

    if sections.is_empty() {
        if let Some(first) = chords.first() {
            sections.push(Section {
                kind: SectionKind::Verse,
                start_sec: first.at_sec,
                end_sec: None,
                name: None,
                inferred: true,
            });
            warnings.push(Warning::new(
                codes::SECTIONS_INFERRED,
                "Sections inferred heuristically",
            ));
        }
    }

    pair_chords_to_lyrics(&mut chords, &lyrics);

    if chords.is_empty() {
        validation.push(Warning::new(codes::CHORDS_EMPTY, "No chords present"));
    }
    if lyrics.is_empty() {
        validation.push(Warning::new(codes::LYRICS_EMPTY, "No lyrics present"));
    }
    if bpm <= 0.0 {
        validation.push(Warning::new(codes::BPM_MISSING, "Missing BPM"));
    }
    if sig.num == 0 || sig.den == 0 {
        validation.push(Warning::new(
            codes::TIMESIG_MISSING,
            "Missing time signature",
        ));
    }

    let (key, mode) = extract_key_mode(obj, meta);

    let id = [obj.get("id"), obj.get("songId")]
        .into_iter()
        .flatten()
        .find(|v| raw::truthy(v))
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_else(|| "unknown".to_string());

    debug!(
        id = id.as_str(),
        chords = chords.len(),
        lyrics = lyrics.len(),
        sections = sections.len(),
        "mapped raw document to timeline"
    );

    let timeline = Timeline {
        id,
        title: raw::str_field(raw_doc, "title"),
        artist: raw::str_field(raw_doc, "artist"),
        bpm_default: bpm,
        time_sig_default: sig,
        tempo_map,
        time_sig_map,
        sections,
        chords,
        lyrics,
        key,
        mode,
    };

    MapResult {
        timeline,
        warnings,
        validation,
    }
}

/// Map section rows, supporting beat-based (`startBeat`/`lengthBeats`) and
/// second-based (`start_time`/`end_time`) shapes, and pull out any chords
/// nested JCRD-style inside a section, tagged with that section's end for
/// duration inference.
fn map_sections(obj: &Map<String, Value>, bpm: f64) -> (Vec<Section>, Vec<(Value, Option<f64>)>) {
    let mut sections: Vec<Section> = Vec::new();
    let mut nested_chords: Vec<(Value, Option<f64>)> = Vec::new();

    for s in obj
        .get("sections")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
    {
        let start_beat = raw::num_field(s, "startBeat");
        let mut start_sec = raw::num_field(s, "startSec");
        if let Some(sb) = start_beat {
            start_sec = Some(beats_to_seconds(sb, bpm));
        }
        if start_sec.is_none() {
            start_sec = raw::num_field(s, "start_time");
        }
        let mut end_sec = raw::num_field(s, "endSec").or_else(|| raw::num_field(s, "end_time"));
        if end_sec.is_none() {
            if let (Some(sb), Some(lb)) = (start_beat, raw::num_field(s, "lengthBeats")) {
                end_sec = Some(beats_to_seconds(sb + lb, bpm));
            }
        }

        let orig_name = raw::str_field(s, "name");
        let kind = SectionKind::from_name(orig_name.as_deref());
        let name = orig_name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| kind.as_str().to_string());
        sections.push(Section {
            kind,
            start_sec: start_sec.unwrap_or(0.0),
            end_sec,
            name: Some(name),
            inferred: false,
        });

        for c in s.get("chords").and_then(Value::as_array).into_iter().flatten() {
            let has_symbol = ["chord", "symbol", "name"]
                .iter()
                .any(|k| c.get(*k).map(raw::truthy).unwrap_or(false));
            if has_symbol {
                nested_chords.push((c.clone(), end_sec));
            }
        }
    }

    (sections, nested_chords)
}

/// Resolve which chord rows feed the timeline, per the configured merge
/// strategy. Each row carries the end of its enclosing section when it
/// came from one.
fn resolve_chord_rows(
    obj: &Map<String, Value>,
    nested_chords: Vec<(Value, Option<f64>)>,
    strategy: MergeStrategy,
) -> Vec<(Value, Option<f64>)> {
    let top: Vec<Value> = obj
        .get("chords")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let prog: Vec<Value> = obj
        .get("chord_progression")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let untagged = |rows: Vec<Value>| rows.into_iter().map(|c| (c, None)).collect::<Vec<_>>();

    match strategy {
        MergeStrategy::AppendAll => {
            let mut rows: Vec<(Value, Option<f64>)> = Vec::new();
            if top.is_empty() {
                if !prog.is_empty() {
                    rows.extend(untagged(prog));
                    rows.extend(nested_chords);
                } else {
                    rows.extend(nested_chords);
                }
            } else {
                rows.extend(untagged(top));
                rows.extend(untagged(prog));
                rows.extend(nested_chords);
            }
            rows
        }
        MergeStrategy::PreferFirst => {
            if !top.is_empty() {
                untagged(top)
            } else if !prog.is_empty() {
                untagged(prog)
            } else {
                nested_chords
            }
        }
    }
}

/// Build chord events: resolve each row's symbol and start (beats
/// directly, or converted from the first usable second-based field),
/// quantize, and carry any explicit duration.
fn map_chords(
    rows: &[(Value, Option<f64>)],
    bpm: f64,
    snap: f64,
) -> Vec<(ChordEvent, Option<f64>)> {
    let mut out = Vec::new();
    for (c, section_end_sec) in rows {
        let Some(symbol) = ["symbol", "name", "chord"]
            .iter()
            .filter_map(|k| c.get(*k))
            .filter(|v| raw::truthy(v))
            .find_map(Value::as_str)
        else {
            continue;
        };

        let at_beat_raw = if c.get("startBeat").is_some() {
            raw::num_field(c, "startBeat").unwrap_or(0.0)
        } else {
            let sec = ["start_sec", "start_time", "time", "startTime"]
                .iter()
                .filter_map(|k| c.get(*k))
                .filter(|v| raw::truthy(v))
                .filter_map(raw::num)
                .next()
                .unwrap_or(0.0);
            seconds_to_beats(sec, bpm)
        };
        let at_beat = quantize(at_beat_raw, snap);
        let at_sec = beats_to_seconds(at_beat, bpm);

        let mut duration_beats =
            raw::num_field(c, "lengthBeats").or_else(|| raw::num_field(c, "durationBeats"));
        if duration_beats.is_none() {
            let start = raw::num_field(c, "start_time").or_else(|| raw::num_field(c, "time"));
            if let (Some(et), Some(st)) = (raw::num_field(c, "end_time"), start) {
                duration_beats = Some(seconds_to_beats((et - st).max(0.0), bpm));
            } else if let Some(d) = raw::num_field(c, "duration") {
                duration_beats = Some(seconds_to_beats(d, bpm));
            } else if let Some(d) = raw::num_field(c, "duration_sec") {
                duration_beats = Some(seconds_to_beats(d, bpm));
            }
        }

        out.push((
            ChordEvent {
                symbol: symbol.to_string(),
                at_sec,
                at_beat,
                duration_beats,
                lyric_id: None,
            },
            *section_end_sec,
        ));
    }
    out
}

/// Sort by beat and fill missing durations: the gap to the next chord, or
/// for the final chord the end of its section (the tagged nesting section
/// first, then any section containing its timestamp). Minimum 0.25 beats.
fn infer_durations(
    chords: &mut Vec<(ChordEvent, Option<f64>)>,
    sections: &[Section],
    bpm: f64,
) {
    chords.sort_by(|a, b| a.0.at_beat.total_cmp(&b.0.at_beat));
    for i in 0..chords.len() {
        if chords[i].0.duration_beats.is_some() {
            continue;
        }
        if let Some(next_beat) = chords.get(i + 1).map(|r| r.0.at_beat) {
            let at_beat = chords[i].0.at_beat;
            chords[i].0.duration_beats = Some((next_beat - at_beat).max(0.25));
        } else {
            let at_sec = chords[i].0.at_sec;
            let at_beat = chords[i].0.at_beat;
            let end_sec = chords[i].1.or_else(|| {
                sections
                    .iter()
                    .find(|s| {
                        at_sec >= s.start_sec && s.end_sec.map(|e| at_sec < e).unwrap_or(false)
                    })
                    .and_then(|s| s.end_sec)
            });
            if let Some(es) = end_sec {
                let sec_end_beat = seconds_to_beats(es, bpm);
                chords[i].0.duration_beats = Some((sec_end_beat - at_beat).max(0.25));
            }
        }
    }
}

/// Normalize lyric rows from any accepted shape: a list of strings, a
/// list of objects with `beat`/`timeSec`/`ts_sec`, or a map holding the
/// list under `lines`.
fn map_lyrics(obj: &Map<String, Value>, bpm: f64, snap: f64) -> Vec<LyricEvent> {
    let rows: Vec<Value> = match obj.get("lyrics") {
        Some(Value::Object(m)) => m
            .get("lines")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default(),
        Some(Value::Array(a)) => a.clone(),
        _ => Vec::new(),
    };

    let mut lyrics = Vec::new();
    for l in &rows {
        let (text, item): (&str, Option<&Map<String, Value>>) = match l {
            Value::String(s) if !s.is_empty() => (s.as_str(), None),
            Value::Object(m) => match m.get("text").and_then(Value::as_str) {
                Some(t) if !t.is_empty() => (t, Some(m)),
                _ => continue,
            },
            _ => continue,
        };

        let at_beat_raw = match item
            .and_then(|m| m.get("beat"))
            .filter(|v| !v.is_null())
        {
            Some(v) => raw::num(v).unwrap_or(0.0),
            None => {
                let sec = item
                    .map(|m| {
                        ["timeSec", "ts_sec"]
                            .iter()
                            .filter_map(|k| m.get(*k))
                            .filter(|v| raw::truthy(v))
                            .filter_map(raw::num)
                            .next()
                            .unwrap_or(0.0)
                    })
                    .unwrap_or(0.0);
                seconds_to_beats(sec, bpm)
            }
        };
        let at_beat = quantize(at_beat_raw, snap);
        let at_sec = beats_to_seconds(at_beat, bpm);

        let id = item
            .and_then(|m| m.get("id"))
            .filter(|v| raw::truthy(v))
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| format!("b{}", at_beat));

        lyrics.push(LyricEvent {
            id,
            at_sec,
            at_beat,
            text: text.to_string(),
        });
    }
    lyrics
}

/// Link each chord to the nearest lyric line within one beat. Lyrics are
/// scanned in beat order, so the scan stops once a candidate lies more
/// than a beat past the chord.
fn pair_chords_to_lyrics(chords: &mut [ChordEvent], lyrics: &[LyricEvent]) {
    let mut by_beat: Vec<&LyricEvent> = lyrics.iter().collect();
    by_beat.sort_by(|a, b| a.at_beat.total_cmp(&b.at_beat));

    for ch in chords.iter_mut() {
        let mut best: Option<&LyricEvent> = None;
        let mut best_dist = f64::INFINITY;
        for &ly in &by_beat {
            let d = (ly.at_beat - ch.at_beat).abs();
            if d < best_dist {
                best_dist = d;
                best = Some(ly);
            }
            if ly.at_beat > ch.at_beat + 1.0 {
                break;
            }
        }
        if let Some(b) = best {
            if best_dist <= 1.0 {
                ch.lyric_id = Some(b.id.clone());
            }
        }
    }
}

/// Key/mode extraction: strip a leading "Key" token and keep the last
/// pitch-letter-looking token ("Key E" -> "E", "E Major" -> "E").
fn extract_key_mode(
    obj: &Map<String, Value>,
    meta: &Map<String, Value>,
) -> (Option<String>, Option<String>) {
    let key = [obj.get("key"), meta.get("key")]
        .into_iter()
        .flatten()
        .find(|v| raw::truthy(v))
        .map(|v| match v {
            Value::String(s) => extract_key_token(s),
            other => other.to_string(),
        });
    let mode = [obj.get("mode"), meta.get("mode")]
        .into_iter()
        .flatten()
        .find(|v| raw::truthy(v))
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        });
    (key, mode)
}

fn extract_key_token(value: &str) -> String {
    let spaced = value.replace('_', " ");
    for tok in spaced.split_whitespace().rev() {
        let starts_with_pitch = tok
            .chars()
            .next()
            .map(|c| matches!(c.to_ascii_uppercase(), 'A'..='G'))
            .unwrap_or(false);
        if starts_with_pitch {
            return tok.replace("Key", "").trim().to_string();
        }
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn map(doc: Value) -> MapResult {
        to_timeline(&doc, &MapOptions::default())
    }

    #[test]
    fn quantization_and_duration_inference() {
        let doc = json!({
            "id": 1,
            "title": "Test",
            "artist": "X",
            "bpm": 120,
            "timeSignature": "4/4",
            "chords": [
                {"symbol": "C", "start_sec": 0.0},
                {"symbol": "G", "start_sec": 0.49},
                {"symbol": "Am", "start_sec": 1.01},
                {"symbol": "F", "start_sec": 1.51},
            ],
            "lyrics": [
                {"text": "Line 1", "ts_sec": 0.1},
                {"text": "Line 2", "ts_sec": 1.0},
            ],
        });
        let res = map(doc);
        assert!(res.validation.is_empty(), "unexpected: {:?}", res.validation);

        let beats: Vec<f64> = res.timeline.chords.iter().map(|c| c.at_beat).collect();
        assert_eq!(beats, vec![0.0, 1.0, 2.0, 3.0]);

        let durations: Vec<Option<f64>> = res
            .timeline
            .chords
            .iter()
            .map(|c| c.duration_beats)
            .collect();
        assert_eq!(durations[0], Some(1.0));
        assert_eq!(durations[1], Some(1.0));
        assert_eq!(durations[2], Some(1.0));
        // last chord has no following chord and no section to close it
        assert!(durations[3].is_none() || durations[3].unwrap() >= 0.25);
    }

    #[test]
    fn bpm_alias_resolution_order() {
        let res = map(json!({"bpm": 100, "metadata": {"tempo": 90}, "chords": []}));
        assert_eq!(res.timeline.bpm_default, 100.0);
        let res = map(json!({"metadata": {"bpm": 0, "tempo": 90}, "chords": []}));
        assert_eq!(res.timeline.bpm_default, 90.0);
        let res = map(json!({"tempo": 84, "chords": []}));
        assert_eq!(res.timeline.bpm_default, 84.0);
    }

    #[test]
    fn invalid_bpm_defaults_with_warning() {
        let res = map(json!({"bpm": -5, "chords": []}));
        assert_eq!(res.timeline.bpm_default, 120.0);
        assert!(res
            .validation
            .iter()
            .any(|w| w.code == codes::BPM_INVALID));
    }

    #[test]
    fn missing_bpm_defaults_silently() {
        let res = map(json!({"chords": [{"symbol": "C", "startBeat": 0.0}]}));
        assert_eq!(res.timeline.bpm_default, 120.0);
        assert!(res.validation.iter().all(|w| w.code != codes::BPM_INVALID));
    }

    #[test]
    fn invalid_time_signature_defaults_with_warning() {
        let res = map(json!({"timeSignature": "waltz", "chords": []}));
        assert_eq!(res.timeline.time_sig_default, TimeSig::new(4, 4));
        assert!(res
            .validation
            .iter()
            .any(|w| w.code == codes::TIMESIG_INVALID));
    }

    #[test]
    fn empty_chords_is_a_validation_error_lyrics_advisory() {
        let res = map(json!({"lyrics": ["la la la"]}));
        assert!(res.validation.iter().any(|w| w.code == codes::CHORDS_EMPTY));
        assert!(res.has_fatal());

        let res = map(json!({"chords": [{"symbol": "C", "startBeat": 0.0}]}));
        let lyr = res
            .validation
            .iter()
            .find(|w| w.code == codes::LYRICS_EMPTY)
            .expect("lyrics.empty recorded");
        assert!(!lyr.is_fatal());
        assert!(!res.has_fatal());
    }

    #[test]
    fn chord_progression_fallback_and_duration() {
        let res = map(json!({
            "bpm": 120,
            "chord_progression": [
                {"chord": "C", "time": 0.0, "duration": 2.0},
                {"chord": "F", "time": 2.0, "duration": 2.0},
            ],
        }));
        let chords = &res.timeline.chords;
        assert_eq!(chords.len(), 2);
        assert_eq!(chords[0].symbol, "C");
        assert_eq!(chords[0].at_beat, 0.0);
        // explicit durations convert from seconds: 2s at 120 bpm = 4 beats
        assert_eq!(chords[0].duration_beats, Some(4.0));
        assert_eq!(chords[1].at_beat, 4.0);
    }

    #[test]
    fn nested_section_chords_and_end_tagging() {
        let res = map(json!({
            "bpm": 60,
            "sections": [{
                "name": "Verse",
                "start_time": 0.0,
                "end_time": 8.0,
                "chords": [{"chord": "Am", "start_time": 4.0}],
            }],
        }));
        let chords = &res.timeline.chords;
        assert_eq!(chords.len(), 1);
        assert_eq!(chords[0].symbol, "Am");
        // 60 bpm: 4s = 4 beats; duration runs to the tagged section end (8s)
        assert_eq!(chords[0].at_beat, 4.0);
        assert_eq!(chords[0].duration_beats, Some(4.0));
    }

    #[test]
    fn append_all_merges_duplicate_sources() {
        let doc = json!({
            "bpm": 120,
            "chords": [{"symbol": "C", "startBeat": 0.0}],
            "chord_progression": [{"chord": "C", "time": 0.0, "duration": 2.0}],
        });
        let res = to_timeline(&doc, &MapOptions::default());
        // duplicates are kept by design under append-all
        assert_eq!(res.timeline.chords.len(), 2);

        let res = to_timeline(
            &doc,
            &MapOptions {
                merge_strategy: MergeStrategy::PreferFirst,
                ..MapOptions::default()
            },
        );
        assert_eq!(res.timeline.chords.len(), 1);
    }

    #[test]
    fn beat_based_sections_convert_to_seconds() {
        let res = map(json!({
            "bpm": 120,
            "sections": [{"name": "Chorus", "startBeat": 8.0, "lengthBeats": 16.0}],
            "chords": [],
        }));
        let sec = &res.timeline.sections[0];
        assert_eq!(sec.kind, SectionKind::Chorus);
        // 8 beats at 120 bpm = 4 seconds
        assert_eq!(sec.start_sec, 4.0);
        assert_eq!(sec.end_sec, Some(12.0));
        assert_eq!(sec.name.as_deref(), Some("Chorus"));
    }

    #[test]
    fn sections_inferred_when_absent() {
        let res = map(json!({
            "bpm": 120,
            "chords": [{"symbol": "C", "start_sec": 2.0}],
        }));
        assert_eq!(res.timeline.sections.len(), 1);
        let sec = &res.timeline.sections[0];
        assert!(sec.inferred);
        assert_eq!(sec.kind, SectionKind::Verse);
        assert_eq!(sec.start_sec, 2.0);
        assert!(res
            .warnings
            .iter()
            .any(|w| w.code == codes::SECTIONS_INFERRED));
    }

    #[test]
    fn no_section_synthesized_without_chords() {
        let res = map(json!({"lyrics": ["words"]}));
        assert!(res.timeline.sections.is_empty());
        assert!(res.warnings.is_empty());
    }

    #[test]
    fn lyric_shapes_normalize() {
        // plain strings
        let res = map(json!({"chords": [], "lyrics": ["one", "two"]}));
        assert_eq!(res.timeline.lyrics.len(), 2);
        assert_eq!(res.timeline.lyrics[0].text, "one");
        assert_eq!(res.timeline.lyrics[0].at_beat, 0.0);
        assert_eq!(res.timeline.lyrics[0].id, "b0");

        // dict with lines, mixed beat/seconds
        let res = map(json!({
            "bpm": 120,
            "chords": [],
            "lyrics": {"lines": [
                {"text": "timed", "ts_sec": 1.0},
                {"text": "beat", "beat": 6.0, "id": "chorus-1"},
            ]},
        }));
        assert_eq!(res.timeline.lyrics.len(), 2);
        assert_eq!(res.timeline.lyrics[0].at_beat, 2.0);
        assert_eq!(res.timeline.lyrics[0].id, "b2");
        assert_eq!(res.timeline.lyrics[1].at_beat, 6.0);
        assert_eq!(res.timeline.lyrics[1].id, "chorus-1");
    }

    #[test]
    fn chords_pair_to_nearest_lyric_within_one_beat() {
        let res = map(json!({
            "bpm": 120,
            "chords": [
                {"symbol": "C", "startBeat": 0.0},
                {"symbol": "G", "startBeat": 8.0},
            ],
            "lyrics": [
                {"text": "close", "beat": 0.5},
                {"text": "far", "beat": 4.0},
            ],
        }));
        let chords = &res.timeline.chords;
        assert_eq!(chords[0].lyric_id.as_deref(), Some("b0.5"));
        // nearest lyric is 4 beats away, beyond the 1-beat window
        assert_eq!(chords[1].lyric_id, None);
    }

    #[test]
    fn key_extraction_heuristics() {
        let res = map(json!({"chords": [], "key": "Key E"}));
        assert_eq!(res.timeline.key.as_deref(), Some("E"));

        let res = map(json!({"chords": [], "metadata": {"key": "E Major"}}));
        assert_eq!(res.timeline.key.as_deref(), Some("E"));

        // "minor" does not start with a pitch letter; the scan keeps
        // walking back to "Bb"
        let res = map(json!({"chords": [], "key": "Bb_minor", "mode": "minor"}));
        assert_eq!(res.timeline.key.as_deref(), Some("Bb"));
        assert_eq!(res.timeline.mode.as_deref(), Some("minor"));
    }

    #[test]
    fn id_falls_back_through_aliases() {
        let res = map(json!({"chords": [], "songId": 42}));
        assert_eq!(res.timeline.id, "42");
        let res = map(json!({"chords": []}));
        assert_eq!(res.timeline.id, "unknown");
    }

    #[test]
    fn non_object_input_yields_empty_timeline() {
        let res = map(json!([1, 2, 3]));
        assert!(res.timeline.chords.is_empty());
        assert!(res.timeline.lyrics.is_empty());
        assert_eq!(res.timeline.bpm_default, 120.0);
        assert!(res.has_fatal());
    }

    #[test]
    fn malformed_numeric_fields_are_skipped() {
        let res = map(json!({
            "bpm": "fast",
            "tempo": 90,
            "chords": [{"symbol": "C", "start_sec": "soon"}],
        }));
        // "fast" falls through to the tempo alias
        assert_eq!(res.timeline.bpm_default, 90.0);
        // unparseable start collapses to 0 rather than dropping the chord
        assert_eq!(res.timeline.chords[0].at_beat, 0.0);
    }
}
