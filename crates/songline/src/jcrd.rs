//! Seconds-to-musical-units conversion for JCRD chord documents.
//!
//! A JCRD document carries `metadata.tempo`/`metadata.time_signature` plus
//! chords timestamped in absolute seconds, either nested under
//! `sections[].chords[]` or flat in `chord_progression[]`. Conversion
//! mirrors the input structure and appends quarter-beat, bar, and
//! beat-in-bar fields to every chord; a shape absent from the input is
//! simply absent from the output. The document tree stays loosely typed
//! because unknown metadata keys must survive the round trip.

use beatgrid::{bar_beat_one_indexed, round_places, sec_to_qbeats};
use serde_json::{json, Map, Value};

use crate::raw;

/// Convert a JCRD document's second timestamps into quarter-beat units.
///
/// Derived floats are rounded to 6 decimal places for stable
/// serialization. Never fails: a non-object input produces a document
/// holding only default metadata.
pub fn convert(doc: &Value) -> Value {
    let meta = raw::metadata_of(doc);
    let tempo = raw::tempo_of(&meta);
    let sig = raw::time_sig_of(&meta);
    let qbpm = sig.qbpm(tempo.unwrap_or(0.0));
    let qpb = sig.quarter_beats_per_bar();

    let mut meta_out = meta;
    meta_out.insert("bpm".into(), json!(tempo.unwrap_or(120.0)));
    meta_out.insert("qbpm".into(), json!(round_places(qbpm, 6)));
    meta_out.insert("time_signature".into(), json!(sig.to_string()));
    meta_out.insert(
        "quarter_beats_per_bar".into(),
        json!(round_places(qpb, 6)),
    );

    let mut out = Map::new();
    out.insert("metadata".into(), Value::Object(meta_out));

    let sections_out: Vec<Value> = doc
        .get("sections")
        .and_then(Value::as_array)
        .map(|sections| {
            sections
                .iter()
                .map(|sec| convert_section(sec, qbpm, qpb))
                .collect()
        })
        .unwrap_or_default();
    if !sections_out.is_empty() {
        out.insert("sections".into(), Value::Array(sections_out));
    }

    let progression_out: Vec<Value> = doc
        .get("chord_progression")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|it| convert_progression_entry(it, qbpm, qpb))
                .collect()
        })
        .unwrap_or_default();
    if !progression_out.is_empty() {
        out.insert("chord_progression".into(), Value::Array(progression_out));
    }

    Value::Object(out)
}

fn convert_section(sec: &Value, qbpm: f64, qpb: f64) -> Value {
    let chords_out: Vec<Value> = sec
        .get("chords")
        .and_then(Value::as_array)
        .map(|chords| {
            chords
                .iter()
                .map(|ch| convert_section_chord(ch, qbpm, qpb))
                .collect()
        })
        .unwrap_or_default();

    json!({
        "name": sec.get("name").cloned().unwrap_or(Value::Null),
        "start_sec": round_places(raw::num_field(sec, "start_time").unwrap_or(0.0), 6),
        "end_sec": round_places(raw::num_field(sec, "end_time").unwrap_or(0.0), 6),
        "chords": chords_out,
    })
}

fn convert_section_chord(ch: &Value, qbpm: f64, qpb: f64) -> Value {
    let st = raw::num_field(ch, "start_time").unwrap_or(0.0);
    let et = raw::num_field(ch, "end_time").unwrap_or(st);
    let start_q = sec_to_qbeats(st, qbpm);
    let end_q = sec_to_qbeats(et, qbpm);
    let dur_q = end_q - start_q;
    let dur_bars = if qpb > 0.0 { dur_q / qpb } else { 0.0 };
    let pos = bar_beat_one_indexed(start_q, qpb);

    json!({
        "chord": ch.get("chord").cloned().unwrap_or(Value::Null),
        "start_sec": round_places(st, 6),
        "end_sec": round_places(et, 6),
        "start_qbeats": round_places(start_q, 6),
        "end_qbeats": round_places(end_q, 6),
        "duration_qbeats": round_places(dur_q, 6),
        "duration_bars": round_places(dur_bars, 6),
        "start_bar": pos.bar,
        "start_beat_in_bar": pos.beat_in_bar,
    })
}

fn convert_progression_entry(it: &Value, qbpm: f64, qpb: f64) -> Value {
    let st = raw::num_field(it, "time").unwrap_or(0.0);
    let dur = raw::num_field(it, "duration").unwrap_or(0.0);
    let start_q = sec_to_qbeats(st, qbpm);
    let dur_q = sec_to_qbeats(dur, qbpm);
    let dur_bars = if qpb > 0.0 { dur_q / qpb } else { 0.0 };
    let pos = bar_beat_one_indexed(start_q, qpb);

    json!({
        "chord": it.get("chord").cloned().unwrap_or(Value::Null),
        "start_sec": round_places(st, 6),
        "start_qbeats": round_places(start_q, 6),
        "start_bar": pos.bar,
        "start_beat_in_bar": pos.beat_in_bar,
        "duration_sec": round_places(dur, 6),
        "duration_qbeats": round_places(dur_q, 6),
        "duration_bars": round_places(dur_bars, 6),
    })
}
