use serde::{Deserialize, Serialize};

use crate::timesig::TimeSig;

/// Convert seconds to beats at the given tempo.
///
/// A zero or negative bpm is treated as 120 so this never divides by a
/// non-positive tempo.
pub fn seconds_to_beats(seconds: f64, bpm: f64) -> f64 {
    let bpm = if bpm > 0.0 { bpm } else { 120.0 };
    seconds * bpm / 60.0
}

/// Convert beats to seconds at the given tempo.
///
/// A zero or negative bpm returns `beats` unchanged, treating the value as
/// already being in seconds. Note the asymmetry with [`seconds_to_beats`],
/// which substitutes 120 instead: both fallbacks are load-bearing at
/// existing call sites, so they stay distinct rather than being unified.
pub fn beats_to_seconds(beats: f64, bpm: f64) -> f64 {
    if bpm > 0.0 {
        beats * 60.0 / bpm
    } else {
        beats
    }
}

/// Round `value` to the nearest multiple of `step`.
///
/// A zero or negative step disables quantization and returns the value
/// unchanged.
pub fn quantize(value: f64, step: f64) -> f64 {
    if step <= 0.0 {
        return value;
    }
    (value / step).round() * step
}

/// Beat step for a grid label like `"1/8"`, relative to a quarter note.
///
/// `"1/4"` -> 1.0 beat, `"1/8"` -> 0.5, `"1/16"` -> 0.25. Malformed labels
/// return 0.0, which callers treat as "no quantization".
pub fn grid_step(grid: &str) -> f64 {
    let Some((_, den_s)) = grid.split_once('/') else {
        return 0.0;
    };
    match den_s.trim().parse::<u32>() {
        Ok(div) if div > 0 => 4.0 / div as f64,
        _ => 0.0,
    }
}

/// Convert seconds to quarter-beats at a quarter-beats-per-minute rate
/// (see [`TimeSig::qbpm`]).
pub fn sec_to_qbeats(seconds: f64, qbpm: f64) -> f64 {
    seconds * qbpm / 60.0
}

/// Round to `places` decimal places for stable serialization.
pub fn round_places(v: f64, places: u32) -> f64 {
    let scale = 10f64.powi(places as i32);
    (v * scale).round() / scale
}

/// A position within a song expressed as bar number plus beat within the bar.
///
/// `bar` is always 1-based. Whether `beat_in_bar` is 0-indexed or 1-indexed
/// depends on which conversion produced it; see [`bar_beat_zero_indexed`]
/// and [`bar_beat_one_indexed`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarPosition {
    pub bar: u32,
    pub beat_in_bar: f64,
}

/// Bar and 0-indexed beat remainder for a beat count.
///
/// This is the internal-arithmetic convention used by the timeline mapper:
/// beat 0.0 of bar 2 is the downbeat of bar 2. The remainder is rounded to
/// 4 decimal places. A degenerate signature (zero quarter-beats per bar)
/// falls back to `num` beats per bar.
pub fn bar_beat_zero_indexed(beats: f64, sig: TimeSig) -> BarPosition {
    let mut qpb = sig.quarter_beats_per_bar();
    if qpb <= 0.0 {
        qpb = sig.num.max(1) as f64;
    }
    let bar_index = (beats / qpb) as i64;
    BarPosition {
        bar: (bar_index + 1).max(1) as u32,
        beat_in_bar: round_places(beats - bar_index as f64 * qpb, 4),
    }
}

/// Bar and 1-indexed beat-in-bar for a quarter-beat count.
///
/// This is the human-display convention used by the chart aligner and
/// merger: the downbeat of bar 2 is "bar 2 beat 1.0". Negative positions
/// clamp to the start of bar 1. The beat is rounded to 3 decimal places.
pub fn bar_beat_one_indexed(qbeats: f64, qbeats_per_bar: f64) -> BarPosition {
    let qbeats = qbeats.max(0.0);
    let bar_index = if qbeats_per_bar > 0.0 {
        (qbeats / qbeats_per_bar) as i64
    } else {
        0
    };
    BarPosition {
        bar: (bar_index + 1).max(1) as u32,
        beat_in_bar: round_places(qbeats - bar_index as f64 * qbeats_per_bar + 1.0, 3),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn seconds_beats_round_trip() {
        for &bpm in &[60.0, 90.5, 120.0, 174.0] {
            for &sec in &[0.0, 0.5, 1.2, 33.33, 240.0] {
                let back = beats_to_seconds(seconds_to_beats(sec, bpm), bpm);
                assert!(
                    (back - sec).abs() < 1e-9,
                    "round trip at {} bpm: {} -> {}",
                    bpm,
                    sec,
                    back
                );
            }
        }
    }

    #[test]
    fn seconds_to_beats_defaults_bad_tempo_to_120() {
        assert_eq!(seconds_to_beats(1.0, 0.0), 2.0);
        assert_eq!(seconds_to_beats(1.0, -10.0), 2.0);
    }

    #[test]
    fn beats_to_seconds_passes_through_on_bad_tempo() {
        // The documented asymmetric fallback: beats are assumed to already
        // be seconds when no usable tempo exists.
        assert_eq!(beats_to_seconds(3.5, 0.0), 3.5);
        assert_eq!(beats_to_seconds(3.5, -1.0), 3.5);
    }

    #[test]
    fn quantize_snaps_to_grid() {
        assert_eq!(quantize(0.98, 0.25), 1.0);
        assert_eq!(quantize(2.02, 0.25), 2.0);
        assert_eq!(quantize(0.6, 0.5), 0.5);
        assert_eq!(quantize(7.3, 0.0), 7.3);
        assert_eq!(quantize(7.3, -1.0), 7.3);
    }

    #[test]
    fn quantize_is_idempotent() {
        for &step in &[0.25, 0.5, 1.0, 0.125] {
            for i in 0..200 {
                let x = i as f64 * 0.077;
                let once = quantize(x, step);
                let twice = quantize(once, step);
                assert!(
                    (once - twice).abs() < 1e-12,
                    "quantize({}, {}) not idempotent: {} vs {}",
                    x,
                    step,
                    once,
                    twice
                );
            }
        }
    }

    #[test]
    fn grid_step_values() {
        assert_eq!(grid_step("1/4"), 1.0);
        assert_eq!(grid_step("1/8"), 0.5);
        assert_eq!(grid_step("1/16"), 0.25);
        assert_eq!(grid_step("nope"), 0.0);
        assert_eq!(grid_step("1/0"), 0.0);
    }

    #[test]
    fn zero_indexed_bar_positions() {
        let sig = TimeSig::new(4, 4);
        let p = bar_beat_zero_indexed(0.0, sig);
        assert_eq!((p.bar, p.beat_in_bar), (1, 0.0));
        let p = bar_beat_zero_indexed(4.0, sig);
        assert_eq!((p.bar, p.beat_in_bar), (2, 0.0));
        let p = bar_beat_zero_indexed(5.5, sig);
        assert_eq!((p.bar, p.beat_in_bar), (2, 1.5));

        // 6/8: 3 quarter-beats per bar
        let p = bar_beat_zero_indexed(4.0, TimeSig::new(6, 8));
        assert_eq!((p.bar, p.beat_in_bar), (2, 1.0));
    }

    #[test]
    fn one_indexed_bar_positions() {
        let p = bar_beat_one_indexed(0.0, 4.0);
        assert_eq!((p.bar, p.beat_in_bar), (1, 1.0));
        let p = bar_beat_one_indexed(4.0, 4.0);
        assert_eq!((p.bar, p.beat_in_bar), (2, 1.0));
        let p = bar_beat_one_indexed(6.5, 4.0);
        assert_eq!((p.bar, p.beat_in_bar), (2, 3.5));
        // negative positions clamp to the bar-1 downbeat
        let p = bar_beat_one_indexed(-2.0, 4.0);
        assert_eq!((p.bar, p.beat_in_bar), (1, 1.0));
    }

    #[test]
    fn bar_never_decreases_as_beats_increase() {
        let sig = TimeSig::new(3, 4);
        let mut last_bar = 0;
        for i in 0..500 {
            let beats = i as f64 * 0.13;
            let pos = bar_beat_zero_indexed(beats, sig);
            assert!(
                pos.bar >= last_bar,
                "bar decreased at beats={}: {} -> {}",
                beats,
                last_bar,
                pos.bar
            );
            last_bar = pos.bar;
        }
    }

    #[test]
    fn round_places_behaviour() {
        assert_eq!(round_places(1.23456789, 6), 1.234568);
        assert_eq!(round_places(2.5004, 3), 2.5);
        assert_eq!(round_places(-0.00004, 4), -0.0);
    }
}
