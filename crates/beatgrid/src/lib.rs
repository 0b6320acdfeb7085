//! Tempo-relative beat and bar arithmetic.
//!
//! Everything in this crate is a pure function over plain values: converting
//! between seconds, beats, and bar/beat positions at a given tempo and time
//! signature, and snapping beat positions to a musical grid. Tempo is always
//! expressed in beats per minute; a "quarter-beat" is one quarter-note
//! equivalent pulse after normalizing the time-signature denominator, so a
//! bar of 6/8 holds 3.0 quarter-beats.

pub mod convert;
pub mod timesig;

pub use convert::{
    bar_beat_one_indexed, bar_beat_zero_indexed, beats_to_seconds, grid_step, quantize,
    round_places, sec_to_qbeats, seconds_to_beats, BarPosition,
};
pub use timesig::{TimeSig, TimeSigParseError};
