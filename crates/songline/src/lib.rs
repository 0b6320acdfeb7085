//! Song-document alignment and normalization.
//!
//! This crate takes heterogeneous, partially-specified song data (JSON
//! chord/lyric documents timestamped in seconds or beats, plain-text chord
//! charts, LRC/VTT lyric payloads) and produces internally consistent
//! beat-indexed structures. Four pipelines share the `beatgrid` unit math:
//!
//! - [`chart`]: heuristic parsing of plain-text chord charts into chord,
//!   lyric, and section rows.
//! - [`jcrd`]: conversion of seconds-timestamped chord documents into
//!   quarter-beat and bar units.
//! - [`merge`]: interleaving a chord progression with lyric lines into a
//!   bar-aligned, human-readable chart.
//! - [`mapper`]: the canonical normalizer producing a [`types::Timeline`]
//!   plus advisory and validation warnings.
//!
//! Every entry point degrades gracefully: malformed fields are skipped,
//! missing tempo and meter fall back to 120 bpm and 4/4, and problems are
//! reported as [`types::Warning`] values instead of errors. Nothing here
//! performs I/O or keeps state between calls.

pub mod chart;
pub mod jcrd;
pub mod lyrics;
pub mod mapper;
pub mod merge;
pub mod normalize;
mod raw;
pub mod types;

pub use chart::{parse_chart, ChartDoc};
pub use mapper::{to_timeline, MapOptions, MapResult, MergeStrategy};
pub use merge::{chords_only, merge_with_lyrics, BarStart, MergeOptions, MergeOutput};
pub use types::{
    ChordEvent, LyricEvent, LyricLine, Section, SectionKind, TempoMark, TimeSigMark, Timeline,
    Warning,
};
