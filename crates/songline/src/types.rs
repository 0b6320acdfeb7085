use std::fmt;

use beatgrid::TimeSig;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Stable warning codes shared between the engine and its callers.
pub mod codes {
    pub const BPM_INVALID: &str = "bpm.invalid";
    pub const BPM_MISSING: &str = "bpm.missing";
    pub const TIMESIG_INVALID: &str = "timesig.invalid";
    pub const TIMESIG_MISSING: &str = "timesig.missing";
    pub const CHORDS_EMPTY: &str = "chords.empty";
    pub const LYRICS_EMPTY: &str = "lyrics.empty";
    pub const SECTIONS_INFERRED: &str = "sections.inferred";
}

/// A coded, human-readable note about a document.
///
/// The engine never raises on bad input; it records warnings and keeps
/// going. Severity is a label, not control flow: callers decide what to do
/// with a fatal code (typically reject the document) versus an advisory one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub code: String,
    pub message: String,
}

impl Warning {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Warning {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Whether this warning marks the document structurally unusable.
    ///
    /// `lyrics.empty` is deliberately not fatal: chord-only songs are valid.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.code.as_str(),
            codes::CHORDS_EMPTY | codes::BPM_MISSING | codes::TIMESIG_MISSING
        )
    }
}

/// A tempo active from `at_sec` onward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TempoMark {
    pub at_sec: f64,
    pub bpm: f64,
}

/// A time signature active from `at_sec` onward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSigMark {
    pub at_sec: f64,
    pub num: u32,
    pub den: u32,
}

/// Normalized classification of a song section.
///
/// Derived from free-text names by case-insensitive substring probes, first
/// match wins, in the order chorus, bridge, intro, outro, pre, solo, instr.
/// Names matching nothing pass through as [`SectionKind::Other`]; empty or
/// missing names default to Verse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionKind {
    Verse,
    Chorus,
    Bridge,
    Intro,
    Outro,
    PreChorus,
    Solo,
    Instrumental,
    Other(String),
}

impl SectionKind {
    pub fn from_name(name: Option<&str>) -> Self {
        let name = match name {
            Some(n) if !n.trim().is_empty() => n,
            _ => return SectionKind::Verse,
        };
        let n = name.to_lowercase();
        if n.contains("chorus") {
            SectionKind::Chorus
        } else if n.contains("bridge") {
            SectionKind::Bridge
        } else if n.contains("intro") {
            SectionKind::Intro
        } else if n.contains("outro") {
            SectionKind::Outro
        } else if n.contains("pre") {
            SectionKind::PreChorus
        } else if n.contains("solo") {
            SectionKind::Solo
        } else if n.contains("instr") {
            SectionKind::Instrumental
        } else {
            SectionKind::Other(name.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SectionKind::Verse => "Verse",
            SectionKind::Chorus => "Chorus",
            SectionKind::Bridge => "Bridge",
            SectionKind::Intro => "Intro",
            SectionKind::Outro => "Outro",
            SectionKind::PreChorus => "PreChorus",
            SectionKind::Solo => "Solo",
            SectionKind::Instrumental => "Instrumental",
            SectionKind::Other(name) => name,
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for SectionKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SectionKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(match s.as_str() {
            "Verse" => SectionKind::Verse,
            "Chorus" => SectionKind::Chorus,
            "Bridge" => SectionKind::Bridge,
            "Intro" => SectionKind::Intro,
            "Outro" => SectionKind::Outro,
            "PreChorus" => SectionKind::PreChorus,
            "Solo" => SectionKind::Solo,
            "Instrumental" => SectionKind::Instrumental,
            _ => SectionKind::Other(s),
        })
    }
}

/// A song section spanning `[start_sec, end_sec)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub kind: SectionKind,
    pub start_sec: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_sec: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// True when the section was synthesized heuristically rather than
    /// present in the source document.
    #[serde(default)]
    pub inferred: bool,
}

/// A chord placed on the timeline.
///
/// `at_beat` is always the quantized position. `lyric_id` is a
/// back-reference to the nearest lyric line (within one beat), set by the
/// pairing pass; it never implies ownership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChordEvent {
    pub symbol: String,
    pub at_sec: f64,
    pub at_beat: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_beats: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lyric_id: Option<String>,
}

/// A lyric line placed on the timeline.
///
/// When the source supplies no id, one is derived as `"b" + at_beat`, so
/// two lines landing on the same beat share an id. That collision is a
/// documented quirk of the id scheme, not something to silently repair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricEvent {
    pub id: String,
    pub at_sec: f64,
    pub at_beat: f64,
    pub text: String,
}

/// A raw lyric line before timeline placement: text plus an optional
/// seconds timestamp. This is the merge-input shape and the output of the
/// lyric payload parsers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LyricLine {
    pub ts_sec: Option<f64>,
    pub text: String,
}

impl LyricLine {
    pub fn untimed(text: impl Into<String>) -> Self {
        LyricLine {
            ts_sec: None,
            text: text.into(),
        }
    }

    pub fn timed(ts_sec: f64, text: impl Into<String>) -> Self {
        LyricLine {
            ts_sec: Some(ts_sec),
            text: text.into(),
        }
    }
}

/// The canonical beat-indexed song timeline.
///
/// A short-lived, in-memory value constructed fresh per request: it owns
/// its sections, chords, and lyrics outright and is never mutated after
/// construction. It has no persisted identity of its own; callers may set
/// `id` to a stored song's key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    pub bpm_default: f64,
    pub time_sig_default: TimeSig,
    pub tempo_map: Vec<TempoMark>,
    pub time_sig_map: Vec<TimeSigMark>,
    pub sections: Vec<Section>,
    /// Sorted by `at_beat`.
    pub chords: Vec<ChordEvent>,
    pub lyrics: Vec<LyricEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn section_kind_substring_probes() {
        assert_eq!(SectionKind::from_name(Some("Chorus 2")), SectionKind::Chorus);
        assert_eq!(SectionKind::from_name(Some("big bridge")), SectionKind::Bridge);
        assert_eq!(SectionKind::from_name(Some("INTRO")), SectionKind::Intro);
        assert_eq!(SectionKind::from_name(Some("outro tag")), SectionKind::Outro);
        assert_eq!(SectionKind::from_name(Some("pre-drop")), SectionKind::PreChorus);
        assert_eq!(SectionKind::from_name(Some("Guitar Solo")), SectionKind::Solo);
        assert_eq!(
            SectionKind::from_name(Some("instr. break")),
            SectionKind::Instrumental
        );
    }

    #[test]
    fn section_kind_first_match_wins() {
        // "chorus" is probed before "pre", so a pre-chorus label containing
        // both classifies as Chorus.
        assert_eq!(
            SectionKind::from_name(Some("Pre-Chorus")),
            SectionKind::Chorus
        );
        // "bridge" is probed before "pre"
        assert_eq!(
            SectionKind::from_name(Some("pre bridge")),
            SectionKind::Bridge
        );
    }

    #[test]
    fn section_kind_fallbacks() {
        assert_eq!(SectionKind::from_name(None), SectionKind::Verse);
        assert_eq!(SectionKind::from_name(Some("")), SectionKind::Verse);
        assert_eq!(SectionKind::from_name(Some("  ")), SectionKind::Verse);
        assert_eq!(
            SectionKind::from_name(Some("Breakdown")),
            SectionKind::Other("Breakdown".into())
        );
    }

    #[test]
    fn section_kind_serializes_as_plain_string() {
        assert_eq!(
            serde_json::to_string(&SectionKind::PreChorus).unwrap(),
            "\"PreChorus\""
        );
        assert_eq!(
            serde_json::to_string(&SectionKind::Other("Breakdown".into())).unwrap(),
            "\"Breakdown\""
        );
        let back: SectionKind = serde_json::from_str("\"Chorus\"").unwrap();
        assert_eq!(back, SectionKind::Chorus);
    }

    #[test]
    fn fatal_warning_classification() {
        assert!(Warning::new(codes::CHORDS_EMPTY, "").is_fatal());
        assert!(Warning::new(codes::BPM_MISSING, "").is_fatal());
        assert!(Warning::new(codes::TIMESIG_MISSING, "").is_fatal());
        assert!(!Warning::new(codes::LYRICS_EMPTY, "").is_fatal());
        assert!(!Warning::new(codes::SECTIONS_INFERRED, "").is_fatal());
    }

    #[test]
    fn chord_event_wire_names_are_camel_case() {
        let ev = ChordEvent {
            symbol: "Am".into(),
            at_sec: 1.0,
            at_beat: 2.0,
            duration_beats: Some(4.0),
            lyric_id: Some("b2".into()),
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["atSec"], 1.0);
        assert_eq!(json["atBeat"], 2.0);
        assert_eq!(json["durationBeats"], 4.0);
        assert_eq!(json["lyricId"], "b2");
    }
}
