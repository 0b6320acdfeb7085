//! Field access over loosely-typed raw documents.
//!
//! Raw song documents arrive as `serde_json::Value` with no enforced
//! schema: numbers may be strings, fields may be null or absent, and a
//! zero is treated the same as a missing value when choosing between
//! aliases. These helpers keep that tolerance in one place.

use std::str::FromStr;

use beatgrid::TimeSig;
use serde_json::{Map, Value};

/// Best-effort numeric read: JSON numbers directly, numeric strings parsed.
pub(crate) fn num(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn num_field(obj: &Value, key: &str) -> Option<f64> {
    obj.get(key).and_then(num)
}

pub(crate) fn str_field(obj: &Value, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Loose truthiness for alias selection: null, false, zero, and empty
/// strings/containers all count as absent.
pub(crate) fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Tempo from document metadata: `tempo` preferred over `bpm`, zero and
/// malformed values falling through to the next alias.
pub(crate) fn tempo_of(meta: &Map<String, Value>) -> Option<f64> {
    ["tempo", "bpm"]
        .iter()
        .filter_map(|k| meta.get(*k))
        .filter(|v| truthy(v))
        .filter_map(num)
        .find(|t| *t != 0.0)
}

/// Time signature from document metadata, defaulting to 4/4 on anything
/// missing or malformed. Non-string values are stringified first, so a
/// numeric `4` fails the parse and falls back the same way `"4"` does.
pub(crate) fn time_sig_of(meta: &Map<String, Value>) -> TimeSig {
    meta.get("time_signature")
        .filter(|v| truthy(v))
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .and_then(|s| TimeSig::from_str(&s).ok())
        .unwrap_or_default()
}

/// The document's metadata object, or an empty map when absent or not an
/// object.
pub(crate) fn metadata_of(doc: &Value) -> Map<String, Value> {
    doc.get("metadata")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn num_reads_numbers_and_numeric_strings() {
        assert_eq!(num(&json!(1.5)), Some(1.5));
        assert_eq!(num(&json!("2.25")), Some(2.25));
        assert_eq!(num(&json!(" 3 ")), Some(3.0));
        assert_eq!(num(&json!("fast")), None);
        assert_eq!(num(&json!(null)), None);
        assert_eq!(num(&json!([1])), None);
    }

    #[test]
    fn tempo_prefers_tempo_then_bpm_skipping_zero() {
        let meta = json!({"tempo": 0, "bpm": 96});
        assert_eq!(tempo_of(meta.as_object().unwrap()), Some(96.0));
        let meta = json!({"tempo": "fast", "bpm": 88});
        assert_eq!(tempo_of(meta.as_object().unwrap()), Some(88.0));
        let meta = json!({"title": "x"});
        assert_eq!(tempo_of(meta.as_object().unwrap()), None);
    }

    #[test]
    fn time_sig_defaults_on_garbage() {
        let meta = json!({"time_signature": "6/8"});
        assert_eq!(time_sig_of(meta.as_object().unwrap()), TimeSig::new(6, 8));
        let meta = json!({"time_signature": 4});
        assert_eq!(time_sig_of(meta.as_object().unwrap()), TimeSig::default());
        let meta = json!({});
        assert_eq!(time_sig_of(meta.as_object().unwrap()), TimeSig::default());
    }
}
