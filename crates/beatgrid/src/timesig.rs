use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A time signature.
///
/// Parsed from the conventional `"num/den"` notation. Callers that tolerate
/// malformed input map the parse error to [`TimeSig::default`] (4/4) and
/// record a warning rather than propagating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSig {
    pub num: u32,
    pub den: u32,
}

impl TimeSig {
    pub const fn new(num: u32, den: u32) -> Self {
        TimeSig { num, den }
    }

    /// Quarter-note-equivalent beats in one bar: `num * 4/den`.
    ///
    /// 4/4 -> 4.0, 3/4 -> 3.0, 6/8 -> 3.0, 7/8 -> 3.5.
    pub fn quarter_beats_per_bar(&self) -> f64 {
        self.num as f64 * (4.0 / self.den as f64)
    }

    /// Tempo rescaled to quarter-beats per minute.
    ///
    /// Odd denominators are normalized into quarter-note units so that
    /// downstream bar math never cares about the denominator. Missing, zero,
    /// or negative tempos fall back to 120.
    pub fn qbpm(&self, tempo: f64) -> f64 {
        let tempo = if tempo > 0.0 { tempo } else { 120.0 };
        tempo * (4.0 / self.den as f64)
    }
}

impl Default for TimeSig {
    fn default() -> Self {
        TimeSig { num: 4, den: 4 }
    }
}

impl fmt::Display for TimeSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeSigParseError {
    #[error("time signature {0:?} is missing the '/' separator")]
    MissingSeparator(String),
    #[error("time signature {0:?} has a non-numeric component")]
    NotANumber(String),
    #[error("time signature {0:?} has a zero component")]
    NonPositive(String),
}

impl FromStr for TimeSig {
    type Err = TimeSigParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (num_s, den_s) = s
            .split_once('/')
            .ok_or_else(|| TimeSigParseError::MissingSeparator(s.to_string()))?;
        let num: u32 = num_s
            .trim()
            .parse()
            .map_err(|_| TimeSigParseError::NotANumber(s.to_string()))?;
        let den: u32 = den_s
            .trim()
            .parse()
            .map_err(|_| TimeSigParseError::NotANumber(s.to_string()))?;
        if num == 0 || den == 0 {
            return Err(TimeSigParseError::NonPositive(s.to_string()));
        }
        Ok(TimeSig { num, den })
    }
}
