use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

const SECOND_MS: i64 = 1_000;
const MINUTE_MS: i64 = 60_000;
const HOUR_MS: i64 = 3_600_000;
const DAY_MS: i64 = 86_400_000;

/// Positive bar duration in milliseconds.
///
/// Serialized as its short form (`"1m"`, `"15m"`, `"4h"`).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Interval {
    ms: i64,
}

impl Interval {
    pub fn from_ms(ms: i64) -> Result<Self> {
        if ms <= 0 {
            return Err(EngineError::invalid_config(format!(
                "interval must be > 0ms, got {ms}"
            )));
        }
        Ok(Self { ms })
    }

    #[inline]
    pub fn as_ms(&self) -> i64 {
        self.ms
    }

    /// Parses `<n><unit>` where unit is one of `ms`, `s`, `m`, `h`, `d`.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let digits_end = s
            .char_indices()
            .find(|(_, ch)| !ch.is_ascii_digit())
            .map(|(i, _)| i)
            .unwrap_or(s.len());
        if digits_end == 0 {
            return Err(EngineError::invalid_config(format!(
                "interval '{s}' is missing a number"
            )));
        }
        let n: i64 = s[..digits_end]
            .parse()
            .map_err(|_| EngineError::invalid_config(format!("interval '{s}' is not a number")))?;
        let unit_ms = match s[digits_end..].trim().to_ascii_lowercase().as_str() {
            "ms" => 1,
            "s" => SECOND_MS,
            "m" => MINUTE_MS,
            "h" => HOUR_MS,
            "d" => DAY_MS,
            other => {
                return Err(EngineError::invalid_config(format!(
                    "unsupported interval unit '{other}' (use ms/s/m/h/d)"
                )));
            }
        };
        let ms = n
            .checked_mul(unit_ms)
            .ok_or_else(|| EngineError::invalid_config(format!("interval '{s}' overflows")))?;
        Self::from_ms(ms)
    }

    /// Floors a timestamp (ms since epoch) to the start of its bucket.
    ///
    /// `None` when that start (or the end of the bucket) does not fit in an `i64`.
    #[inline]
    pub fn bucket_start(&self, ts_ms: i64) -> Option<i64> {
        let start = ts_ms.div_euclid(self.ms).checked_mul(self.ms)?;
        start.checked_add(self.ms)?;
        Some(start)
    }

    /// The interval `k` times as long as this one.
    pub fn multiple(&self, k: u32) -> Result<Self> {
        let ms = self
            .ms
            .checked_mul(i64::from(k))
            .ok_or_else(|| EngineError::invalid_config(format!("{self} x {k} overflows")))?;
        Self::from_ms(ms)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let units = [(DAY_MS, "d"), (HOUR_MS, "h"), (MINUTE_MS, "m"), (SECOND_MS, "s")];
        for (unit_ms, suffix) in units {
            if self.ms % unit_ms == 0 {
                return write!(f, "{}{}", self.ms / unit_ms, suffix);
            }
        }
        write!(f, "{}ms", self.ms)
    }
}

impl fmt::Debug for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Interval({self})")
    }
}

impl TryFrom<String> for Interval {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Interval> for String {
    fn from(value: Interval) -> Self {
        value.to_string()
    }
}
