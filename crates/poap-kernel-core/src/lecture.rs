//! Lecture records: creation parameters, claim windows, resolved references.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};
use crate::types::LectureHash;

/// Immutable creation parameters of a lecture.
///
/// `start_time` is `None` for deployments whose contract only records a
/// single deadline. Timestamps are Unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LectureParams {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<u64>,
    pub end_time: u64,
    pub token_uri: String,
}

impl LectureParams {
    /// Parameters for a single-deadline lecture.
    pub fn with_deadline(name: impl Into<String>, end_time: u64, token_uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start_time: None,
            end_time,
            token_uri: token_uri.into(),
        }
    }

    /// Parameters for a lecture with an explicit `[start, end)` window.
    pub fn with_window(
        name: impl Into<String>,
        start_time: u64,
        end_time: u64,
        token_uri: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            start_time: Some(start_time),
            end_time,
            token_uri: token_uri.into(),
        }
    }

    /// The claim window. A missing start opens the window at the epoch.
    pub fn window(&self) -> LectureWindow {
        LectureWindow {
            start: self.start_time.unwrap_or(0),
            end: self.end_time,
        }
    }
}

/// Where a point in time falls relative to a claim window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPhase {
    NotYetOpen,
    Open,
    Closed,
}

/// Half-open claim window `[start, end)` in Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LectureWindow {
    pub start: u64,
    pub end: u64,
}

impl LectureWindow {
    pub fn phase(&self, now: u64) -> WindowPhase {
        if now < self.start {
            WindowPhase::NotYetOpen
        } else if now >= self.end {
            WindowPhase::Closed
        } else {
            WindowPhase::Open
        }
    }

    pub fn contains(&self, now: u64) -> bool {
        self.phase(now) == WindowPhase::Open
    }
}

/// A lecture resolved to both addressing forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LectureRef {
    /// 0-based position in the ledger's creation order.
    pub index: u64,
    /// Content-derived identifier.
    pub hash: LectureHash,
    /// Stored creation parameters.
    pub params: LectureParams,
    /// Administrative override from the earliest contract schema.
    /// `None` where the ledger derives activity from time alone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_flag: Option<bool>,
}

impl LectureRef {
    pub fn window(&self) -> LectureWindow {
        self.params.window()
    }

    /// `true` iff `now` is inside the claim window and no administrative
    /// override has deactivated the lecture.
    pub fn is_active(&self, now: u64) -> bool {
        self.active_flag != Some(false) && self.window().contains(now)
    }

    pub fn key(&self) -> LectureKey {
        LectureKey::Hash(self.hash)
    }
}

/// A caller-held reference to a lecture, in either addressing form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LectureKey {
    /// 0-based sequential index.
    Index(u64),
    Hash(LectureHash),
}

impl fmt::Display for LectureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LectureKey::Index(i) => write!(f, "{}", i),
            LectureKey::Hash(h) => write!(f, "{}", h),
        }
    }
}

impl From<LectureHash> for LectureKey {
    fn from(hash: LectureHash) -> Self {
        LectureKey::Hash(hash)
    }
}

/// Coerce a loosely typed numeric timestamp (e.g. parsed from JSON) into
/// Unix seconds. NaN, infinities, negatives and fractions are rejected.
pub fn timestamp_from_f64(value: f64) -> Result<u64> {
    if !value.is_finite() {
        return Err(CoreError::InvalidTimestamp(format!("{} is not finite", value)));
    }
    if value < 0.0 {
        return Err(CoreError::InvalidTimestamp(format!("{} is negative", value)));
    }
    if value.fract() != 0.0 {
        return Err(CoreError::InvalidTimestamp(format!("{} is not whole seconds", value)));
    }
    if value >= u64::MAX as f64 {
        return Err(CoreError::InvalidTimestamp(format!("{} is out of range", value)));
    }
    Ok(value as u64)
}

/// Coerce a signed timestamp into Unix seconds.
pub fn timestamp_from_i64(value: i64) -> Result<u64> {
    u64::try_from(value)
        .map_err(|_| CoreError::InvalidTimestamp(format!("{} is negative", value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_is_half_open() {
        let window = LectureWindow { start: 100, end: 200 };
        assert_eq!(window.phase(99), WindowPhase::NotYetOpen);
        assert_eq!(window.phase(100), WindowPhase::Open);
        assert_eq!(window.phase(199), WindowPhase::Open);
        assert_eq!(window.phase(200), WindowPhase::Closed);
        assert!(!window.contains(250));
    }

    #[test]
    fn test_deadline_only_window_starts_at_epoch() {
        let params = LectureParams::with_deadline("Talk", 500, "ipfs://x");
        assert_eq!(params.window(), LectureWindow { start: 0, end: 500 });
    }

    #[test]
    fn test_active_flag_overrides_window() {
        let mut lecture = LectureRef {
            index: 0,
            hash: LectureHash::ZERO,
            params: LectureParams::with_window("Talk", 100, 200, "ipfs://x"),
            active_flag: Some(true),
        };
        assert!(lecture.is_active(150));
        lecture.active_flag = Some(false);
        assert!(!lecture.is_active(150));
        lecture.active_flag = None;
        assert!(lecture.is_active(150));
        assert!(!lecture.is_active(200));
    }

    #[test]
    fn test_timestamp_from_f64() {
        assert_eq!(timestamp_from_f64(1735689600.0).unwrap(), 1735689600);
        assert!(timestamp_from_f64(f64::NAN).is_err());
        assert!(timestamp_from_f64(f64::INFINITY).is_err());
        assert!(timestamp_from_f64(-1.0).is_err());
        assert!(timestamp_from_f64(1.5).is_err());
    }

    #[test]
    fn test_timestamp_from_i64() {
        assert_eq!(timestamp_from_i64(0).unwrap(), 0);
        assert!(matches!(
            timestamp_from_i64(-5),
            Err(CoreError::InvalidTimestamp(_))
        ));
    }

    #[test]
    fn test_params_serde_omits_missing_start() {
        let params = LectureParams::with_deadline("Talk", 10, "ipfs://x");
        let json = serde_json::to_value(&params).unwrap();
        assert!(json.get("start_time").is_none());
        let back: LectureParams = serde_json::from_value(json).unwrap();
        assert_eq!(back, params);
    }
}
