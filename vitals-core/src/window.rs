//! Elapsed-time offsets as they travel on the wire.
//!
//! Agents and the manager exchange time values as `dd.hh:mm:ss` strings
//! (days padded to at least two digits). Internally an offset is a whole
//! number of seconds, never negative.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::VitalsError;

const SECS_PER_MINUTE: i64 = 60;
const SECS_PER_HOUR: i64 = 60 * SECS_PER_MINUTE;
const SECS_PER_DAY: i64 = 24 * SECS_PER_HOUR;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct WireDuration(i64);

impl WireDuration {
    pub const ZERO: WireDuration = WireDuration(0);

    /// Returns `None` for negative offsets.
    pub fn from_secs(secs: i64) -> Option<Self> {
        (secs >= 0).then_some(Self(secs))
    }

    pub fn as_secs(&self) -> i64 {
        self.0
    }

    pub fn saturating_sub_secs(&self, secs: i64) -> Self {
        Self(self.0.saturating_sub(secs).max(0))
    }
}

impl fmt::Display for WireDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let days = self.0 / SECS_PER_DAY;
        let hours = (self.0 % SECS_PER_DAY) / SECS_PER_HOUR;
        let minutes = (self.0 % SECS_PER_HOUR) / SECS_PER_MINUTE;
        let seconds = self.0 % SECS_PER_MINUTE;
        write!(f, "{:02}.{:02}:{:02}:{:02}", days, hours, minutes, seconds)
    }
}

impl FromStr for WireDuration {
    type Err = VitalsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            VitalsError::validation(format!(
                "invalid duration '{}': expected dd.hh:mm:ss",
                s
            ))
        };

        let (days, clock) = match s.split_once('.') {
            Some((days, clock)) => (parse_digits(days, usize::MAX).ok_or_else(invalid)?, clock),
            None => (0, s),
        };

        let mut parts = clock.split(':');
        let (hours, minutes, seconds) = match (parts.next(), parts.next(), parts.next(), parts.next())
        {
            (Some(h), Some(m), Some(sec), None) => (
                parse_digits(h, 2).ok_or_else(invalid)?,
                parse_digits(m, 2).ok_or_else(invalid)?,
                parse_digits(sec, 2).ok_or_else(invalid)?,
            ),
            _ => return Err(invalid()),
        };

        if hours >= 24 || minutes >= 60 || seconds >= 60 {
            return Err(invalid());
        }

        days.checked_mul(SECS_PER_DAY)
            .and_then(|secs| secs.checked_add(hours * SECS_PER_HOUR))
            .and_then(|secs| secs.checked_add(minutes * SECS_PER_MINUTE + seconds))
            .map(WireDuration)
            .ok_or_else(invalid)
    }
}

fn parse_digits(part: &str, max_len: usize) -> Option<i64> {
    if part.is_empty() || part.len() > max_len || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

impl Serialize for WireDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WireDuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// Closed `[from, to]` range of elapsed-seconds offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub from: WireDuration,
    pub to: WireDuration,
}

impl TimeWindow {
    pub fn new(from: WireDuration, to: WireDuration) -> Self {
        Self { from, to }
    }

    /// The window ending at `to` and spanning `span_secs` seconds.
    pub fn ending_at(to: WireDuration, span_secs: i64) -> Self {
        Self {
            from: to.saturating_sub_secs(span_secs),
            to,
        }
    }

    pub fn is_inverted(&self) -> bool {
        self.from > self.to
    }

    pub fn contains(&self, time: i64) -> bool {
        self.from.as_secs() <= time && time <= self.to.as_secs()
    }
}
