//! Durations, timespans and timestamps with a portable wire form.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Unit tag of a [Duration].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeUnit {
    #[default]
    Invalid,
    Minutes,
    Seconds,
    Milliseconds,
    Microseconds,
    Nanoseconds,
}

impl TimeUnit {
    /// Nanoseconds per unit, `None` for [TimeUnit::Invalid].
    pub fn nanos(self) -> Option<i64> {
        match self {
            Self::Invalid => None,
            Self::Minutes => Some(60_000_000_000),
            Self::Seconds => Some(1_000_000_000),
            Self::Milliseconds => Some(1_000_000),
            Self::Microseconds => Some(1_000),
            Self::Nanoseconds => Some(1),
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Self::Invalid => "?",
            Self::Minutes => "min",
            Self::Seconds => "s",
            Self::Milliseconds => "ms",
            Self::Microseconds => "us",
            Self::Nanoseconds => "ns",
        }
    }
}

/// A signed count of some [TimeUnit].
///
/// Encoded as the unit tag followed by the count, so no precision is lost
/// by converting to a common unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Duration {
    pub unit: TimeUnit,
    pub count: i64,
}

impl Duration {
    pub fn new(unit: TimeUnit, count: i64) -> Self {
        Self { unit, count }
    }

    /// Returns `true` unless the unit is [TimeUnit::Invalid].
    pub fn valid(&self) -> bool {
        self.unit != TimeUnit::Invalid
    }

    /// Total nanoseconds, `None` on an invalid unit or overflow.
    pub fn as_nanos(&self) -> Option<i64> {
        self.unit.nanos()?.checked_mul(self.count)
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.count, self.unit.suffix())
    }
}

/// Nanosecond-resolution span of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timespan(pub i64);

impl Timespan {
    pub fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    pub fn from_micros(micros: i64) -> Self {
        Self(micros.saturating_mul(1_000))
    }

    pub fn from_millis(millis: i64) -> Self {
        Self(millis.saturating_mul(1_000_000))
    }

    pub fn as_nanos(self) -> i64 {
        self.0
    }
}

/// Saturates at `i64::MAX` nanoseconds.
impl From<std::time::Duration> for Timespan {
    fn from(d: std::time::Duration) -> Self {
        Self(i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
    }
}

impl From<Timespan> for Duration {
    fn from(t: Timespan) -> Self {
        Self::new(TimeUnit::Nanoseconds, t.0)
    }
}

impl fmt::Display for Timespan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ns", self.0)
    }
}

/// Absolute point in time as nanoseconds since the UNIX epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    pub fn now() -> Self {
        SystemTime::now().into()
    }

    pub fn as_nanos(self) -> i64 {
        self.0
    }

    pub fn to_system_time(self) -> SystemTime {
        let offset = std::time::Duration::from_nanos(self.0.unsigned_abs());
        match self.0 >= 0 {
            true => UNIX_EPOCH + offset,
            false => UNIX_EPOCH - offset,
        }
    }
}

/// Saturates outside of the `i64` nanosecond range.
impl From<SystemTime> for Timestamp {
    fn from(t: SystemTime) -> Self {
        let nanos = match t.duration_since(UNIX_EPOCH) {
            Ok(after) => i64::try_from(after.as_nanos()).unwrap_or(i64::MAX),
            Err(before) => i64::try_from(before.duration().as_nanos())
                .map(|n| -n)
                .unwrap_or(i64::MIN),
        };
        Self(nanos)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
