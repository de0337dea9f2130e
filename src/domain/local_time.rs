//! Wall-clock timestamps and the codec between them and zoned calendar dates.
//!
//! A [`LocalTimestamp`] carries the digits an operator saw on the calendar grid and nothing
//! else. It is never converted through UTC, so two hosts in different zones render the same
//! hour and minute for the same stored value.

use crate::infrastructure::error::InfraError;
use chrono::{DateTime, NaiveDateTime, TimeZone, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const LOCAL_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const SPACED_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocalTimestamp(NaiveDateTime);

impl LocalTimestamp {
    /// Sub-second precision is dropped; the wire format has none.
    pub fn from_naive(value: NaiveDateTime) -> Self {
        Self(value.with_nanosecond(0).unwrap_or(value))
    }

    pub fn naive(&self) -> NaiveDateTime {
        self.0
    }

    /// Accepts `YYYY-MM-DDTHH:mm:ss` (optionally with fractional seconds or a space
    /// separator). A trailing UTC offset is tolerated and discarded: the digits before it are
    /// taken as the wall clock.
    pub fn parse(value: &str) -> Result<Self, InfraError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(InfraError::InvalidTimestamp(
                "timestamp must not be empty".to_string(),
            ));
        }
        if let Ok(parsed) = trimmed.parse::<NaiveDateTime>() {
            return Ok(Self::from_naive(parsed));
        }
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, SPACED_TIMESTAMP_FORMAT) {
            return Ok(Self::from_naive(parsed));
        }
        if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(Self::from_naive(parsed.naive_local()));
        }
        Err(InfraError::InvalidTimestamp(format!(
            "'{trimmed}' is not a YYYY-MM-DDTHH:mm:ss wall-clock value"
        )))
    }

    /// The wall clock read as if it were UTC lies after 1970-01-01T00:00:00.
    pub fn is_after_epoch(&self) -> bool {
        self.0.and_utc().timestamp() > 0
    }
}

impl fmt::Display for LocalTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(LOCAL_TIMESTAMP_FORMAT))
    }
}

impl FromStr for LocalTimestamp {
    type Err = InfraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl Serialize for LocalTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LocalTimestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Reads the local fields of `date`, never its UTC instant.
pub fn encode<Tz: TimeZone>(date: &DateTime<Tz>) -> LocalTimestamp {
    LocalTimestamp::from_naive(date.naive_local())
}

/// Builds a date in `zone` whose local fields equal `timestamp`.
///
/// Wall-clock values repeated by a DST fall-back resolve to the earlier instant; values
/// skipped by a spring-forward gap do not exist in `zone` and are rejected.
pub fn decode<Tz: TimeZone>(timestamp: &LocalTimestamp, zone: &Tz) -> Result<DateTime<Tz>, InfraError> {
    zone.from_local_datetime(&timestamp.naive())
        .earliest()
        .ok_or_else(|| InfraError::NonexistentLocalTime(timestamp.to_string()))
}
