// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Canonical timestamps.
//!
//! Every timestamp in a ledger is UTC with microsecond precision and renders as
//! `YYYY-MM-DDTHH:MM:SS.ffffffZ`. The text form is what gets hashed, so it must
//! survive a serialize/parse round trip unchanged; anything finer than a
//! microsecond is truncated on construction.

use core::fmt;
use core::str::FromStr;

use chrono::{DateTime, SecondsFormat, SubsecRound, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

/// Creation time of every genesis block. Wall-clock time would make genesis
/// hashes differ between nodes.
pub const GENESIS_CREATED: Timestamp = Timestamp(DateTime::UNIX_EPOCH);

#[derive(Debug, thiserror::Error)]
#[error("invalid timestamp '{0}'")]
pub struct TimestampError(String);

impl Timestamp {
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.trunc_subsecs(6))
    }

    pub fn from_unix(secs: i64) -> Option<Self> {
        Utc.timestamp_opt(secs, 0).single().map(Self)
    }

    pub fn datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Canonical text form used for hashing and persistence.
    pub fn canonical(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Micros, true)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl FromStr for Timestamp {
    type Err = TimestampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| Self::from_datetime(dt.with_timezone(&Utc)))
            .map_err(|_| TimestampError(s.to_string()))
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_datetime(dt)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.canonical())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_format() {
        let ts: Timestamp = "2000-12-01T08:09:10Z".parse().unwrap();
        assert_eq!(ts.canonical(), "2000-12-01T08:09:10.000000Z");
        assert_eq!(GENESIS_CREATED.canonical(), "1970-01-01T00:00:00.000000Z");
    }

    #[test]
    fn test_offsets_normalize_to_utc() {
        let ts: Timestamp = "2000-12-01T10:09:10+02:00".parse().unwrap();
        assert_eq!(ts.canonical(), "2000-12-01T08:09:10.000000Z");
    }

    #[test]
    fn test_now_survives_text_roundtrip() {
        let now = Timestamp::now();
        let parsed: Timestamp = now.canonical().parse().unwrap();
        assert_eq!(now, parsed);
    }

    #[test]
    fn test_text_order_matches_time_order() {
        let a: Timestamp = "2021-01-01T00:00:00Z".parse().unwrap();
        let b: Timestamp = "2021-01-01T00:00:00.5Z".parse().unwrap();
        assert!(a < b);
        assert!(a.canonical() < b.canonical());
    }
}
