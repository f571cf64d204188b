//! Ledger time.
//!
//! Balances are bucketed by calendar hour (minute in development mode), so
//! the accounting code needs calendar components and hour-resolution
//! formatting on top of a plain instant. `Timestamp` wraps Unix milliseconds
//! with `0` reserved as the canonical "absent" value, so user records
//! round-trip through external key-value and relational stores as plain
//! integers.

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// An optional UTC instant with millisecond resolution.
///
/// The zero value means "absent". All arithmetic saturates at the nil
/// boundary instead of wrapping into negative instants.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// The canonical "absent" value.
    pub const NIL: Timestamp = Timestamp(0);

    /// Build from Unix milliseconds. Non-positive inputs collapse to nil.
    pub fn from_millis(millis: i64) -> Self {
        Timestamp(millis.max(0))
    }

    /// Build from a chrono UTC instant.
    pub fn from_utc(instant: DateTime<Utc>) -> Self {
        Timestamp(instant.timestamp_millis().max(0))
    }

    /// Raw Unix milliseconds (0 when absent).
    pub fn millis(self) -> i64 {
        self.0
    }

    /// Whether this timestamp is the canonical "absent" value.
    pub fn is_nil(self) -> bool {
        self.0 == 0
    }

    /// The chrono instant, or `None` when absent.
    pub fn utc(self) -> Option<DateTime<Utc>> {
        if self.is_nil() {
            None
        } else {
            Utc.timestamp_millis_opt(self.0).single()
        }
    }

    /// Strictly earlier than `other`. Nil is never before anything.
    pub fn before(self, other: Timestamp) -> bool {
        !self.is_nil() && !other.is_nil() && self.0 < other.0
    }

    /// Strictly later than `other`. Nil is never after anything.
    pub fn after(self, other: Timestamp) -> bool {
        !self.is_nil() && !other.is_nil() && self.0 > other.0
    }

    /// This instant shifted forward by `duration`. Nil stays nil.
    pub fn add(self, duration: Duration) -> Timestamp {
        if self.is_nil() {
            return Timestamp::NIL;
        }
        Timestamp(self.0.saturating_add(duration.as_millis() as i64))
    }

    /// This instant shifted backward by `duration`. Nil stays nil.
    pub fn sub(self, duration: Duration) -> Timestamp {
        if self.is_nil() {
            return Timestamp::NIL;
        }
        Timestamp((self.0 - duration.as_millis() as i64).max(0))
    }

    /// Fractional hours elapsed since `earlier`.
    ///
    /// This is the only time-to-float conversion the ledger performs; its
    /// millisecond-resolution division keeps tick arithmetic reproducible.
    pub fn hours_since(self, earlier: Timestamp) -> f64 {
        (self.0 - earlier.0) as f64 / 3_600_000.0
    }

    /// Milliseconds elapsed since `earlier` (negative if `earlier` is later).
    pub fn millis_since(self, earlier: Timestamp) -> i64 {
        self.0 - earlier.0
    }

    /// Truncate down to a multiple of `bucket` since the Unix epoch.
    pub fn truncate(self, bucket: Duration) -> Timestamp {
        let bucket_ms = bucket.as_millis() as i64;
        if self.is_nil() || bucket_ms <= 0 {
            return self;
        }
        Timestamp((self.0 / bucket_ms) * bucket_ms)
    }

    /// Calendar year (UTC). 0 when absent.
    pub fn year(self) -> i32 {
        self.utc().map_or(0, |t| t.year())
    }

    /// Day of year, 1-based (UTC). 0 when absent.
    pub fn ordinal(self) -> u32 {
        self.utc().map_or(0, |t| t.ordinal())
    }

    /// Hour of day (UTC). 0 when absent.
    pub fn hour(self) -> u32 {
        self.utc().map_or(0, |t| t.hour())
    }

    /// Minute of hour (UTC). 0 when absent.
    pub fn minute(self) -> u32 {
        self.utc().map_or(0, |t| t.minute())
    }

    /// Hour-resolution bucket label, e.g. `2026-08-02T14`.
    pub fn format_hour(self) -> String {
        self.utc()
            .map_or_else(String::new, |t| t.format("%Y-%m-%dT%H").to_string())
    }

    /// Minute-resolution bucket label, e.g. `2026-08-02T14:07`.
    pub fn format_minute(self) -> String {
        self.utc()
            .map_or_else(String::new, |t| t.format("%Y-%m-%dT%H:%M").to_string())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.utc() {
            Some(t) => write!(f, "{}", t.to_rfc3339()),
            None => write!(f, "nil"),
        }
    }
}
