//! Time source for start/end stamps.
//!
//! Every timestamp in a report comes from one [`Clock`], so a single report
//! never mixes time zones. Timestamps are kept at millisecond precision so the
//! in-memory value and its serialized form are identical.
//!
//! [`FakeClock`] gives tests full control over time: it only moves when told
//! to, which makes ordering assertions on `start_time`/`end_time` exact.

use chrono::{DateTime, SubsecRound, TimeZone, Utc};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

/// Instant recorded in a report (UTC, millisecond precision)
pub type Timestamp = DateTime<Utc>;

/// Wire format of every timestamp: `2024-03-01T08:15:30.250Z`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Source of timestamps for open/close events.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current instant
    fn now(&self) -> Timestamp;
}

/// Wall clock, truncated to milliseconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now().trunc_subsecs(3)
    }
}

/// Manually driven clock for deterministic tests.
///
/// Time is stored as milliseconds since the Unix epoch and only changes
/// through [`FakeClock::set_ms`], [`FakeClock::advance_ms`] or, when
/// auto-advance is set, by a fixed step on every read.
#[derive(Debug)]
pub struct FakeClock {
    current_ms: AtomicI64,
    step_ms: AtomicI64,
}

impl FakeClock {
    /// Create a clock frozen at `time_ms` milliseconds since the epoch
    #[must_use]
    pub const fn fixed(time_ms: i64) -> Self {
        Self {
            current_ms: AtomicI64::new(time_ms),
            step_ms: AtomicI64::new(0),
        }
    }

    /// Create a clock that advances by `step_ms` after every reading
    #[must_use]
    pub const fn ticking(start_ms: i64, step_ms: i64) -> Self {
        Self {
            current_ms: AtomicI64::new(start_ms),
            step_ms: AtomicI64::new(step_ms),
        }
    }

    /// Current time in milliseconds, without ticking
    #[must_use]
    pub fn now_ms(&self) -> i64 {
        self.current_ms.load(Ordering::SeqCst)
    }

    /// Jump to an absolute time
    pub fn set_ms(&self, time_ms: i64) {
        self.current_ms.store(time_ms, Ordering::SeqCst);
    }

    /// Move time forward (or backward, with a negative value)
    pub fn advance_ms(&self, ms: i64) {
        self.current_ms.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::fixed(0)
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Timestamp {
        let step = self.step_ms.load(Ordering::SeqCst);
        let ms = self.current_ms.fetch_add(step, Ordering::SeqCst);
        Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
    }
}

/// Render a timestamp in the wire format
#[must_use]
pub fn format_timestamp(ts: &Timestamp) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a wire-format (or any RFC 3339) timestamp
///
/// # Errors
///
/// Returns the chrono parse error if the string is not RFC 3339
pub fn parse_timestamp(s: &str) -> Result<Timestamp, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}

/// `#[serde(with = "...")]` adapter for [`Timestamp`] fields.
pub(crate) mod timestamp {
    use super::{format_timestamp, parse_timestamp, Timestamp};
    use serde::{Deserialize, Deserializer, Serializer};

    pub(crate) fn serialize<S: Serializer>(ts: &Timestamp, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format_timestamp(ts))
    }

    pub(crate) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Timestamp, D::Error> {
        let raw = String::deserialize(d)?;
        parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }

    /// Same format for nullable fields (`end_time` of open nodes)
    pub(crate) mod option {
        use super::{format_timestamp, parse_timestamp, Timestamp};
        use serde::{Deserialize, Deserializer, Serializer};

        #[allow(clippy::ref_option)]
        pub(crate) fn serialize<S: Serializer>(
            ts: &Option<Timestamp>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match ts {
                Some(ts) => s.serialize_str(&format_timestamp(ts)),
                None => s.serialize_none(),
            }
        }

        pub(crate) fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<Timestamp>, D::Error> {
            Option::<String>::deserialize(d)?
                .map(|raw| parse_timestamp(&raw).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
