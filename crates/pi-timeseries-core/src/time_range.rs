//! Requested time ranges and their wire representation.
//!
//! A bound is either an absolute instant or a relative PI time expression
//! (`*`, `*-1h`, `-1d`, `t`, `y`, ...). Relative expressions are opaque: they
//! are forwarded to the server untouched and, because the realized span is
//! only known server-side, a range with any relative bound is never split.
//!
//! Absolute inputs may carry an explicit offset (RFC 3339) or be naive, in
//! which case they are read as wall-clock time in the configured target
//! timezone. On the wire absolute bounds are always RFC 3339 UTC.

use std::fmt;

use chrono::{
    DateTime, LocalResult, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc,
};
use chrono_tz::Tz;
use snafu::prelude::*;

/// PI time keywords that resolve relative to "now" on the server.
const RELATIVE_KEYWORDS: &[&str] = &["*", "t", "y", "today", "yesterday", "now"];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Errors produced when parsing a user-supplied time bound.
#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum TimeParseError {
    /// The bound was empty or only whitespace.
    #[snafu(display("time bound is empty"))]
    EmptyBound,

    /// The bound is neither a relative marker nor a recognized absolute time.
    #[snafu(display("unrecognized time '{input}' (expected a PI relative time or ISO-8601)"))]
    Unrecognized {
        /// The original input.
        input: String,
    },

    /// The naive time does not exist in the target timezone (DST gap).
    #[snafu(display("local time '{input}' does not exist in timezone {timezone}"))]
    NonexistentLocalTime {
        /// The original input.
        input: String,
        /// The timezone used to interpret the naive time.
        timezone: String,
    },
}

/// One end of a requested time range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeBound {
    /// A fixed instant.
    Absolute(DateTime<Utc>),
    /// A PI relative time expression, passed through verbatim.
    Relative(String),
}

impl TimeBound {
    /// Parse a time bound, reading naive absolute times in `tz`.
    pub fn parse(input: &str, tz: Tz) -> Result<Self, TimeParseError> {
        let text = input.trim();
        ensure!(!text.is_empty(), EmptyBoundSnafu);

        if is_relative_marker(text) {
            return Ok(TimeBound::Relative(text.to_string()));
        }

        parse_absolute(text, tz).map(TimeBound::Absolute)
    }

    /// The instant, if this bound is absolute.
    pub fn as_absolute(&self) -> Option<DateTime<Utc>> {
        match self {
            TimeBound::Absolute(ts) => Some(*ts),
            TimeBound::Relative(_) => None,
        }
    }

    /// The string sent as `startTime` / `endTime`.
    pub fn to_wire(&self) -> String {
        match self {
            TimeBound::Absolute(ts) => format_wire_time(*ts),
            TimeBound::Relative(expr) => expr.clone(),
        }
    }
}

impl fmt::Display for TimeBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

/// A requested `[start, end]` range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeRange {
    /// Lower bound (inclusive).
    pub start: TimeBound,
    /// Upper bound (inclusive).
    pub end: TimeBound,
}

impl TimeRange {
    /// Parse both bounds, reading naive absolute times in `tz`.
    pub fn parse(start: &str, end: &str, tz: Tz) -> Result<Self, TimeParseError> {
        Ok(TimeRange {
            start: TimeBound::parse(start, tz)?,
            end: TimeBound::parse(end, tz)?,
        })
    }

    /// Both instants when neither bound is relative.
    pub fn absolute(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        Some((self.start.as_absolute()?, self.end.as_absolute()?))
    }
}

/// Whether `text` is a PI relative time expression.
///
/// Anything containing `*`, starting with a sign, or being (or starting with)
/// one of the day keywords followed by an offset counts as relative.
pub fn is_relative_marker(text: &str) -> bool {
    let lower = text.trim().to_ascii_lowercase();
    if lower.contains('*') || lower.starts_with('+') || lower.starts_with('-') {
        return true;
    }
    RELATIVE_KEYWORDS.iter().any(|kw| {
        lower == *kw
            || lower
                .strip_prefix(kw)
                .is_some_and(|rest| rest.starts_with('+') || rest.starts_with('-'))
    })
}

/// Render an instant the way absolute bounds are sent to the server.
pub fn format_wire_time(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_absolute(text: &str, tz: Tz) -> Result<DateTime<Utc>, TimeParseError> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Ok(ts.with_timezone(&Utc));
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .context(UnrecognizedSnafu { input: text })?;

    match tz.from_local_datetime(&naive) {
        LocalResult::Single(ts) => Ok(ts.with_timezone(&Utc)),
        // Fall-back transition: the earlier of the two instants.
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
        LocalResult::None => NonexistentLocalTimeSnafu {
            input: text,
            timezone: tz.name(),
        }
        .fail(),
    }
}
