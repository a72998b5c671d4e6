//! Normalization of server timestamps into the target timezone.
//!
//! The server is not consistent about how it encodes `Timestamp`: whole
//! seconds come back as `2023-08-29T22:00:00Z`, sub-second samples as
//! `2023-09-24T12:04:17.5870418Z` (up to 7 fractional digits), and other
//! deployments have been seen emitting offsets or locale-style dates.
//!
//! Parsing runs in passes over the whole batch. Each pass only sees what the
//! previous passes left unparsed:
//!
//! 1. strict whole-second UTC (`%Y-%m-%dT%H:%M:%SZ`),
//! 2. fractional-second UTC with 1-7 digits,
//! 3. a lenient fallback (RFC 3339 with any offset or fraction length,
//!    RFC 2822, naive ISO and US-style dates read as UTC).
//!
//! The fallback is much slower and is logged when used. Anything left after
//! the third pass is an error; no placeholder time is ever produced.

use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;
use log::info;
use snafu::prelude::*;

const STRICT_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";
const FRACTIONAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";
const MAX_FRACTION_DIGITS: usize = 7;

const LENIENT_NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.fZ",
    "%m/%d/%Y %H:%M:%S%.f",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M:%S%.f %p",
];

/// A server timestamp that no parsing pass accepted.
#[derive(Debug, Snafu, Clone, PartialEq, Eq)]
#[snafu(display("unparseable timestamp '{raw}' at item {index}"))]
pub struct UnparseableTimestamp {
    /// Position of the item in the response.
    pub index: usize,
    /// The raw timestamp string.
    pub raw: String,
}

/// Which parsing pass accepted a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampFormat {
    /// `YYYY-MM-DDTHH:MM:SSZ`
    WholeSecond,
    /// `YYYY-MM-DDTHH:MM:SS.fffffffZ`
    FractionalSecond,
    /// Anything accepted by the lenient fallback.
    Lenient,
}

/// Parse strict whole-second UTC.
pub fn parse_whole_second(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, STRICT_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Parse fractional-second UTC with 1 to 7 sub-second digits.
pub fn parse_fractional_second(raw: &str) -> Option<DateTime<Utc>> {
    let body = raw.strip_suffix('Z')?;
    let (_, fraction) = body.rsplit_once('.')?;
    if fraction.is_empty()
        || fraction.len() > MAX_FRACTION_DIGITS
        || !fraction.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    NaiveDateTime::parse_from_str(raw, FRACTIONAL_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Best-effort parse for encodings outside the two documented ones.
pub fn parse_lenient(raw: &str) -> Option<DateTime<Utc>> {
    let text = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_rfc2822(text) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Some(ts) = parse_long_fraction_utc(text) {
        return Some(ts);
    }
    LENIENT_NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// `...SS.<more than 9 digits>Z`: chrono stops at nanoseconds, so truncate.
fn parse_long_fraction_utc(text: &str) -> Option<DateTime<Utc>> {
    let body = text.strip_suffix('Z')?;
    let (head, fraction) = body.rsplit_once('.')?;
    if fraction.len() <= 9 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let truncated = format!("{head}.{}", &fraction[..9]);
    NaiveDateTime::parse_from_str(&truncated, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Normalize a batch of raw server timestamps into `tz`.
///
/// Output order matches input order. Fails on the first timestamp (by
/// position) that none of the passes accept.
pub fn normalize_timestamps<S: AsRef<str>>(
    raw: &[S],
    tz: Tz,
) -> Result<Vec<DateTime<Tz>>, UnparseableTimestamp> {
    let mut parsed: Vec<Option<DateTime<Utc>>> = vec![None; raw.len()];

    let passes: [(TimestampFormat, fn(&str) -> Option<DateTime<Utc>>); 3] = [
        (TimestampFormat::WholeSecond, parse_whole_second),
        (TimestampFormat::FractionalSecond, parse_fractional_second),
        (TimestampFormat::Lenient, parse_lenient),
    ];

    for (format, parse) in passes {
        let pending: Vec<usize> = parsed
            .iter()
            .enumerate()
            .filter(|(_, ts)| ts.is_none())
            .map(|(i, _)| i)
            .collect();
        if pending.is_empty() {
            break;
        }
        if format == TimestampFormat::Lenient {
            info!(
                "falling back to lenient timestamp parsing for {} of {} items (slow path)",
                pending.len(),
                raw.len()
            );
        }
        for i in pending {
            parsed[i] = parse(raw[i].as_ref());
        }
    }

    parsed
        .into_iter()
        .enumerate()
        .map(|(index, ts)| {
            ts.map(|ts| ts.with_timezone(&tz)).context(UnparseableTimestampSnafu {
                index,
                raw: raw[index].as_ref(),
            })
        })
        .collect()
}

/// Classify a single raw timestamp by the first pass that accepts it.
pub fn detect_format(raw: &str) -> Option<TimestampFormat> {
    if parse_whole_second(raw).is_some() {
        Some(TimestampFormat::WholeSecond)
    } else if parse_fractional_second(raw).is_some() {
        Some(TimestampFormat::FractionalSecond)
    } else if parse_lenient(raw).is_some() {
        Some(TimestampFormat::Lenient)
    } else {
        None
    }
}
