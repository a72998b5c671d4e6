//! Sampling intervals for interpolated requests.
//!
//! An interval is written as `<magnitude><unit>` (for example `1h`, `30s`,
//! `250ms`, `1.5h`) and is sent to the server verbatim in canonical form.
//! For range splitting it must also convert *losslessly* to a fixed
//! duration, so the magnitude is parsed as an exact decimal and the result
//! is kept as a whole number of nanoseconds:
//!
//! | unit | duration |
//! |------|----------|
//! | `ms` | 1 millisecond |
//! | `s`  | 1 second |
//! | `m`  | 60 seconds |
//! | `h`  | 3600 seconds |
//! | `d`  | 86400 seconds |
//! | `y`  | 365 days |
//!
//! There are no calendar-aware units; a year is always 365 days.

use std::{fmt, str::FromStr};

use chrono::Duration;
use snafu::prelude::*;

const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SECOND: u128 = 1_000_000_000;

/// Errors produced when parsing an interval spec such as `1h`.
#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum ParseIntervalError {
    /// The spec string was empty or only whitespace.
    #[snafu(display("interval spec is empty"))]
    Empty,

    /// The spec did not start with a numeric magnitude.
    #[snafu(display("interval spec '{spec}' is missing a numeric magnitude"))]
    MissingNumber {
        /// The original spec string.
        spec: String,
    },

    /// The spec did not include a unit suffix.
    #[snafu(display("interval spec '{spec}' is missing a unit suffix (expected ms|s|m|h|d|y)"))]
    MissingUnit {
        /// The original spec string.
        spec: String,
    },

    /// The magnitude is not a plain decimal number.
    #[snafu(display("invalid interval magnitude '{magnitude}' in '{spec}'"))]
    InvalidNumber {
        /// The original spec string.
        spec: String,
        /// The magnitude text that failed to parse.
        magnitude: String,
    },

    /// The magnitude parsed to zero.
    #[snafu(display("interval magnitude must be > 0 in '{spec}'"))]
    NonPositive {
        /// The original spec string.
        spec: String,
    },

    /// The duration is not a whole number of nanoseconds or overflows `i64`.
    #[snafu(display("interval '{spec}' cannot be represented as a whole number of nanoseconds"))]
    NotRepresentable {
        /// The original spec string.
        spec: String,
    },

    /// The unit suffix is not one of the six recognized codes.
    #[snafu(display("unknown interval unit '{unit}' in '{spec}' (expected ms|s|m|h|d|y)"))]
    UnknownUnit {
        /// The original spec string.
        spec: String,
        /// The unrecognized unit suffix.
        unit: String,
    },
}

/// Unit codes understood by the PI Web API interval syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntervalUnit {
    /// `ms`
    Milliseconds,
    /// `s`
    Seconds,
    /// `m`
    Minutes,
    /// `h`
    Hours,
    /// `d`
    Days,
    /// `y` (fixed 365 days)
    Years,
}

impl IntervalUnit {
    /// The short code used on the wire.
    pub fn code(self) -> &'static str {
        match self {
            IntervalUnit::Milliseconds => "ms",
            IntervalUnit::Seconds => "s",
            IntervalUnit::Minutes => "m",
            IntervalUnit::Hours => "h",
            IntervalUnit::Days => "d",
            IntervalUnit::Years => "y",
        }
    }

    fn nanos(self) -> u128 {
        match self {
            IntervalUnit::Milliseconds => NANOS_PER_MILLI,
            IntervalUnit::Seconds => NANOS_PER_SECOND,
            IntervalUnit::Minutes => 60 * NANOS_PER_SECOND,
            IntervalUnit::Hours => 60 * 60 * NANOS_PER_SECOND,
            IntervalUnit::Days => 24 * 60 * 60 * NANOS_PER_SECOND,
            IntervalUnit::Years => 365 * 24 * 60 * 60 * NANOS_PER_SECOND,
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        match code {
            "ms" => Some(IntervalUnit::Milliseconds),
            "s" => Some(IntervalUnit::Seconds),
            "m" => Some(IntervalUnit::Minutes),
            "h" => Some(IntervalUnit::Hours),
            "d" => Some(IntervalUnit::Days),
            "y" => Some(IntervalUnit::Years),
            _ => None,
        }
    }
}

/// A positive sampling interval with an exact fixed duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval {
    magnitude: String,
    unit: IntervalUnit,
    nanos: i64,
}

impl Interval {
    /// Parse an interval spec (e.g. `1h`, `15m`, `250ms`, `1.5h`).
    ///
    /// # Errors
    /// Returns [`ParseIntervalError`] if the spec is empty, lacks a magnitude
    /// or unit, has a non-decimal or zero magnitude, does not map to a whole
    /// number of nanoseconds, or uses a unit other than `ms|s|m|h|d|y`.
    pub fn parse(spec: &str) -> Result<Self, ParseIntervalError> {
        spec.parse()
    }

    /// The magnitude as a float (for display and diagnostics).
    pub fn magnitude(&self) -> f64 {
        self.magnitude.parse().unwrap_or(f64::NAN)
    }

    /// The unit of this interval.
    pub fn unit(&self) -> IntervalUnit {
        self.unit
    }

    /// Exact duration in nanoseconds (always > 0).
    pub fn as_nanos(&self) -> i64 {
        self.nanos
    }

    /// Exact duration as a chrono [`Duration`].
    pub fn duration(&self) -> Duration {
        Duration::nanoseconds(self.nanos)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.magnitude, self.unit.code())
    }
}

/// Parse `digits[.digits]` into `(scaled_value, scale)` so that the magnitude
/// equals `scaled_value / scale` exactly.
fn parse_decimal(text: &str) -> Option<(u128, u128)> {
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, f),
        None => (text, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(int_part) || !all_digits(frac_part) {
        return None;
    }
    if text.ends_with('.') {
        return None;
    }

    let mut value: u128 = 0;
    let mut scale: u128 = 1;
    for b in int_part.bytes() {
        value = value.checked_mul(10)?.checked_add(u128::from(b - b'0'))?;
    }
    for b in frac_part.bytes() {
        value = value.checked_mul(10)?.checked_add(u128::from(b - b'0'))?;
        scale = scale.checked_mul(10)?;
    }
    Some((value, scale))
}

impl FromStr for Interval {
    type Err = ParseIntervalError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let spec = input.trim();
        if spec.is_empty() {
            return Err(ParseIntervalError::Empty);
        }

        // Unit starts at the first alphabetic char.
        let Some(unit_start) = spec
            .char_indices()
            .find(|(_, c)| c.is_ascii_alphabetic())
            .map(|(i, _)| i)
        else {
            return MissingUnitSnafu { spec }.fail();
        };

        if unit_start == 0 {
            return MissingNumberSnafu { spec }.fail();
        }

        let (num_str, unit_str) = spec.split_at(unit_start);
        let num_str = num_str.trim();
        let unit_code = unit_str.trim().to_ascii_lowercase();

        let unit = IntervalUnit::from_code(&unit_code).context(UnknownUnitSnafu {
            spec,
            unit: unit_str.trim(),
        })?;

        let (value, scale) = parse_decimal(num_str).context(InvalidNumberSnafu {
            spec,
            magnitude: num_str,
        })?;

        if value == 0 {
            return NonPositiveSnafu { spec }.fail();
        }

        let scaled = value
            .checked_mul(unit.nanos())
            .context(NotRepresentableSnafu { spec })?;
        ensure!(scaled % scale == 0, NotRepresentableSnafu { spec });
        let nanos =
            i64::try_from(scaled / scale).map_err(|_| ParseIntervalError::NotRepresentable {
                spec: spec.to_string(),
            })?;

        Ok(Interval {
            magnitude: num_str.to_string(),
            unit,
            nanos,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_all_six_units() {
        let cases = [
            ("250ms", IntervalUnit::Milliseconds, 250_000_000),
            ("1s", IntervalUnit::Seconds, 1_000_000_000),
            ("2m", IntervalUnit::Minutes, 120_000_000_000),
            ("1h", IntervalUnit::Hours, 3_600_000_000_000),
            ("1d", IntervalUnit::Days, 86_400_000_000_000),
            ("1y", IntervalUnit::Years, 365 * 86_400_000_000_000),
        ];

        for (input, unit, nanos) in cases {
            let interval = Interval::parse(input).unwrap();
            assert_eq!(interval.unit(), unit, "{input}");
            assert_eq!(interval.as_nanos(), nanos, "{input}");
            assert_eq!(interval.to_string(), input);
        }
    }

    #[test]
    fn unit_table_matches_seconds() {
        assert_eq!(Interval::parse("1h").unwrap().duration().num_seconds(), 3600);
        assert_eq!(Interval::parse("1d").unwrap().duration().num_seconds(), 86_400);
        assert_eq!(Interval::parse("15m").unwrap().duration().num_seconds(), 900);
        assert_eq!(
            Interval::parse("1500ms").unwrap().duration().num_milliseconds(),
            1500
        );
    }

    #[test]
    fn parse_round_trips_magnitude() {
        for (input, magnitude) in [("7s", 7.0), ("1.5h", 1.5), ("0.5s", 0.5), ("42d", 42.0)] {
            let interval = Interval::parse(input).unwrap();
            assert_eq!(interval.magnitude(), magnitude);
            assert_eq!(interval.to_string(), input);
        }
    }

    #[test]
    fn fractional_magnitudes_are_exact() {
        assert_eq!(
            Interval::parse("1.5h").unwrap().duration().num_seconds(),
            5400
        );
        assert_eq!(
            Interval::parse("0.25s").unwrap().duration().num_milliseconds(),
            250
        );
    }

    #[test]
    fn parse_is_case_insensitive_and_trims() {
        let interval = Interval::parse("  10H ").unwrap();
        assert_eq!(interval.unit(), IntervalUnit::Hours);
        assert_eq!(interval.to_string(), "10h");

        let interval = Interval::parse("5 MS").unwrap();
        assert_eq!(interval.unit(), IntervalUnit::Milliseconds);
    }

    #[test]
    fn parse_rejects_empty() {
        for input in ["", "  ", "\t"] {
            assert_eq!(Interval::parse(input).unwrap_err(), ParseIntervalError::Empty);
        }
    }

    #[test]
    fn parse_rejects_unknown_units() {
        for input in ["1w", "1hr", "3min", "1sec", "2mo"] {
            let err = Interval::parse(input).unwrap_err();
            assert!(
                matches!(err, ParseIntervalError::UnknownUnit { .. }),
                "{input}: {err:?}"
            );
        }
    }

    #[test]
    fn parse_rejects_missing_parts() {
        assert!(matches!(
            Interval::parse("h").unwrap_err(),
            ParseIntervalError::MissingNumber { .. }
        ));
        assert!(matches!(
            Interval::parse("60").unwrap_err(),
            ParseIntervalError::MissingUnit { .. }
        ));
    }

    #[test]
    fn parse_rejects_bad_magnitudes() {
        for input in ["-1h", "1.h", "1.2.3s", "x1s", "+2m"] {
            let err = Interval::parse(input).unwrap_err();
            assert!(
                matches!(
                    err,
                    ParseIntervalError::InvalidNumber { .. }
                        | ParseIntervalError::MissingNumber { .. }
                ),
                "{input}: {err:?}"
            );
        }
        assert!(matches!(
            Interval::parse("0s").unwrap_err(),
            ParseIntervalError::NonPositive { .. }
        ));
        assert!(matches!(
            Interval::parse("0.0000000001s").unwrap_err(),
            ParseIntervalError::NotRepresentable { .. }
        ));
        assert!(matches!(
            Interval::parse("999999999999y").unwrap_err(),
            ParseIntervalError::NotRepresentable { .. }
        ));
    }
}
