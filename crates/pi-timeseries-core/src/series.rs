//! A single attribute's normalized samples.

use chrono::DateTime;
use chrono_tz::Tz;

/// Ordered `(timestamp, value)` samples of one attribute.
///
/// Timestamps are strictly increasing and expressed in the client's target
/// timezone.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSeries {
    /// Attribute path the series was requested for.
    pub path: String,
    /// Display name sanitized into an identifier.
    pub name: String,
    /// Unit abbreviation; empty when the attribute has none.
    pub unit: String,
    /// Samples in ascending time order.
    pub points: Vec<(DateTime<Tz>, f64)>,
}

impl AttributeSeries {
    /// Number of samples.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the series has no samples.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// First and last timestamp.
    pub fn bounds(&self) -> Option<(DateTime<Tz>, DateTime<Tz>)> {
        let first = self.points.first()?.0;
        let last = self.points.last()?.0;
        Some((first, last))
    }

    /// Timestamps only.
    pub fn timestamps(&self) -> impl Iterator<Item = DateTime<Tz>> + '_ {
        self.points.iter().map(|(ts, _)| *ts)
    }
}

/// Turn a server display name into a column identifier.
///
/// Non-alphanumeric characters become `_`; a leading non-letter gets an `a_`
/// prefix so the result is a valid identifier. Case is preserved since
/// plant tag names are case-significant to their readers.
pub fn sanitize_identifier(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.trim().chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            out.push(ch);
        } else {
            out.push('_');
        }
    }

    if out.is_empty() {
        return "value".to_string();
    }

    if out
        .chars()
        .next()
        .map(|ch| !ch.is_ascii_alphabetic())
        .unwrap_or(false)
    {
        out = format!("a_{out}");
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Europe::Stockholm;

    #[test]
    fn sanitize_identifier_cases() {
        assert_eq!(sanitize_identifier("Flow Rate"), "Flow_Rate");
        assert_eq!(sanitize_identifier("Temp.(°C)"), "Temp___C_");
        assert_eq!(sanitize_identifier("101-TI-22"), "a_101_TI_22");
        assert_eq!(sanitize_identifier("_hidden"), "a__hidden");
        assert_eq!(sanitize_identifier("  padded "), "padded");
        assert_eq!(sanitize_identifier(""), "value");
    }

    #[test]
    fn bounds_of_empty_and_non_empty() {
        let mut series = AttributeSeries {
            path: "\\\\srv\\db\\el|A".to_string(),
            name: "A".to_string(),
            unit: String::new(),
            points: vec![],
        };
        assert!(series.bounds().is_none());
        assert!(series.is_empty());

        let t0 = Stockholm.with_ymd_and_hms(2023, 4, 26, 6, 35, 0).unwrap();
        let t1 = Stockholm.with_ymd_and_hms(2023, 4, 26, 6, 36, 0).unwrap();
        series.points = vec![(t0, 1.0), (t1, 2.0)];
        assert_eq!(series.bounds(), Some((t0, t1)));
        assert_eq!(series.timestamps().count(), 2);
    }
}
