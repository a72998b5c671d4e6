//! Splitting long absolute ranges under the server's sample cap.
//!
//! The server refuses interpolated requests that would return more than a
//! fixed number of samples. For an absolute range `[start, end]` the
//! requested sample count is `floor((end - start) / interval)`. When it
//! exceeds `max_samples` the range is cut into
//!
//! ```text
//! head = [start, start + max_samples * interval - interval]
//! tail = [start + max_samples * interval, end]
//! ```
//!
//! and the tail is split again by the same rule until what remains fits.
//! The head of every step holds exactly `max_samples` grid points and the
//! next step starts one interval later, so no grid point is requested twice.
//! [`plan_sub_ranges`] computes the whole sequence up front; fetching and
//! stitching happen in [`RangeSplitter::fetch`].

use chrono::{DateTime, Duration, Utc};
use log::debug;
use snafu::prelude::*;

use crate::{
    error::{FetchResult, InvalidConfigSnafu, InvalidRangeSnafu, NoAttributesSnafu},
    fetcher::SeriesFetcher,
    interval::Interval,
    sync::fetch_synced_window,
    table::SyncedTable,
    time_range::{TimeBound, TimeRange, format_wire_time},
};

/// One leaf request window over absolute time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubRange {
    /// Inclusive start.
    pub start: DateTime<Utc>,
    /// Inclusive end.
    pub end: DateTime<Utc>,
}

impl SubRange {
    /// As a [`TimeRange`] with two absolute bounds.
    pub fn to_time_range(self) -> TimeRange {
        TimeRange {
            start: TimeBound::Absolute(self.start),
            end: TimeBound::Absolute(self.end),
        }
    }

    /// Requested sample count of this window.
    pub fn sample_count(&self, interval: &Interval) -> u64 {
        sample_count(self.start, self.end, interval)
    }
}

/// `floor((end - start) / interval)`, zero when `end <= start`.
pub fn sample_count(start: DateTime<Utc>, end: DateTime<Utc>, interval: &Interval) -> u64 {
    let span = i128::from((end - start).num_nanoseconds().unwrap_or(i64::MAX));
    if span <= 0 {
        return 0;
    }
    u64::try_from(span / i128::from(interval.as_nanos())).unwrap_or(u64::MAX)
}

/// Compute the ordered leaf windows for `[start, end]`.
///
/// Returns a single window when the range fits under `max_samples`.
///
/// # Errors
/// `InvalidRange` if `end < start`; `InvalidConfig` if `max_samples` is zero.
pub fn plan_sub_ranges(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    interval: &Interval,
    max_samples: u64,
) -> FetchResult<Vec<SubRange>> {
    ensure!(
        end >= start,
        InvalidRangeSnafu {
            start: format_wire_time(start),
            end: format_wire_time(end),
        }
    );
    ensure!(
        max_samples > 0,
        InvalidConfigSnafu {
            message: "max_samples must be > 0",
        }
    );

    let mut plan = Vec::new();
    let mut cursor = start;
    if sample_count(start, end, interval) > max_samples {
        // An unrepresentable step is longer than any range left to split.
        let step = i64::try_from(max_samples)
            .ok()
            .and_then(|n| n.checked_mul(interval.as_nanos()))
            .map(Duration::nanoseconds);

        while sample_count(cursor, end, interval) > max_samples {
            let Some(next) = step.and_then(|step| cursor.checked_add_signed(step)) else {
                break;
            };
            plan.push(SubRange {
                start: cursor,
                end: next - interval.duration(),
            });
            cursor = next;
        }
    }
    plan.push(SubRange { start: cursor, end });

    Ok(plan)
}

/// Fetches a (possibly split) range for a list of attributes.
pub struct RangeSplitter<'a> {
    fetcher: &'a SeriesFetcher<'a>,
    max_samples: u64,
}

impl<'a> RangeSplitter<'a> {
    /// Splitter issuing leaf requests through `fetcher`.
    pub fn new(fetcher: &'a SeriesFetcher<'a>, max_samples: u64) -> Self {
        Self {
            fetcher,
            max_samples,
        }
    }

    /// The leaf windows that [`Self::fetch`] would request for `range`.
    ///
    /// A range with any relative bound is a single window passed through as
    /// is.
    pub fn plan(&self, range: &TimeRange, interval: &Interval) -> FetchResult<Vec<TimeRange>> {
        match range.absolute() {
            Some((start, end)) => Ok(plan_sub_ranges(start, end, interval, self.max_samples)?
                .into_iter()
                .map(SubRange::to_time_range)
                .collect()),
            None => Ok(vec![range.clone()]),
        }
    }

    /// Fetch `paths` over `range` and stitch the leaves into one table.
    ///
    /// Leaves are fetched one after another in chronological order; the
    /// first failing leaf fails the whole call.
    pub async fn fetch(
        &self,
        paths: &[String],
        range: &TimeRange,
        interval: &Interval,
    ) -> FetchResult<SyncedTable> {
        ensure!(!paths.is_empty(), NoAttributesSnafu);

        let windows = self.plan(range, interval)?;
        if windows.len() > 1 {
            debug!(
                "splitting [{}, {}] into {} requests of at most {} samples",
                range.start,
                range.end,
                windows.len(),
                self.max_samples
            );
        }

        let mut parts = Vec::with_capacity(windows.len());
        for window in &windows {
            parts.push(fetch_synced_window(self.fetcher, paths, window, interval).await?);
        }

        SyncedTable::concat(parts)
    }
}
