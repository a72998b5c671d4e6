//! Aligning several attributes within one sub-range.
//!
//! The first attribute defines the window: its first and last realized
//! timestamps are used to refetch every other attribute, so all columns are
//! interpolated over the same span even when the requested bounds were
//! relative. The per-attribute series are then merged on the union of their
//! timestamps.

use chrono::Utc;
use log::debug;
use snafu::prelude::*;

use crate::{
    error::{FetchResult, NoAttributesSnafu},
    fetcher::SeriesFetcher,
    interval::Interval,
    table::SyncedTable,
    time_range::{TimeRange, format_wire_time},
};

/// Fetch `paths` over a single (unsplit) window and align them.
pub async fn fetch_synced_window(
    fetcher: &SeriesFetcher<'_>,
    paths: &[String],
    window: &TimeRange,
    interval: &Interval,
) -> FetchResult<SyncedTable> {
    let (first_path, rest) = paths.split_first().context(NoAttributesSnafu)?;

    let start = window.start.to_wire();
    let end = window.end.to_wire();
    let first = fetcher
        .fetch_one(first_path, &start, &end, interval)
        .await?;

    let (sync_start, sync_end) = match first.bounds() {
        Some((lo, hi)) => (
            format_wire_time(lo.with_timezone(&Utc)),
            format_wire_time(hi.with_timezone(&Utc)),
        ),
        None => (start, end),
    };
    if !rest.is_empty() {
        debug!(
            "aligning {} attribute(s) on {first_path} over [{sync_start}, {sync_end}]",
            rest.len()
        );
    }

    let mut series = Vec::with_capacity(paths.len());
    series.push(first);
    for path in rest {
        series.push(
            fetcher
                .fetch_one(path, &sync_start, &sync_end, interval)
                .await?,
        );
    }

    Ok(SyncedTable::from_series(fetcher.timezone(), series))
}
