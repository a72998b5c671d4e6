//! Single-attribute fetch: resolve the path, request interpolated values and
//! normalize them into an [`AttributeSeries`].
//!
//! Each call is two sequential round trips (metadata, then data). Nothing is
//! cached between calls, not even the metadata of an attribute fetched a
//! moment ago for the previous sub-range.

use chrono_tz::Tz;
use log::{debug, warn};
use serde::Deserialize;
use serde_json::Value;
use snafu::prelude::*;
use url::Url;

use crate::{
    error::{
        AttributeNotFoundSnafu, FetchError, FetchFailedSnafu, FetchResult, InvalidConfigSnafu,
        LookupFailedSnafu, ServerDataSnafu, TimestampParseSnafu,
    },
    interval::Interval,
    series::{AttributeSeries, sanitize_identifier},
    timestamp::normalize_timestamps,
    transport::{Transport, TransportError},
    wire::{AttributeDto, InterpolatedDto, SELECTED_FIELDS, body_errors, has_errors},
};

/// Metadata of a resolved attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeInfo {
    /// Path the attribute was resolved from.
    pub path: String,
    /// Display name as the server reports it.
    pub display_name: String,
    /// Display name sanitized into an identifier.
    pub name: String,
    /// Unit abbreviation; empty when the attribute has none.
    pub unit: String,
    /// Interpolated-data endpoint of the attribute's stream.
    pub interpolated_link: Url,
}

/// Build `{base}/attributes?path=...`.
pub fn attributes_url(base: &Url, path: &str) -> Option<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .push("attributes");
    url.query_pairs_mut().clear().append_pair("path", path);
    Some(url)
}

/// Append the interpolated query to a server-provided link.
pub fn interpolated_url(link: &Url, start: &str, end: &str, interval: &Interval) -> Url {
    let mut url = link.clone();
    url.query_pairs_mut()
        .append_pair("startTime", start)
        .append_pair("endTime", end)
        .append_pair("interval", &interval.to_string())
        .append_pair("selectedFields", SELECTED_FIELDS);
    url
}

fn not_found_detail(err: &TransportError) -> String {
    match err {
        TransportError::Status { body, status, .. } => body_errors(body)
            .map(|errors| errors.to_string())
            .unwrap_or_else(|| format!("HTTP {status}")),
        other => other.to_string(),
    }
}

/// Fetches one attribute at a time over a given window.
pub struct SeriesFetcher<'a> {
    transport: &'a dyn Transport,
    base_url: &'a Url,
    timezone: Tz,
}

impl<'a> SeriesFetcher<'a> {
    /// Fetcher against `base_url` that converts timestamps into `timezone`.
    pub fn new(transport: &'a dyn Transport, base_url: &'a Url, timezone: Tz) -> Self {
        Self {
            transport,
            base_url,
            timezone,
        }
    }

    /// Target timezone of returned series.
    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Resolve `path` to its metadata.
    pub async fn resolve_attribute(&self, path: &str) -> FetchResult<AttributeInfo> {
        let url = attributes_url(self.base_url, path).context(InvalidConfigSnafu {
            message: format!("base URL {} cannot carry a path", self.base_url),
        })?;

        let body = match self.transport.get_json(&url).await {
            Ok(body) => body,
            Err(err) if err.status() == Some(404) => {
                return AttributeNotFoundSnafu {
                    path,
                    detail: not_found_detail(&err),
                }
                .fail();
            }
            Err(source) => {
                return Err(source).context(LookupFailedSnafu { path });
            }
        };

        if let Some(errors) = body_errors(&body) {
            return AttributeNotFoundSnafu {
                path,
                detail: errors.to_string(),
            }
            .fail();
        }

        let dto = AttributeDto::deserialize(&body).map_err(|e| {
            ServerDataSnafu {
                path,
                message: format!("unexpected attribute response: {e}"),
                payload: body.clone(),
            }
            .build()
        })?;

        let interpolated_link = Url::parse(&dto.links.interpolated_data).map_err(|e| {
            ServerDataSnafu {
                path,
                message: format!("invalid InterpolatedData link: {e}"),
                payload: Value::String(dto.links.interpolated_data.clone()),
            }
            .build()
        })?;

        Ok(AttributeInfo {
            path: path.to_string(),
            name: sanitize_identifier(&dto.name),
            display_name: dto.name,
            unit: dto.default_units_name_abbreviation.unwrap_or_default(),
            interpolated_link,
        })
    }

    /// Fetch interpolated values of `path` over `[start, end]`.
    ///
    /// `start` and `end` are wire strings (absolute RFC 3339 or relative PI
    /// expressions). Non-numeric items are dropped; the result is sorted
    /// and free of duplicate timestamps.
    pub async fn fetch_one(
        &self,
        path: &str,
        start: &str,
        end: &str,
        interval: &Interval,
    ) -> FetchResult<AttributeSeries> {
        let info = match self.resolve_attribute(path).await {
            Err(FetchError::LookupFailed { source, .. }) => {
                return Err(source).context(FetchFailedSnafu { path, start, end });
            }
            other => other?,
        };
        let url = interpolated_url(&info.interpolated_link, start, end, interval);
        debug!("fetching {path} over [{start}, {end}] at {interval}");

        let body = self
            .transport
            .get_json(&url)
            .await
            .context(FetchFailedSnafu { path, start, end })?;

        if let Some(errors) = body_errors(&body) {
            return ServerDataSnafu {
                path,
                message: "server reported errors instead of data",
                payload: errors,
            }
            .fail();
        }

        let dto = InterpolatedDto::deserialize(&body).map_err(|e| {
            ServerDataSnafu {
                path,
                message: format!("unexpected interpolated response: {e}"),
                payload: body.clone(),
            }
            .build()
        })?;

        let item_errors: Vec<Value> = dto
            .items
            .iter()
            .filter(|item| has_errors(&item.errors))
            .filter_map(|item| item.errors.clone())
            .collect();
        if !item_errors.is_empty() {
            return ServerDataSnafu {
                path,
                message: format!("{} item(s) carry errors", item_errors.len()),
                payload: Value::Array(item_errors),
            }
            .fail();
        }

        let total = dto.items.len();
        let (raw_timestamps, values): (Vec<String>, Vec<f64>) = dto
            .items
            .into_iter()
            .filter_map(|item| {
                let value = item.numeric_value()?;
                Some((item.timestamp, value))
            })
            .unzip();
        if values.len() < total {
            debug!(
                "{path}: dropped {} non-numeric item(s) of {total}",
                total - values.len()
            );
        }

        let timestamps = normalize_timestamps(&raw_timestamps, self.timezone)
            .context(TimestampParseSnafu { path })?;

        let mut points: Vec<_> = timestamps.into_iter().zip(values).collect();
        points.sort_by_key(|(ts, _)| *ts);
        let before = points.len();
        points.dedup_by_key(|(ts, _)| *ts);
        if points.len() < before {
            warn!(
                "{path}: dropped {} duplicate timestamp(s) from server response",
                before - points.len()
            );
        }

        Ok(AttributeSeries {
            path: info.path,
            name: info.name,
            unit: info.unit,
            points,
        })
    }
}
