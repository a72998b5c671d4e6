//! Top-level entry point.
//!
//! [`PiClient`] owns the configuration and a transport and exposes the
//! operations callers need: fetch a table, preview the split plan, resolve a
//! single attribute. Every call is request-scoped; the client keeps no state
//! between calls apart from its configuration.

use log::debug;
use snafu::prelude::*;
use url::Url;

use crate::{
    config::{ClientConfig, DEFAULT_END, DEFAULT_INTERVAL, DEFAULT_START},
    error::{
        FetchResult, InvalidConfigSnafu, InvalidIntervalSnafu, InvalidTimeSnafu,
        NoAttributesSnafu, TransportSetupSnafu,
    },
    fetcher::{AttributeInfo, SeriesFetcher},
    interval::Interval,
    splitter::RangeSplitter,
    table::SyncedTable,
    time_range::TimeRange,
    transport::{HttpTransport, Transport},
};

/// Parameters of one fetch, with the documented defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Attribute paths, first one defines the alignment window.
    pub paths: Vec<String>,
    /// Range start (absolute or relative).
    pub start: String,
    /// Range end (absolute or relative).
    pub end: String,
    /// Sampling interval, e.g. `1h`.
    pub interval: String,
}

impl Default for FetchRequest {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            start: DEFAULT_START.to_string(),
            end: DEFAULT_END.to_string(),
            interval: DEFAULT_INTERVAL.to_string(),
        }
    }
}

impl FetchRequest {
    /// Request for `paths` with default range and interval.
    pub fn new<S: Into<String>>(paths: impl IntoIterator<Item = S>) -> Self {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Set the range.
    pub fn with_range(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.start = start.into();
        self.end = end.into();
        self
    }

    /// Set the interval.
    pub fn with_interval(mut self, interval: impl Into<String>) -> Self {
        self.interval = interval.into();
        self
    }
}

/// PI Web API timeseries client.
pub struct PiClient {
    config: ClientConfig,
    base_url: Url,
    transport: Box<dyn Transport>,
}

fn validate(config: &ClientConfig) -> FetchResult<Url> {
    ensure!(
        config.max_samples > 0,
        InvalidConfigSnafu {
            message: "max_samples must be > 0",
        }
    );

    let base_url = Url::parse(&config.base_url).map_err(|e| {
        InvalidConfigSnafu {
            message: format!("invalid base URL '{}': {e}", config.base_url),
        }
        .build()
    })?;
    ensure!(
        matches!(base_url.scheme(), "http" | "https") && !base_url.cannot_be_a_base(),
        InvalidConfigSnafu {
            message: format!("base URL '{}' must be an http(s) URL", config.base_url),
        }
    );

    Ok(base_url)
}

impl PiClient {
    /// Client using the bundled `reqwest` transport.
    ///
    /// # Errors
    /// `InvalidConfig` for an unusable base URL or a zero sample cap;
    /// `TransportSetup` if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> FetchResult<Self> {
        let transport = HttpTransport::new(&config.http).context(TransportSetupSnafu)?;
        Self::with_transport(config, transport)
    }

    /// Client using a caller-supplied transport.
    pub fn with_transport(
        config: ClientConfig,
        transport: impl Transport + 'static,
    ) -> FetchResult<Self> {
        let base_url = validate(&config)?;
        Ok(Self {
            config,
            base_url,
            transport: Box::new(transport),
        })
    }

    /// The configuration this client was built from.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn fetcher(&self) -> SeriesFetcher<'_> {
        SeriesFetcher::new(self.transport.as_ref(), &self.base_url, self.config.timezone)
    }

    fn parse_inputs(
        &self,
        start: &str,
        end: &str,
        interval: &str,
    ) -> FetchResult<(TimeRange, Interval)> {
        let interval = Interval::parse(interval).context(InvalidIntervalSnafu)?;
        let range = TimeRange::parse(start, end, self.config.timezone).context(InvalidTimeSnafu)?;
        Ok((range, interval))
    }

    /// Fetch `paths` over `[start, end]` at `interval` into one aligned
    /// table, splitting absolute ranges that exceed the sample cap.
    ///
    /// # Errors
    /// Input errors (`InvalidInterval`, `NoAttributes`, `InvalidTime`,
    /// `InvalidRange`) are reported before any request is made; the first
    /// failing leaf request fails the whole call.
    pub async fn fetch<S: AsRef<str>>(
        &self,
        paths: &[S],
        start: &str,
        end: &str,
        interval: &str,
    ) -> FetchResult<SyncedTable> {
        let (range, interval) = self.parse_inputs(start, end, interval)?;
        ensure!(!paths.is_empty(), NoAttributesSnafu);
        let paths: Vec<String> = paths.iter().map(|p| p.as_ref().to_string()).collect();

        debug!(
            "fetch {} attribute(s) over [{}, {}] at {interval}",
            paths.len(),
            range.start,
            range.end
        );

        let fetcher = self.fetcher();
        let splitter = RangeSplitter::new(&fetcher, self.config.max_samples);
        let table = splitter.fetch(&paths, &range, &interval).await?;
        debug!("fetched {} row(s)", table.num_rows());
        Ok(table)
    }

    /// [`Self::fetch`] driven by a [`FetchRequest`].
    pub async fn fetch_request(&self, request: &FetchRequest) -> FetchResult<SyncedTable> {
        self.fetch(
            &request.paths,
            &request.start,
            &request.end,
            &request.interval,
        )
        .await
    }

    /// The leaf windows a fetch over `[start, end]` would request. Makes no
    /// network calls.
    pub fn plan(&self, start: &str, end: &str, interval: &str) -> FetchResult<Vec<TimeRange>> {
        let (range, interval) = self.parse_inputs(start, end, interval)?;
        let fetcher = self.fetcher();
        RangeSplitter::new(&fetcher, self.config.max_samples).plan(&range, &interval)
    }

    /// Resolve one attribute path to its metadata.
    pub async fn resolve_attribute(&self, path: &str) -> FetchResult<AttributeInfo> {
        self.fetcher().resolve_attribute(path).await
    }
}
