//! Error type for the top-level fetch API.
//!
//! `FetchError` is the taxonomy callers match on. Context selectors are
//! visible crate-wide so the fetcher, splitter and table code can attach
//! context without re-exporting them.

use arrow::error::ArrowError;
use serde_json::Value;
use snafu::prelude::*;

use crate::{
    interval::ParseIntervalError, time_range::TimeParseError, timestamp::UnparseableTimestamp,
    transport::TransportError,
};

/// Convenience alias used throughout the crate.
pub type FetchResult<T> = Result<T, FetchError>;

/// Errors from fetching and assembling timeseries.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum FetchError {
    /// The interval spec could not be parsed.
    #[snafu(display("Invalid interval: {source}"))]
    InvalidInterval {
        /// Underlying parse error.
        source: ParseIntervalError,
    },

    /// A start or end bound could not be parsed.
    #[snafu(display("Invalid time bound: {source}"))]
    InvalidTime {
        /// Underlying parse error.
        source: TimeParseError,
    },

    /// An absolute range ends before it starts.
    #[snafu(display("Invalid range: start={start}, end={end} (expect start <= end)"))]
    InvalidRange {
        /// Requested start.
        start: String,
        /// Requested end.
        end: String,
    },

    /// Client configuration is unusable.
    #[snafu(display("Invalid configuration: {message}"))]
    InvalidConfig {
        /// What is wrong.
        message: String,
    },

    /// The bundled HTTP transport could not be built.
    #[snafu(display("Cannot build HTTP transport: {source}"))]
    TransportSetup {
        /// Underlying transport error.
        source: TransportError,
    },

    /// No attribute paths were given.
    #[snafu(display("At least one attribute path is required"))]
    NoAttributes,

    /// The server has no attribute at this path.
    #[snafu(display("Attribute not found: {path} ({detail})"))]
    AttributeNotFound {
        /// Requested attribute path.
        path: String,
        /// Server-provided explanation, if any.
        detail: String,
    },

    /// The server reported errors instead of data, or sent data that cannot
    /// be interpreted.
    #[snafu(display("Server data error for {path}: {message}; payload: {payload}"))]
    ServerData {
        /// Attribute path being fetched.
        path: String,
        /// Short description.
        message: String,
        /// Raw JSON payload of the server's errors (or the offending value).
        payload: Value,
    },

    /// A timestamp survived every parsing pass.
    #[snafu(display("Server data error for {path}: {source}"))]
    TimestampParse {
        /// Attribute path being fetched.
        path: String,
        /// The timestamp that could not be parsed.
        source: UnparseableTimestamp,
    },

    /// The metadata request for an attribute failed outside any fetch.
    #[snafu(display("Attribute lookup failed for {path}: {source}"))]
    LookupFailed {
        /// Attribute path being resolved.
        path: String,
        /// Underlying transport error.
        source: TransportError,
    },

    /// The HTTP request for a sub-range failed.
    #[snafu(display("Fetch failed for {path} over [{start}, {end}]: {source}"))]
    FetchFailed {
        /// Attribute path being fetched.
        path: String,
        /// Sub-range start as sent to the server.
        start: String,
        /// Sub-range end as sent to the server.
        end: String,
        /// Underlying transport error.
        source: TransportError,
    },

    /// Sub-range tables do not share the same columns.
    #[snafu(display("Cannot concatenate tables with columns {expected:?} and {actual:?}"))]
    SchemaMismatch {
        /// Columns of the first table.
        expected: Vec<String>,
        /// Columns of the offending table.
        actual: Vec<String>,
    },

    /// A timestamp cannot be represented as `i64` nanoseconds.
    #[snafu(display("Timestamp {timestamp} is outside the nanosecond range"))]
    TimestampOutOfRange {
        /// The offending timestamp (RFC 3339).
        timestamp: String,
    },

    /// Arrow conversion failed.
    #[snafu(display("Arrow error: {source}"))]
    Arrow {
        /// Underlying Arrow error.
        source: ArrowError,
    },
}

impl FetchError {
    /// Whether this error reflects data the server sent (as opposed to a
    /// transport or caller problem).
    pub fn is_server_data_error(&self) -> bool {
        matches!(
            self,
            FetchError::ServerData { .. } | FetchError::TimestampParse { .. }
        )
    }
}
