//! # pi-timeseries
//!
//! Fetch interpolated process-historian data from a PI Web API server as one
//! time-aligned table, with long ranges split transparently under the
//! server's per-request sample cap.
//!
//! This crate is the supported public entry point and provides a small, stable surface.
//!
//! ## Example
//!
//! ```rust,no_run
//! use pi_timeseries::prelude::*;
//!
//! # async fn run() -> Result<(), FetchError> {
//! let client = PiClient::new(ClientConfig::new("https://pi.example.com/piwebapi"))?;
//! let table = client
//!     .fetch(&["\\\\PISRV\\Plant\\Unit1|Flow"], "-1d", "*", "1h")
//!     .await?;
//! let batch = table.to_record_batch()?;
//! println!("{} rows", batch.num_rows());
//! # Ok(())
//! # }
//! ```

/// Convenience prelude with the stable, supported surface.
pub mod prelude;

/// Transport seam (wrapper-only).
pub mod transport {
    pub use pi_timeseries_core::transport::{HttpOptions, HttpTransport, Transport, TransportError};
}

/// Split planning without network access.
pub mod plan {
    pub use pi_timeseries_core::splitter::{SubRange, plan_sub_ranges, sample_count};
}

pub use pi_timeseries_core::config::{
    DEFAULT_END, DEFAULT_INTERVAL, DEFAULT_MAX_SAMPLES, DEFAULT_START, DEFAULT_TIMEZONE,
};
pub use pi_timeseries_core::fetcher::AttributeInfo;
pub use pi_timeseries_core::time_range::TimeParseError;
pub use pi_timeseries_core::{
    AttributeSeries, ClientConfig, Column, FetchError, FetchRequest, FetchResult, Interval,
    IntervalUnit, ParseIntervalError, PiClient, SyncedTable, TimeBound, TimeRange,
};
