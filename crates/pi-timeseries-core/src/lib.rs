//! Core engine for fetching interpolated timeseries from a PI Web API server.
//!
//! This crate provides the foundational pieces for `pi-timeseries`:
//!
//! - Interval and time-range parsing, including PI relative time markers
//!   (`interval`, `time_range` modules).
//! - A transport seam with a `reqwest` implementation (`transport` module).
//! - Per-attribute fetching with tolerant timestamp normalization
//!   (`fetcher`, `timestamp` modules).
//! - Transparent splitting of ranges that exceed the server's sample cap,
//!   and stitching of the pieces (`splitter` module).
//! - Multi-attribute alignment into a single table with Arrow export
//!   (`sync`, `table` modules).
//!
//! The entry point is [`PiClient`]. Higher-level crates (the facade and the
//! CLI) depend on this crate rather than re-implementing fetch logic.
#![deny(missing_docs)]
pub mod client;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod interval;
pub mod series;
pub mod splitter;
pub mod sync;
pub mod table;
pub mod time_range;
pub mod timestamp;
pub mod transport;
pub mod wire;

#[cfg(test)]
pub(crate) mod test_util;

pub use client::{FetchRequest, PiClient};
pub use config::ClientConfig;
pub use error::{FetchError, FetchResult};
pub use interval::{Interval, IntervalUnit, ParseIntervalError};
pub use series::AttributeSeries;
pub use table::{Column, SyncedTable};
pub use time_range::{TimeBound, TimeRange};
