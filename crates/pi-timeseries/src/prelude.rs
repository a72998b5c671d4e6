//! Wrapper prelude.
//!
//! The `pi-timeseries` crate is the supported public entry point.
//! Downstream code should prefer importing from this prelude instead of
//! depending on internal core module paths.

pub use crate::transport::{HttpOptions, Transport};
pub use crate::{
    AttributeInfo, ClientConfig, FetchError, FetchRequest, FetchResult, Interval, PiClient,
    SyncedTable, TimeBound, TimeRange,
};
