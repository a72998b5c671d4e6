use pi_timeseries_core::{
    FetchError, interval::ParseIntervalError, time_range::TimeParseError,
};

use snafu::Snafu;

pub type CliResult<T> = std::result::Result<T, CliError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CliError {
    #[snafu(display(
        "No server configured. Pass --base-url or set PI_WEB_API_URL \
         (e.g. https://pi.example.com/piwebapi)."
    ))]
    MissingBaseUrl,

    #[snafu(display("Invalid --timezone '{timezone}': {message}"))]
    InvalidTimezone { timezone: String, message: String },

    #[snafu(display("Invalid --interval '{spec}': {source}"))]
    InvalidInterval {
        spec: String,
        source: ParseIntervalError,
    },

    #[snafu(display("Invalid time '{input}': {source}"))]
    InvalidTime {
        input: String,
        source: TimeParseError,
    },

    #[snafu(display("{source}"))]
    Fetch {
        #[snafu(source(from(FetchError, Box::new)))]
        source: Box<FetchError>,
    },

    #[snafu(display("Arrow error: {source}"))]
    Arrow {
        source: arrow::error::ArrowError,
    },

    #[snafu(display("Failed to create output file: {path}"))]
    CreateOutput {
        path: String,
        source: std::io::Error,
    },

    #[snafu(display("Failed to write output: {source}"))]
    WriteOutput { source: std::io::Error },
}
