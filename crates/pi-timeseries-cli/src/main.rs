//! CLI tool for fetching PI Web API timeseries.

mod error;
mod output;

use std::path::PathBuf;
use std::time::Instant;

use chrono_tz::Tz;
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::debug;
use pi_timeseries_core::{
    ClientConfig, Interval, PiClient, TimeRange,
    config::{
        DEFAULT_END, DEFAULT_INTERVAL, DEFAULT_MAX_SAMPLES, DEFAULT_START, DEFAULT_TIMEZONE,
    },
    splitter::plan_sub_ranges,
    transport::HttpOptions,
};
use snafu::{OptionExt, ResultExt};

use crate::{
    error::{
        CliResult, FetchSnafu, InvalidIntervalSnafu, InvalidTimeSnafu, InvalidTimezoneSnafu,
        MissingBaseUrlSnafu,
    },
    output::{OutputOpts, TableOutput, print_table_output, render_table, write_batch_file},
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormatArg {
    Csv,
    Jsonl,
}

impl From<OutputFormatArg> for crate::output::OutputFormat {
    fn from(v: OutputFormatArg) -> Self {
        match v {
            OutputFormatArg::Csv => crate::output::OutputFormat::Csv,
            OutputFormatArg::Jsonl => crate::output::OutputFormat::Jsonl,
        }
    }
}

/// Server connection flags, shared by every subcommand.
#[derive(Debug, Args)]
struct ConnectionArgs {
    /// PI Web API root, e.g. https://pi.example.com/piwebapi
    #[arg(long, env = "PI_WEB_API_URL", global = true)]
    base_url: Option<String>,

    #[arg(long, env = "PI_WEB_API_USERNAME", global = true)]
    username: Option<String>,

    #[arg(long, env = "PI_WEB_API_PASSWORD", global = true, hide_env_values = true)]
    password: Option<String>,

    /// Accept invalid TLS certificates
    #[arg(long, default_value_t = false, global = true)]
    insecure: bool,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 60, global = true)]
    timeout: u64,
}

/// Range, interval and splitting flags.
#[derive(Debug, Args)]
struct RangeArgs {
    /// Absolute time or PI relative time (e.g. -1d, *-2h, t)
    #[arg(long, default_value = DEFAULT_START, allow_hyphen_values = true)]
    start: String,

    #[arg(long, default_value = DEFAULT_END, allow_hyphen_values = true)]
    end: String,

    /// e.g. 1s, 15m, 1h, 1d
    #[arg(long, default_value = DEFAULT_INTERVAL)]
    interval: String,

    /// Samples per request before the range is split
    #[arg(long, default_value_t = DEFAULT_MAX_SAMPLES)]
    max_samples: u64,

    /// IANA timezone for naive inputs and returned timestamps
    #[arg(long, default_value = DEFAULT_TIMEZONE.name())]
    timezone: String,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch interpolated values for one or more attributes
    Fetch {
        /// Repeatable attribute path; the first one defines the time grid
        #[arg(long = "attribute", short = 'a', required = true)]
        attributes: Vec<String>,

        #[command(flatten)]
        range: RangeArgs,

        #[arg(long, default_value_t = 10)]
        max_rows: usize,

        #[arg(long)]
        output: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = OutputFormatArg::Csv)]
        format: OutputFormatArg,

        #[arg(long, default_value_t = false)]
        timing: bool,
    },

    /// Print the sub-range plan for a range without contacting the server
    Plan {
        #[command(flatten)]
        range: RangeArgs,
    },

    /// Resolve an attribute path and print its metadata
    Attribute {
        #[arg(long)]
        path: String,
    },
}

#[derive(Debug, Parser)]
#[command(name = "pits", version, about = "Fetch PI Web API timeseries")]
struct Cli {
    #[command(flatten)]
    conn: ConnectionArgs,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();
}

fn parse_timezone(spec: &str) -> CliResult<Tz> {
    spec.parse::<Tz>().map_err(|e| {
        InvalidTimezoneSnafu {
            timezone: spec,
            message: e.to_string(),
        }
        .build()
    })
}

fn client_config(conn: &ConnectionArgs, range: &RangeArgs) -> CliResult<ClientConfig> {
    let base_url = conn.base_url.clone().context(MissingBaseUrlSnafu)?;
    let timezone = parse_timezone(&range.timezone)?;

    let mut config = ClientConfig::new(base_url)
        .with_max_samples(range.max_samples)
        .with_timezone(timezone);
    config.http = http_options(conn);
    Ok(config)
}

fn http_options(conn: &ConnectionArgs) -> HttpOptions {
    HttpOptions {
        username: conn.username.clone(),
        password: conn.password.clone(),
        accept_invalid_certs: conn.insecure,
        timeout_secs: conn.timeout,
    }
}

async fn cmd_fetch(
    conn: &ConnectionArgs,
    attributes: Vec<String>,
    range: RangeArgs,
    opts: OutputOpts,
) -> CliResult<()> {
    let client = PiClient::new(client_config(conn, &range)?).context(FetchSnafu)?;

    let sub_ranges = client
        .plan(&range.start, &range.end, &range.interval)
        .context(FetchSnafu)?
        .len();

    let start = Instant::now();
    let table = client
        .fetch(&attributes, &range.start, &range.end, &range.interval)
        .await
        .context(FetchSnafu)?;
    let batch = table.to_record_batch().context(FetchSnafu)?;
    let elapsed = opts.timing.then(|| start.elapsed());
    debug!(
        "fetched {} row(s) x {} column(s)",
        table.num_rows(),
        table.num_columns()
    );

    if let Some(path) = &opts.output {
        write_batch_file(path, opts.format, &batch)?;
    }

    let mut res = TableOutput::from_batch(&batch, opts.max_rows, elapsed)?;
    res.sub_ranges = Some(sub_ranges);
    print_table_output(&res, &opts)
}

fn cmd_plan(range: RangeArgs) -> CliResult<()> {
    let timezone = parse_timezone(&range.timezone)?;
    let interval = Interval::parse(&range.interval).context(InvalidIntervalSnafu {
        spec: range.interval.clone(),
    })?;
    let parsed = TimeRange::parse(&range.start, &range.end, timezone).context(InvalidTimeSnafu {
        input: format!("{} .. {}", range.start, range.end),
    })?;

    let columns: Vec<String> = ["#", "start", "end", "samples"]
        .iter()
        .map(|c| c.to_string())
        .collect();

    let rows: Vec<Vec<String>> = match parsed.absolute() {
        Some((start, end)) => {
            plan_sub_ranges(start, end, &interval, range.max_samples)
                .context(FetchSnafu)?
                .into_iter()
                .enumerate()
                .map(|(i, r)| {
                    let window = r.to_time_range();
                    vec![
                        (i + 1).to_string(),
                        window.start.to_wire(),
                        window.end.to_wire(),
                        r.sample_count(&interval).to_string(),
                    ]
                })
                .collect()
        }
        None => {
            println!("(relative range; sent to the server as one request)");
            vec![vec![
                "1".to_string(),
                parsed.start.to_wire(),
                parsed.end.to_wire(),
                "?".to_string(),
            ]]
        }
    };

    println!("{}", render_table("Sub-ranges", &columns, &rows));
    println!("sub_ranges: {}", rows.len());
    println!("interval: {interval}");
    Ok(())
}

async fn cmd_attribute(conn: &ConnectionArgs, path: &str) -> CliResult<()> {
    let base_url = conn.base_url.clone().context(MissingBaseUrlSnafu)?;
    let mut config = ClientConfig::new(base_url);
    config.http = http_options(conn);
    let client = PiClient::new(config).context(FetchSnafu)?;

    let info = client.resolve_attribute(path).await.context(FetchSnafu)?;
    println!("path: {}", info.path);
    println!("display_name: {}", info.display_name);
    println!("column_name: {}", info.name);
    println!(
        "unit: {}",
        if info.unit.is_empty() {
            "-"
        } else {
            info.unit.as_str()
        }
    );
    println!("interpolated_data: {}", info.interpolated_link);
    Ok(())
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.cmd {
        Command::Fetch {
            attributes,
            range,
            max_rows,
            output,
            format,
            timing,
        } => {
            let opts = OutputOpts {
                timing,
                max_rows,
                output,
                format: format.into(),
            };
            cmd_fetch(&cli.conn, attributes, range, opts).await
        }

        Command::Plan { range } => cmd_plan(range),

        Command::Attribute { path } => cmd_attribute(&cli.conn, &path).await,
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
