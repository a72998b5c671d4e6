use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use arrow::{
    array::RecordBatch,
    error::ArrowError,
    util::display::{ArrayFormatter, FormatOptions},
};
use snafu::ResultExt;
use tabled::{
    builder::Builder,
    settings::{Style, object::Rows, style::LineText, width::MinWidth},
};

use crate::error::{ArrowSnafu, CliResult, CreateOutputSnafu, WriteOutputSnafu};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Jsonl,
}

#[derive(Debug, Clone)]
pub struct OutputOpts {
    pub timing: bool,
    pub max_rows: usize,
    pub output: Option<PathBuf>,
    pub format: OutputFormat,
}

#[derive(Debug, Clone)]
pub struct TableOutput {
    pub columns: Vec<String>,
    pub preview_rows: Vec<Vec<String>>,
    pub total_rows: u64,
    /// Number of leaf requests the fetch was split into.
    pub sub_ranges: Option<usize>,
    pub elapsed: Option<Duration>,
}

impl TableOutput {
    /// Summarize `batch`, formatting at most `max_rows` rows for preview.
    pub fn from_batch(
        batch: &RecordBatch,
        max_rows: usize,
        elapsed: Option<Duration>,
    ) -> CliResult<Self> {
        let columns = batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().to_string())
            .collect();

        Ok(Self {
            columns,
            preview_rows: preview_rows(batch, max_rows)?,
            total_rows: batch.num_rows() as u64,
            sub_ranges: None,
            elapsed,
        })
    }
}

fn preview_rows(batch: &RecordBatch, max_rows: usize) -> CliResult<Vec<Vec<String>>> {
    let options = FormatOptions::default().with_null("-");
    let formatters = batch
        .columns()
        .iter()
        .map(|col| ArrayFormatter::try_new(col.as_ref(), &options))
        .collect::<Result<Vec<_>, ArrowError>>()
        .context(ArrowSnafu)?;

    let rows_to_take = max_rows.min(batch.num_rows());
    let mut rows = Vec::with_capacity(rows_to_take);
    for row_idx in 0..rows_to_take {
        let mut row = Vec::with_capacity(formatters.len());
        for formatter in &formatters {
            row.push(
                formatter
                    .value(row_idx)
                    .try_to_string()
                    .context(ArrowSnafu)?,
            );
        }
        rows.push(row);
    }
    Ok(rows)
}

pub fn render_table(label: &str, columns: &[String], rows: &[Vec<String>]) -> String {
    if columns.is_empty() {
        return String::new();
    }

    const LABEL_OFFSET: usize = 6;
    let min_width = LABEL_OFFSET + label.len() + 4;

    let mut builder = Builder::default();
    builder.push_record(columns);
    for row in rows {
        builder.push_record(row);
    }

    let mut table = builder.build();

    table.with(Style::rounded());
    table.with(MinWidth::new(min_width));
    table.with(LineText::new(label, Rows::first()).offset(LABEL_OFFSET));
    // LineText re-estimates dimensions, so re-apply MinWidth afterwards.
    table.with(MinWidth::new(min_width));
    table.to_string()
}

fn render_preview(res: &TableOutput, opts: &OutputOpts) -> Option<String> {
    const PREVIEW_LABEL: &str = "Preview output";

    if !res.preview_rows.is_empty() {
        return Some(render_table(PREVIEW_LABEL, &res.columns, &res.preview_rows));
    }

    if opts.max_rows == 0 && !res.columns.is_empty() {
        return Some(render_table(PREVIEW_LABEL, &res.columns, &[]));
    }

    None
}

fn preview_message(res: &TableOutput, opts: &OutputOpts) -> Option<String> {
    if opts.max_rows == 0 && res.total_rows > 0 {
        return Some("(preview suppressed; use --max-rows > 0)".to_string());
    }

    if res.total_rows == 0 {
        return Some("(no rows)".to_string());
    }

    None
}

pub fn write_summary<W: Write>(res: &TableOutput, opts: &OutputOpts, out: &mut W) -> CliResult<()> {
    writeln!(out, "total_rows: {}", res.total_rows).context(WriteOutputSnafu)?;

    if let Some(n) = res.sub_ranges {
        writeln!(out, "sub_ranges: {n}").context(WriteOutputSnafu)?;
    }

    if let Some(d) = res.elapsed {
        writeln!(out, "elapsed_ms: {}", d.as_millis()).context(WriteOutputSnafu)?;
    }

    if let Some(path) = &opts.output {
        writeln!(out, "wrote: {} ({:?})", path.display(), opts.format)
            .context(WriteOutputSnafu)?;
    }

    Ok(())
}

pub fn write_table_output<W: Write>(
    res: &TableOutput,
    opts: &OutputOpts,
    out: &mut W,
) -> CliResult<()> {
    if let Some(rendered) = render_preview(res, opts) {
        writeln!(out, "{rendered}").context(WriteOutputSnafu)?;
    }

    if let Some(message) = preview_message(res, opts) {
        writeln!(out, "{message}").context(WriteOutputSnafu)?;
    }

    write_summary(res, opts, out)
}

pub fn print_table_output(res: &TableOutput, opts: &OutputOpts) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    write_table_output(res, opts, &mut stdout)
}

/// Write the whole batch to `path` as CSV (with header) or JSON lines.
pub fn write_batch_file(path: &Path, format: OutputFormat, batch: &RecordBatch) -> CliResult<()> {
    let file = File::create(path).context(CreateOutputSnafu {
        path: path.display().to_string(),
    })?;
    let writer = BufWriter::new(file);

    match format {
        OutputFormat::Csv => {
            let mut w = arrow_csv::WriterBuilder::new().build(writer);
            w.write(batch).context(ArrowSnafu)?;
            w.into_inner().flush().context(WriteOutputSnafu)
        }
        OutputFormat::Jsonl => {
            let mut w = arrow_json::LineDelimitedWriter::new(writer);
            w.write_batches(&[batch]).context(ArrowSnafu)?;
            w.finish().context(ArrowSnafu)?;
            w.into_inner().flush().context(WriteOutputSnafu)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use arrow::array::{Float64Array, TimestampNanosecondArray};
    use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
    use tempfile::TempDir;

    type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

    fn sample_batch() -> TestResult<RecordBatch> {
        let tz: Arc<str> = Arc::from("Europe/Stockholm");
        let schema = Schema::new(vec![
            Field::new(
                "timestamp",
                DataType::Timestamp(TimeUnit::Nanosecond, Some(tz.clone())),
                false,
            ),
            Field::new("Flow", DataType::Float64, true),
        ]);
        // 2023-08-29T22:00:00Z and one hour later.
        let ts = TimestampNanosecondArray::from(vec![
            1_693_346_400_000_000_000,
            1_693_350_000_000_000_000,
        ])
        .with_timezone(tz);
        let values = Float64Array::from(vec![Some(1.5), None]);
        Ok(RecordBatch::try_new(
            Arc::new(schema),
            vec![Arc::new(ts), Arc::new(values)],
        )?)
    }

    fn opts(max_rows: usize) -> OutputOpts {
        OutputOpts {
            timing: false,
            max_rows,
            output: None,
            format: OutputFormat::Csv,
        }
    }

    #[test]
    fn render_table_aligns_columns() {
        let columns = vec!["col1".to_string(), "longer".to_string()];
        let rows = vec![
            vec!["a".to_string(), "value".to_string()],
            vec!["bb".to_string(), "x".to_string()],
        ];

        let rendered = render_table("Preview output", &columns, &rows);
        assert!(rendered.contains("col1"));
        assert!(rendered.contains("longer"));
        assert!(rendered.contains("Preview output"));
    }

    #[test]
    fn preview_uses_local_time_and_marks_nulls() -> TestResult {
        let batch = sample_batch()?;
        let res = TableOutput::from_batch(&batch, 10, None)?;
        assert_eq!(res.total_rows, 2);
        assert_eq!(res.columns, vec!["timestamp", "Flow"]);
        assert!(res.preview_rows[0][0].starts_with("2023-08-30T00:00:00"));
        assert_eq!(res.preview_rows[0][1], "1.5");
        assert_eq!(res.preview_rows[1][1], "-");
        Ok(())
    }

    #[test]
    fn preview_is_capped_and_suppressible() -> TestResult {
        let batch = sample_batch()?;
        let res = TableOutput::from_batch(&batch, 1, None)?;
        assert_eq!(res.preview_rows.len(), 1);

        let res = TableOutput::from_batch(&batch, 0, None)?;
        let mut buf = Vec::new();
        write_table_output(&res, &opts(0), &mut buf)?;
        let text = String::from_utf8(buf)?;
        assert!(text.contains("(preview suppressed; use --max-rows > 0)"));
        assert!(text.contains("total_rows: 2"));
        Ok(())
    }

    #[test]
    fn summary_reports_timing_and_output() -> TestResult {
        let res = TableOutput {
            columns: vec![],
            preview_rows: vec![],
            total_rows: 0,
            sub_ranges: Some(3),
            elapsed: Some(Duration::from_millis(42)),
        };
        let mut o = opts(10);
        o.output = Some(PathBuf::from("out.csv"));
        let mut buf = Vec::new();
        write_table_output(&res, &o, &mut buf)?;
        let text = String::from_utf8(buf)?;
        assert!(text.contains("(no rows)"));
        assert!(text.contains("sub_ranges: 3"));
        assert!(text.contains("elapsed_ms: 42"));
        assert!(text.contains("wrote: out.csv (Csv)"));
        Ok(())
    }

    #[test]
    fn writes_csv_and_jsonl() -> TestResult {
        let tmp = TempDir::new()?;
        let batch = sample_batch()?;

        let csv_path = tmp.path().join("out.csv");
        write_batch_file(&csv_path, OutputFormat::Csv, &batch)?;
        let csv = std::fs::read_to_string(&csv_path)?;
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "timestamp,Flow");

        let jsonl_path = tmp.path().join("out.jsonl");
        write_batch_file(&jsonl_path, OutputFormat::Jsonl, &batch)?;
        let jsonl = std::fs::read_to_string(&jsonl_path)?;
        assert_eq!(jsonl.lines().count(), 2);
        assert!(jsonl.contains("\"Flow\":1.5"));
        Ok(())
    }
}
