//! Aligned multi-attribute tables.
//!
//! A [`SyncedTable`] has a single timestamp axis and one nullable column per
//! attribute. It is built per sub-range from the fetched series
//! ([`SyncedTable::from_series`]) and the sub-range tables are then stitched
//! together in chronological order ([`SyncedTable::concat`]).
//!
//! Invariant: the timestamp axis is strictly increasing. Concatenation
//! enforces it across sub-range boundaries by dropping any leading rows of a
//! later part that do not come strictly after the rows already accumulated.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
};

use arrow::{
    array::{ArrayRef, Float64Array, RecordBatch, TimestampNanosecondArray},
    datatypes::{DataType, Field, Schema, TimeUnit},
};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use log::debug;
use snafu::prelude::*;

use crate::{
    error::{
        ArrowSnafu, FetchResult, InvalidConfigSnafu, SchemaMismatchSnafu, TimestampOutOfRangeSnafu,
    },
    series::AttributeSeries,
};

/// Name of the timestamp column in Arrow output.
pub const TIMESTAMP_COLUMN: &str = "timestamp";

/// One attribute's values on the shared axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Unique column name (sanitized attribute name, suffixed on collision).
    pub name: String,
    /// Attribute path the column was fetched from.
    pub path: String,
    /// Unit abbreviation; empty when unknown.
    pub unit: String,
    /// `None` where the attribute has no value at that timestamp.
    pub values: Vec<Option<f64>>,
}

/// Multiple attribute series aligned on one timestamp axis.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncedTable {
    timezone: Tz,
    timestamps: Vec<DateTime<Tz>>,
    columns: Vec<Column>,
}

fn unique_names<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    names
        .map(|name| {
            let mut candidate = name.to_string();
            let mut n = 2;
            while seen.contains(&candidate) {
                candidate = format!("{name}_{n}");
                n += 1;
            }
            seen.insert(candidate.clone());
            candidate
        })
        .collect()
}

impl SyncedTable {
    /// Merge series into one table keyed by the union of their timestamps.
    ///
    /// Column order follows `series` order. Attributes without a value at a
    /// given timestamp get `None`.
    pub fn from_series(timezone: Tz, series: Vec<AttributeSeries>) -> Self {
        let mut axis: BTreeMap<DateTime<Utc>, DateTime<Tz>> = BTreeMap::new();
        for s in &series {
            for ts in s.timestamps() {
                axis.entry(ts.with_timezone(&Utc))
                    .or_insert(ts.with_timezone(&timezone));
            }
        }

        let row_of: HashMap<DateTime<Utc>, usize> =
            axis.keys().enumerate().map(|(i, k)| (*k, i)).collect();
        let names = unique_names(series.iter().map(|s| s.name.as_str()));

        let columns = series
            .into_iter()
            .zip(names)
            .map(|(s, name)| {
                let mut values = vec![None; row_of.len()];
                for (ts, v) in s.points {
                    if let Some(&row) = row_of.get(&ts.with_timezone(&Utc)) {
                        values[row] = Some(v);
                    }
                }
                Column {
                    name,
                    path: s.path,
                    unit: s.unit,
                    values,
                }
            })
            .collect();

        Self {
            timezone,
            timestamps: axis.into_values().collect(),
            columns,
        }
    }

    /// Concatenate sub-range tables in the given (chronological) order.
    ///
    /// Rows of a later part that are not strictly after the last row already
    /// accumulated are dropped, so a shared boundary sample appears once.
    /// Parts must have identical column names.
    pub fn concat(parts: Vec<SyncedTable>) -> FetchResult<Self> {
        let mut parts = parts.into_iter();
        let mut out = parts.next().context(InvalidConfigSnafu {
            message: "cannot concatenate zero tables",
        })?;

        for part in parts {
            let expected = out.column_names();
            let actual = part.column_names();
            ensure!(expected == actual, SchemaMismatchSnafu { expected, actual });

            let skip = match out.timestamps.last() {
                Some(last) => part.timestamps.iter().take_while(|ts| *ts <= last).count(),
                None => 0,
            };
            if skip > 0 {
                debug!("dropping {skip} overlapping row(s) at sub-range boundary");
            }

            out.timestamps.extend(part.timestamps.into_iter().skip(skip));
            for (dst, src) in out.columns.iter_mut().zip(part.columns) {
                dst.values.extend(src.values.into_iter().skip(skip));
            }
        }

        Ok(out)
    }

    /// Timezone of the timestamp axis.
    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Number of rows.
    pub fn num_rows(&self) -> usize {
        self.timestamps.len()
    }

    /// Number of attribute columns (the axis is not counted).
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// The shared timestamp axis.
    pub fn timestamps(&self) -> &[DateTime<Tz>] {
        &self.timestamps
    }

    /// All attribute columns, in request order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column names in order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Convert to an Arrow batch: a `timestamp` column (nanoseconds, tagged
    /// with the table's timezone) followed by one nullable `Float64` column
    /// per attribute. Each attribute field carries `unit` and `path`
    /// metadata.
    pub fn to_record_batch(&self) -> FetchResult<RecordBatch> {
        let tz_name: Arc<str> = Arc::from(self.timezone.name());

        let mut fields = Vec::with_capacity(self.columns.len() + 1);
        fields.push(Field::new(
            TIMESTAMP_COLUMN,
            DataType::Timestamp(TimeUnit::Nanosecond, Some(tz_name.clone())),
            false,
        ));
        for c in &self.columns {
            let metadata = HashMap::from([
                ("unit".to_string(), c.unit.clone()),
                ("path".to_string(), c.path.clone()),
            ]);
            fields.push(Field::new(&c.name, DataType::Float64, true).with_metadata(metadata));
        }

        let nanos = self
            .timestamps
            .iter()
            .map(|ts| {
                ts.timestamp_nanos_opt().context(TimestampOutOfRangeSnafu {
                    timestamp: ts.to_rfc3339(),
                })
            })
            .collect::<FetchResult<Vec<i64>>>()?;
        let ts_array = TimestampNanosecondArray::from(nanos).with_timezone(tz_name);

        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(self.columns.len() + 1);
        arrays.push(Arc::new(ts_array));
        for c in &self.columns {
            arrays.push(Arc::new(Float64Array::from(c.values.clone())));
        }

        RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).context(ArrowSnafu)
    }
}
