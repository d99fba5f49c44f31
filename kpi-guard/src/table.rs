//! Time-indexed KPI table backed by an Arrow record batch.
//!
//! A [`KpiTable`] is an ordered set of rows with one designated timestamp
//! column and one or more metric columns. Row order is chronological order and
//! is never changed by this crate. Detectors only ever borrow a table; derived
//! values live in private [`MetricSeries`] copies.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, BooleanArray, Date32Array, Float64Array};
use arrow::compute::{can_cast_types, cast, concat_batches, filter_record_batch};
use arrow::datatypes::{DataType, Date32Type, SchemaRef};
use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use chrono::NaiveDate;
use tracing::{debug, instrument};

use crate::error::{DetectionError, DetectionResult};
use crate::series::MetricSeries;

/// An immutable, chronologically ordered table of KPI observations.
#[derive(Debug, Clone)]
pub struct KpiTable {
    batch: RecordBatch,
    timestamp_column: String,
    timestamp_index: usize,
    dates: Arc<[String]>,
}

impl KpiTable {
    /// Wraps a record batch, designating `timestamp_column` as the date column.
    ///
    /// # Errors
    ///
    /// Fails when the timestamp column is missing, when the batch has no rows,
    /// or when there is no column other than the timestamp column.
    pub fn try_new(
        batch: RecordBatch,
        timestamp_column: impl Into<String>,
    ) -> DetectionResult<Self> {
        let timestamp_column = timestamp_column.into();

        let timestamp_index = batch
            .schema()
            .index_of(&timestamp_column)
            .map_err(|_| DetectionError::MissingTimestampColumn(timestamp_column.clone()))?;

        if batch.num_columns() < 2 {
            return Err(DetectionError::NoMetricColumns(timestamp_column));
        }

        if batch.num_rows() == 0 {
            return Err(DetectionError::EmptyTable);
        }

        let dates = render_dates(batch.column(timestamp_index))?;

        Ok(Self {
            batch,
            timestamp_column,
            timestamp_index,
            dates,
        })
    }

    /// Concatenates batches in the given order and wraps the result.
    pub fn from_batches(
        schema: SchemaRef,
        batches: &[RecordBatch],
        timestamp_column: impl Into<String>,
    ) -> DetectionResult<Self> {
        let batch = concat_batches(&schema, batches)?;
        Self::try_new(batch, timestamp_column)
    }

    /// Returns the name of the timestamp column.
    pub fn timestamp_column(&self) -> &str {
        &self.timestamp_column
    }

    /// Returns the number of rows.
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// Returns the underlying record batch.
    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Returns the names of every metric column, in schema order.
    pub fn metric_columns(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != self.timestamp_index)
            .map(|(_, field)| field.name().clone())
            .collect()
    }

    /// Returns the timestamp of every row rendered as text.
    ///
    /// Null timestamps render as an empty string.
    pub fn dates(&self) -> &[String] {
        &self.dates
    }

    /// Extracts the numeric series for a metric column.
    ///
    /// Cells that cannot be parsed as a number, nulls, NaN and infinities all
    /// become missing values.
    #[instrument(skip(self), fields(rows = self.num_rows()))]
    pub fn series(&self, column: &str) -> DetectionResult<MetricSeries> {
        if column == self.timestamp_column {
            return Err(DetectionError::invalid_data(format!(
                "'{column}' is the timestamp column and carries no metric values"
            )));
        }

        let index = self
            .batch
            .schema()
            .index_of(column)
            .map_err(|_| DetectionError::unknown_column(column))?;
        let array = self.batch.column(index);

        let values = numeric_values(column, array)?;
        let missing = values.iter().filter(|v| v.is_none()).count();
        if missing > 0 {
            debug!(column, missing, "Series contains missing or non-numeric cells");
        }

        Ok(MetricSeries::new(column, values))
    }

    /// Returns a table restricted to the timestamp column and the given KPIs.
    ///
    /// Columns keep the order in which they are requested.
    pub fn select<S: AsRef<str>>(&self, kpis: &[S]) -> DetectionResult<Self> {
        let schema = self.batch.schema();
        let mut indices = vec![self.timestamp_index];
        for kpi in kpis {
            let kpi = kpi.as_ref();
            if kpi == self.timestamp_column {
                continue;
            }
            let index = schema
                .index_of(kpi)
                .map_err(|_| DetectionError::unknown_column(kpi))?;
            if !indices.contains(&index) {
                indices.push(index);
            }
        }

        let batch = self.batch.project(&indices)?;
        Self::try_new(batch, self.timestamp_column.clone())
    }

    /// Returns a zero-copy window of `len` rows starting at `offset`.
    pub fn slice(&self, offset: usize, len: usize) -> DetectionResult<Self> {
        let end = offset.checked_add(len).ok_or_else(|| {
            DetectionError::invalid_config(format!("row window {offset}+{len} overflows"))
        })?;
        if end > self.num_rows() {
            return Err(DetectionError::invalid_config(format!(
                "row window {offset}..{end} exceeds table of {} rows",
                self.num_rows()
            )));
        }

        Self::try_new(self.batch.slice(offset, len), self.timestamp_column.clone())
    }

    /// Keeps the rows whose timestamp falls within `start..=end`.
    ///
    /// The timestamp column is read as calendar days, so text dates such as
    /// `2024-01-31` and Arrow date or timestamp types all work. Rows whose
    /// timestamp is null or unparsable are dropped. A range matching no row
    /// yields [`DetectionError::EmptyTable`].
    #[instrument(skip(self), fields(rows = self.num_rows()))]
    pub fn between_dates(&self, start: NaiveDate, end: NaiveDate) -> DetectionResult<Self> {
        if start > end {
            return Err(DetectionError::invalid_config(format!(
                "date range start {start} is after end {end}"
            )));
        }

        let column = self.batch.column(self.timestamp_index);
        if !can_cast_types(column.data_type(), &DataType::Date32) {
            return Err(DetectionError::invalid_data(format!(
                "timestamp column '{}' of type {} cannot be read as dates",
                self.timestamp_column,
                column.data_type()
            )));
        }

        let casted = cast(column.as_ref(), &DataType::Date32)?;
        let days = casted
            .as_any()
            .downcast_ref::<Date32Array>()
            .ok_or_else(|| DetectionError::invalid_data("Expected Date32 array after cast"))?;

        let (first, last) = (
            Date32Type::from_naive_date(start),
            Date32Type::from_naive_date(end),
        );
        let mask: BooleanArray = days
            .iter()
            .map(|day| day.map(|d| d >= first && d <= last))
            .collect();

        let batch = filter_record_batch(&self.batch, &mask)?;
        debug!(kept = batch.num_rows(), %start, %end, "Applied date range");
        Self::try_new(batch, self.timestamp_column.clone())
    }
}

fn render_dates(array: &ArrayRef) -> DetectionResult<Arc<[String]>> {
    let options = FormatOptions::default();
    let formatter = ArrayFormatter::try_new(array.as_ref(), &options)?;
    Ok((0..array.len())
        .map(|i| formatter.value(i).to_string())
        .collect())
}

fn numeric_values(column: &str, array: &ArrayRef) -> DetectionResult<Vec<Option<f64>>> {
    if !can_cast_types(array.data_type(), &DataType::Float64) {
        return Err(DetectionError::NonNumericColumn {
            column: column.to_string(),
            data_type: array.data_type().to_string(),
        });
    }

    let casted = cast(array.as_ref(), &DataType::Float64)?;
    let floats = casted
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| DetectionError::invalid_data("Expected Float64 array after cast"))?;

    Ok(floats
        .iter()
        .map(|value| value.filter(|v| v.is_finite()))
        .collect())
}
