//! Deterministic table builders for tests and benchmarks.
//!
//! Dates are consecutive days starting at 2024-01-01, stored as Arrow
//! `Date32` in a column named `date`.

use std::sync::Arc;

use arrow::array::{ArrayRef, Date32Array, Float64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Days, NaiveDate};

use crate::table::KpiTable;

/// First date of every generated table.
pub fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default()
}

fn date_column(rows: usize) -> ArrayRef {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    let days: Vec<i32> = (0..rows)
        .map(|i| {
            let date = start_date() + Days::new(i as u64);
            (date - epoch).num_days() as i32
        })
        .collect();
    Arc::new(Date32Array::from(days))
}

/// Builds a record batch with a `date` column followed by the given columns.
///
/// All columns must have the same length.
pub fn kpi_batch(columns: &[(&str, Vec<Option<f64>>)]) -> RecordBatch {
    let rows = columns.first().map(|(_, values)| values.len()).unwrap_or(0);

    let mut fields = vec![Field::new("date", DataType::Date32, false)];
    let mut arrays = vec![date_column(rows)];
    for (name, values) in columns {
        fields.push(Field::new(*name, DataType::Float64, true));
        arrays.push(Arc::new(Float64Array::from(values.clone())) as ArrayRef);
    }

    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
        .unwrap_or_else(|e| panic!("invalid test batch: {e}"))
}

/// Builds a [`KpiTable`] with a `date` column followed by the given columns.
pub fn table_from_columns(columns: &[(&str, Vec<Option<f64>>)]) -> KpiTable {
    KpiTable::try_new(kpi_batch(columns), "date")
        .unwrap_or_else(|e| panic!("invalid test table: {e}"))
}

/// Builds a daily KPI table resembling business metrics, with a revenue spike
/// at 50% of the rows and a drop at 75%.
pub fn daily_kpi_table(rows: usize) -> KpiTable {
    let wave = |i: usize, period: f64| ((i as f64) * std::f64::consts::TAU / period).sin();

    let mut revenue: Vec<Option<f64>> = (0..rows)
        .map(|i| Some(10_000.0 + 800.0 * wave(i, 7.0)))
        .collect();
    if rows > 4 {
        revenue[rows / 2] = revenue[rows / 2].map(|v| v + 3_000.0);
        revenue[rows * 3 / 4] = revenue[rows * 3 / 4].map(|v| v - 2_500.0);
    }

    let users = (0..rows)
        .map(|i| Some((3_200.0 + 150.0 * wave(i, 11.0)).round()))
        .collect();
    let bounce_rate = (0..rows)
        .map(|i| Some(45.0 + 3.0 * wave(i, 5.0)))
        .collect();

    table_from_columns(&[
        ("revenue", revenue),
        ("daily_active_users", users),
        ("bounce_rate", bounce_rate),
    ])
}
