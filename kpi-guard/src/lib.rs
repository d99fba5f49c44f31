//! # kpi-guard - KPI anomaly detection for Rust
//!
//! kpi-guard flags abnormal observations in a time-indexed table of business
//! metrics. Tables are Apache Arrow record batches with one designated
//! timestamp column; every other column is treated as a KPI.
//!
//! ## Detectors
//!
//! - **Relative change**: `(v[i] - v[i-1]) / v[i-1] * 100`, flagged when the
//!   magnitude reaches the threshold (inclusive, default 15%).
//! - **Z-score**: `(v[i] - mean) / std` over the whole column with the sample
//!   standard deviation, flagged when the magnitude exceeds the threshold
//!   (exclusive, default 2.0).
//!
//! Both are single-pass and stateless. They never modify the input table and
//! skip, rather than fail on, zero baselines, zero variance and unparsable
//! cells. Only a structurally invalid table is an error.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use arrow::array::{Float64Array, StringArray};
//! use arrow::datatypes::{DataType, Field, Schema};
//! use arrow::record_batch::RecordBatch;
//! use kpi_guard::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let schema = Arc::new(Schema::new(vec![
//!     Field::new("date", DataType::Utf8, false),
//!     Field::new("revenue", DataType::Float64, true),
//! ]));
//! let batch = RecordBatch::try_new(
//!     schema,
//!     vec![
//!         Arc::new(StringArray::from(vec!["2024-01-01", "2024-01-02"])),
//!         Arc::new(Float64Array::from(vec![100.0, 120.0])),
//!     ],
//! )?;
//!
//! let table = KpiTable::try_new(batch, "date")?;
//! let report = AnomalyDetectionRunner::from_config(&DetectionConfig::default())?.run(&table)?;
//!
//! assert_eq!(report.records.len(), 1);
//! assert_eq!(report.records[0].change(), Some(20.0));
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **`table`**: [`KpiTable`](table::KpiTable), the read-only input
//! - **`series`**: per-column numeric extraction and statistics
//! - **`anomaly`**: detectors, the anomaly record, merging and the runner
//! - **`sources`**: adapters from DataFusion sessions and in-memory batches
//! - **`config`**: thresholds, timestamp column and KPI selection
//! - **`logging`**: optional `tracing-subscriber` setup

pub mod anomaly;
pub mod config;
pub mod error;
pub mod logging;
pub mod prelude;
pub mod series;
pub mod sources;
pub mod table;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
