//! Anomaly detection over KPI tables.
//!
//! Two independent, stateless detectors scan every metric column of a
//! [`KpiTable`](crate::table::KpiTable):
//!
//! - [`PercentChangeDetector`]: flags period-over-period swings where
//!   `|% change| >= threshold` (default 15%).
//! - [`ZScoreDetector`]: flags values where `|z| > threshold` (default 2.0),
//!   using the mean and sample standard deviation of the whole column.
//!
//! Both produce [`AnomalyRecord`]s. [`AnomalyDetectionRunner`] runs them in a
//! fixed order and concatenates their output with [`merge`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use kpi_guard::anomaly::{AnomalyDetectionRunner, detect_percent_change};
//! use kpi_guard::config::DetectionConfig;
//! use kpi_guard::table::KpiTable;
//!
//! let table = KpiTable::try_new(batch, "date")?;
//!
//! // A single detector
//! let swings = detect_percent_change(&table, 15.0)?;
//!
//! // Both detectors, relative-change results first
//! let runner = AnomalyDetectionRunner::from_config(&DetectionConfig::default())?;
//! let report = runner.run(&table)?;
//! for record in &report.records {
//!     println!("{} {} {:?}", record.date, record.kpi, record.detail);
//! }
//! ```

mod detector;
mod percent_change;
mod record;
mod runner;
mod zscore;

pub use detector::KpiDetector;
pub use percent_change::{detect_percent_change, PercentChangeDetector};
pub use record::{AnomalyDetail, AnomalyRecord, DetectionKind};
pub use runner::{merge, AnomalyDetectionRunner, AnomalyDetectionRunnerBuilder, AnomalyReport};
pub use zscore::{detect_zscore, ZScoreDetector};
