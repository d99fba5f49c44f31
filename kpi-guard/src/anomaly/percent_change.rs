//! Relative-change detection between consecutive rows.

use tracing::{info, instrument, trace};

use crate::anomaly::detector::{scan_columns, KpiDetector};
use crate::anomaly::AnomalyRecord;
use crate::config::DEFAULT_PERCENT_CHANGE_THRESHOLD;
use crate::error::{DetectionError, DetectionResult};
use crate::series::MetricSeries;
use crate::table::KpiTable;

/// Flags period-over-period swings whose magnitude reaches a threshold.
///
/// For row `i >= 1` the change is `(v[i] - v[i-1]) / v[i-1] * 100` and the row
/// is flagged when `|change| >= threshold_percent`. Row 0 is never evaluated.
/// Rows are skipped when either value is missing, when the previous value is
/// exactly zero, or when the change is not finite. Missing values are not
/// filled from earlier rows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PercentChangeDetector {
    threshold_percent: f64,
}

impl PercentChangeDetector {
    /// Creates a detector flagging changes of at least `threshold_percent`.
    ///
    /// # Errors
    /// Returns an error if the threshold is not finite or is negative.
    pub fn new(threshold_percent: f64) -> DetectionResult<Self> {
        if !threshold_percent.is_finite() || threshold_percent < 0.0 {
            return Err(DetectionError::invalid_config(format!(
                "percent change threshold must be finite and non-negative, got: {threshold_percent}"
            )));
        }
        Ok(Self { threshold_percent })
    }

    /// Returns the threshold in percent.
    pub fn threshold_percent(&self) -> f64 {
        self.threshold_percent
    }

    fn scan(&self, series: &MetricSeries, dates: &[String], out: &mut Vec<AnomalyRecord>) {
        for (row, pair) in series.values().windows(2).enumerate() {
            let row = row + 1;
            let (previous, current) = match (pair[0], pair[1]) {
                (Some(previous), Some(current)) => (previous, current),
                _ => continue,
            };

            if previous == 0.0 {
                trace!(
                    column = series.name(),
                    row,
                    "Previous value is zero, change undefined"
                );
                continue;
            }

            let change = (current - previous) / previous * 100.0;
            if !change.is_finite() {
                continue;
            }

            if change.abs() >= self.threshold_percent {
                out.push(AnomalyRecord::percent_change(
                    dates[row].clone(),
                    series.name(),
                    current,
                    previous,
                    change,
                ));
            }
        }
    }
}

impl Default for PercentChangeDetector {
    fn default() -> Self {
        Self {
            threshold_percent: DEFAULT_PERCENT_CHANGE_THRESHOLD,
        }
    }
}

impl KpiDetector for PercentChangeDetector {
    #[instrument(skip(self, table), fields(threshold = self.threshold_percent, rows = table.num_rows()))]
    fn detect(&self, table: &KpiTable) -> DetectionResult<Vec<AnomalyRecord>> {
        let records = scan_columns(self.name(), table, |series, dates, out| {
            self.scan(series, dates, out)
        })?;
        info!(flagged = records.len(), "Relative change detection complete");
        Ok(records)
    }

    fn name(&self) -> &str {
        "PercentChange"
    }

    fn description(&self) -> &str {
        "Flags period-over-period percentage changes at or beyond a threshold"
    }
}

/// Flags every row whose change from the previous row is at least
/// `threshold_percent` in magnitude.
pub fn detect_percent_change(
    table: &KpiTable,
    threshold_percent: f64,
) -> DetectionResult<Vec<AnomalyRecord>> {
    PercentChangeDetector::new(threshold_percent)?.detect(table)
}
