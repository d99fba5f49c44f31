//! Statistical outlier detection using a global z-score per column.

use tracing::{debug, info, instrument};

use crate::anomaly::detector::{scan_columns, KpiDetector};
use crate::anomaly::AnomalyRecord;
use crate::config::DEFAULT_ZSCORE_THRESHOLD;
use crate::error::{DetectionError, DetectionResult};
use crate::series::MetricSeries;
use crate::table::KpiTable;

/// Flags values lying more than `threshold_sigma` standard deviations from
/// their column's mean.
///
/// Mean and sample standard deviation are computed once over every present
/// value of the column, not over a rolling window, so a single early extreme
/// value influences the scores of the whole column. The comparison is strict:
/// a z-score exactly equal to the threshold is not flagged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZScoreDetector {
    threshold_sigma: f64,
}

impl ZScoreDetector {
    /// Creates a detector with the given threshold in standard deviations.
    ///
    /// # Errors
    /// Returns an error if the threshold is not finite or not positive.
    pub fn new(threshold_sigma: f64) -> DetectionResult<Self> {
        if !threshold_sigma.is_finite() || threshold_sigma <= 0.0 {
            return Err(DetectionError::invalid_config(format!(
                "z-score threshold must be finite and positive, got: {threshold_sigma}"
            )));
        }
        Ok(Self { threshold_sigma })
    }

    /// Returns the threshold in standard deviations.
    pub fn threshold_sigma(&self) -> f64 {
        self.threshold_sigma
    }

    fn scan(&self, series: &MetricSeries, dates: &[String], out: &mut Vec<AnomalyRecord>) {
        let stats = series.stats();
        let (mean, std_dev) = match (stats.mean, stats.std_dev) {
            (Some(mean), Some(std_dev)) => (mean, std_dev),
            _ => {
                debug!(
                    column = series.name(),
                    present = stats.count,
                    "Fewer than two values, z-score undefined"
                );
                return;
            }
        };

        // Identical values can leave rounding noise in the mean, so compare
        // the values themselves rather than the computed deviation.
        if is_constant(series) || std_dev == 0.0 || !std_dev.is_finite() {
            debug!(column = series.name(), mean, "Zero variance, column skipped");
            return;
        }

        for (row, value) in series.present() {
            let z = (value - mean) / std_dev;
            if z.abs() > self.threshold_sigma {
                out.push(AnomalyRecord::z_score(
                    dates[row].clone(),
                    series.name(),
                    value,
                    z,
                ));
            }
        }
    }
}

fn is_constant(series: &MetricSeries) -> bool {
    let mut values = series.present().map(|(_, v)| v);
    match values.next() {
        Some(first) => values.all(|v| v == first),
        None => true,
    }
}

impl Default for ZScoreDetector {
    fn default() -> Self {
        Self {
            threshold_sigma: DEFAULT_ZSCORE_THRESHOLD,
        }
    }
}

impl KpiDetector for ZScoreDetector {
    #[instrument(skip(self, table), fields(threshold = self.threshold_sigma, rows = table.num_rows()))]
    fn detect(&self, table: &KpiTable) -> DetectionResult<Vec<AnomalyRecord>> {
        let records = scan_columns(self.name(), table, |series, dates, out| {
            self.scan(series, dates, out)
        })?;
        info!(flagged = records.len(), "Z-score detection complete");
        Ok(records)
    }

    fn name(&self) -> &str {
        "ZScore"
    }

    fn description(&self) -> &str {
        "Flags values beyond a number of standard deviations from the column mean"
    }
}

/// Flags every value whose z-score magnitude exceeds `threshold_sigma`.
pub fn detect_zscore(
    table: &KpiTable,
    threshold_sigma: f64,
) -> DetectionResult<Vec<AnomalyRecord>> {
    ZScoreDetector::new(threshold_sigma)?.detect(table)
}
