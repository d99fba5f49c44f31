//! The detector trait and the column scan shared by all detectors.

use tracing::{debug, warn};

use crate::anomaly::AnomalyRecord;
use crate::error::DetectionResult;
use crate::series::MetricSeries;
use crate::table::KpiTable;

/// Trait for single-pass, stateless anomaly detectors over a [`KpiTable`].
///
/// Implementations must not retain state between calls: running a detector
/// twice on the same table yields the same records in the same order.
pub trait KpiDetector: Send + Sync {
    /// Scans every metric column of `table` and returns the flagged rows,
    /// ordered by column then by row.
    fn detect(&self, table: &KpiTable) -> DetectionResult<Vec<AnomalyRecord>>;

    /// Returns the name of this detection strategy.
    fn name(&self) -> &str;

    /// Returns a description of this detection strategy.
    fn description(&self) -> &str;
}

/// Runs `scan` over every metric column in column order.
///
/// A column that cannot be read as numeric is logged and skipped so that it
/// never aborts detection for the other columns.
pub(crate) fn scan_columns<F>(
    detector: &str,
    table: &KpiTable,
    mut scan: F,
) -> DetectionResult<Vec<AnomalyRecord>>
where
    F: FnMut(&MetricSeries, &[String], &mut Vec<AnomalyRecord>),
{
    let dates = table.dates();
    let mut records = Vec::new();

    for column in table.metric_columns() {
        let series = match table.series(&column) {
            Ok(series) => series,
            Err(e) if e.is_structural() => return Err(e),
            Err(e) => {
                warn!(
                    detector,
                    column = %column,
                    error = %e,
                    "Skipping column that cannot be scanned"
                );
                continue;
            }
        };

        let before = records.len();
        scan(&series, dates, &mut records);
        debug!(
            detector,
            column = %column,
            flagged = records.len() - before,
            "Scanned column"
        );
    }

    Ok(records)
}
