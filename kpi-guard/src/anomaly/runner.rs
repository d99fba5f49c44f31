//! Orchestrates detectors over a table and merges their output.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::anomaly::{
    AnomalyRecord, DetectionKind, KpiDetector, PercentChangeDetector, ZScoreDetector,
};
use crate::config::DetectionConfig;
use crate::error::{DetectionError, DetectionResult};
use crate::table::KpiTable;

/// Concatenates two record lists: every record of `first`, then every record of
/// `second`, each in its original order. Nothing is deduplicated or sorted.
pub fn merge(first: Vec<AnomalyRecord>, second: Vec<AnomalyRecord>) -> Vec<AnomalyRecord> {
    let mut merged = first;
    merged.extend(second);
    merged
}

/// Output of a detection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    /// When the run finished.
    pub generated_at: DateTime<Utc>,
    /// Number of rows scanned.
    pub table_rows: usize,
    /// Flagged observations, grouped by detector in registration order.
    pub records: Vec<AnomalyRecord>,
}

impl AnomalyReport {
    fn new(table_rows: usize, records: Vec<AnomalyRecord>) -> Self {
        Self {
            generated_at: Utc::now(),
            table_rows,
            records,
        }
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if nothing was flagged.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Groups records by KPI name, keeping merged order within each group.
    pub fn by_kpi(&self) -> BTreeMap<&str, Vec<&AnomalyRecord>> {
        let mut groups: BTreeMap<&str, Vec<&AnomalyRecord>> = BTreeMap::new();
        for record in &self.records {
            groups.entry(record.kpi.as_str()).or_default().push(record);
        }
        groups
    }

    /// Counts records per detector kind.
    pub fn count_by_kind(&self) -> BTreeMap<DetectionKind, usize> {
        let mut counts = BTreeMap::new();
        for record in &self.records {
            *counts.entry(record.kind()).or_insert(0) += 1;
        }
        counts
    }

    /// Serializes the report as pretty-printed JSON.
    pub fn to_json(&self) -> DetectionResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Runs an ordered list of detectors over a table.
///
/// Detector output is concatenated in registration order. The default
/// configuration registers the relative-change detector first and the
/// z-score detector second, which is the order downstream reporting expects.
#[derive(Clone)]
pub struct AnomalyDetectionRunner {
    detectors: Vec<Arc<dyn KpiDetector>>,
    timestamp_column: Option<String>,
    kpi_columns: Option<Vec<String>>,
}

impl std::fmt::Debug for AnomalyDetectionRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnomalyDetectionRunner")
            .field(
                "detectors",
                &self.detectors.iter().map(|d| d.name()).collect::<Vec<_>>(),
            )
            .field("timestamp_column", &self.timestamp_column)
            .field("kpi_columns", &self.kpi_columns)
            .finish()
    }
}

impl AnomalyDetectionRunner {
    /// Creates a new builder for the anomaly detection runner.
    pub fn builder() -> AnomalyDetectionRunnerBuilder {
        AnomalyDetectionRunnerBuilder::default()
    }

    /// Builds the standard two-detector runner from a configuration.
    ///
    /// Tables keep their own timestamp designation unless the configuration
    /// names a different column.
    pub fn from_config(config: &DetectionConfig) -> DetectionResult<Self> {
        config.validate()?;
        Self::builder()
            .config(config.clone())
            .add_detector(PercentChangeDetector::new(config.percent_change_threshold)?)
            .add_detector(ZScoreDetector::new(config.zscore_threshold)?)
            .build()
    }

    /// Returns the names of the registered detectors, in run order.
    pub fn detector_names(&self) -> Vec<&str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    /// Applies the configured timestamp designation and KPI selection.
    fn prepare(&self, table: &KpiTable) -> DetectionResult<KpiTable> {
        let table = match &self.timestamp_column {
            Some(column) if column != table.timestamp_column() => {
                KpiTable::try_new(table.batch().clone(), column.clone())?
            }
            _ => table.clone(),
        };

        match &self.kpi_columns {
            Some(columns) => table.select(columns.as_slice()),
            None => Ok(table),
        }
    }

    /// Runs every detector in order and concatenates the results.
    #[instrument(skip(self, table), fields(detectors = self.detectors.len()))]
    pub fn run(&self, table: &KpiTable) -> DetectionResult<AnomalyReport> {
        let table = self.prepare(table)?;

        let mut records = Vec::new();
        for detector in &self.detectors {
            let found = detector.detect(&table)?;
            debug!(
                detector = detector.name(),
                flagged = found.len(),
                "Detector finished"
            );
            records = merge(records, found);
        }

        info!(
            rows = table.num_rows(),
            anomalies = records.len(),
            "Anomaly detection complete"
        );
        Ok(AnomalyReport::new(table.num_rows(), records))
    }

    /// Runs every detector on its own blocking task.
    ///
    /// Detectors share the table read-only. Results are concatenated in
    /// registration order no matter which task finishes first.
    #[instrument(skip(self, table), fields(detectors = self.detectors.len()))]
    pub async fn run_concurrent(&self, table: Arc<KpiTable>) -> DetectionResult<AnomalyReport> {
        let table = Arc::new(self.prepare(&table)?);

        let tasks = self.detectors.iter().map(|detector| {
            let detector = Arc::clone(detector);
            let table = Arc::clone(&table);
            tokio::task::spawn_blocking(move || detector.detect(&table))
        });

        let mut records = Vec::new();
        for joined in join_all(tasks).await {
            let found = joined.map_err(|e| DetectionError::TaskFailed(e.to_string()))??;
            records = merge(records, found);
        }

        info!(
            rows = table.num_rows(),
            anomalies = records.len(),
            "Concurrent anomaly detection complete"
        );
        Ok(AnomalyReport::new(table.num_rows(), records))
    }
}

/// Builder for AnomalyDetectionRunner.
#[derive(Default)]
pub struct AnomalyDetectionRunnerBuilder {
    detectors: Vec<Arc<dyn KpiDetector>>,
    config: Option<DetectionConfig>,
}

impl AnomalyDetectionRunnerBuilder {
    /// Appends a detector. Detectors run, and their output is merged, in the
    /// order they are added.
    pub fn add_detector(mut self, detector: impl KpiDetector + 'static) -> Self {
        self.detectors.push(Arc::new(detector));
        self
    }

    /// Sets the configuration supplying the timestamp column and KPI selection.
    pub fn config(mut self, config: DetectionConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Builds the AnomalyDetectionRunner.
    pub fn build(self) -> DetectionResult<AnomalyDetectionRunner> {
        if self.detectors.is_empty() {
            return Err(DetectionError::invalid_config(
                "at least one detector is required",
            ));
        }

        let (timestamp_column, kpi_columns) = match self.config {
            Some(config) => {
                config.validate()?;
                (config.timestamp_column, config.kpi_columns)
            }
            None => (None, None),
        };

        Ok(AnomalyDetectionRunner {
            detectors: self.detectors,
            timestamp_column,
            kpi_columns,
        })
    }
}
