//! Detection configuration.
//!
//! The configuration is a plain value: this crate reads no environment
//! variables and no files. Embedding applications deserialize it from
//! whatever source they use.

use serde::{Deserialize, Serialize};

use crate::error::{DetectionError, DetectionResult};

/// Default relative-change threshold, in percent.
pub const DEFAULT_PERCENT_CHANGE_THRESHOLD: f64 = 15.0;

/// Default z-score threshold, in standard deviations.
pub const DEFAULT_ZSCORE_THRESHOLD: f64 = 2.0;

/// Configuration for a detection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Re-designates the timestamp column before detection.
    /// `None` keeps the designation the table was built with.
    pub timestamp_column: Option<String>,

    /// Flag when `|% change| >= percent_change_threshold`.
    pub percent_change_threshold: f64,

    /// Flag when `|z| > zscore_threshold`.
    pub zscore_threshold: f64,

    /// Restrict detection to these KPI columns, in this order.
    /// `None` scans every metric column.
    pub kpi_columns: Option<Vec<String>>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            timestamp_column: None,
            percent_change_threshold: DEFAULT_PERCENT_CHANGE_THRESHOLD,
            zscore_threshold: DEFAULT_ZSCORE_THRESHOLD,
            kpi_columns: None,
        }
    }
}

impl DetectionConfig {
    /// Overrides the timestamp column designated by the table.
    pub fn with_timestamp_column(mut self, column: impl Into<String>) -> Self {
        self.timestamp_column = Some(column.into());
        self
    }

    /// Sets the relative-change threshold in percent.
    pub fn with_percent_change_threshold(mut self, threshold: f64) -> Self {
        self.percent_change_threshold = threshold;
        self
    }

    /// Sets the z-score threshold in standard deviations.
    pub fn with_zscore_threshold(mut self, threshold: f64) -> Self {
        self.zscore_threshold = threshold;
        self
    }

    /// Restricts detection to the given KPI columns.
    pub fn with_kpi_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.kpi_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Checks that every field holds a usable value.
    pub fn validate(&self) -> DetectionResult<()> {
        if matches!(&self.timestamp_column, Some(column) if column.trim().is_empty()) {
            return Err(DetectionError::invalid_config(
                "timestamp_column must not be empty",
            ));
        }

        let pct = self.percent_change_threshold;
        if !pct.is_finite() || pct < 0.0 {
            return Err(DetectionError::invalid_config(format!(
                "percent_change_threshold must be finite and non-negative, got: {pct}"
            )));
        }

        let z = self.zscore_threshold;
        if !z.is_finite() || z <= 0.0 {
            return Err(DetectionError::invalid_config(format!(
                "zscore_threshold must be finite and positive, got: {z}"
            )));
        }

        if let Some(columns) = &self.kpi_columns {
            if columns.is_empty() {
                return Err(DetectionError::invalid_config(
                    "kpi_columns must name at least one column when set",
                ));
            }
        }

        Ok(())
    }

    /// Parses and validates a JSON configuration. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> DetectionResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DetectionConfig::default();
        assert!(config.timestamp_column.is_none());
        assert_eq!(config.percent_change_threshold, 15.0);
        assert_eq!(config.zscore_threshold, 2.0);
        assert!(config.kpi_columns.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_setters() {
        let config = DetectionConfig::default()
            .with_timestamp_column("day")
            .with_percent_change_threshold(25.0)
            .with_zscore_threshold(3.0)
            .with_kpi_columns(["revenue", "bounce_rate"]);
        assert_eq!(config.timestamp_column.as_deref(), Some("day"));
        assert_eq!(config.percent_change_threshold, 25.0);
        assert_eq!(config.zscore_threshold, 3.0);
        assert_eq!(
            config.kpi_columns,
            Some(vec!["revenue".to_string(), "bounce_rate".to_string()])
        );
    }

    #[test]
    fn test_validation_failures() {
        let bad = [
            DetectionConfig::default().with_timestamp_column(" "),
            DetectionConfig::default().with_percent_change_threshold(-0.1),
            DetectionConfig::default().with_percent_change_threshold(f64::NAN),
            DetectionConfig::default().with_zscore_threshold(0.0),
            DetectionConfig::default().with_zscore_threshold(f64::INFINITY),
            DetectionConfig::default().with_kpi_columns(Vec::<String>::new()),
        ];
        for config in bad {
            assert!(config.validate().is_err(), "{config:?} should be rejected");
        }

        // Zero is a legal relative-change threshold.
        assert!(DetectionConfig::default()
            .with_percent_change_threshold(0.0)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        let config = DetectionConfig::from_json_str(r#"{"zscore_threshold": 3.0}"#).unwrap();
        assert_eq!(config.zscore_threshold, 3.0);
        assert_eq!(config.percent_change_threshold, 15.0);
        assert!(config.timestamp_column.is_none());

        let config =
            DetectionConfig::from_json_str(r#"{"timestamp_column": "week"}"#).unwrap();
        assert_eq!(config.timestamp_column.as_deref(), Some("week"));

        let err = DetectionConfig::from_json_str(r#"{"zscore_threshold": -1.0}"#).unwrap_err();
        assert!(matches!(err, DetectionError::InvalidConfiguration(_)));

        let err = DetectionConfig::from_json_str("{").unwrap_err();
        assert!(matches!(err, DetectionError::Serialization(_)));
    }
}
