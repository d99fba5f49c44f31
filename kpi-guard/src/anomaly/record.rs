//! The anomaly record shared by every detector.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which detector produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionKind {
    /// Period-over-period relative change.
    PercentChange,
    /// Distance from the column mean in standard deviations.
    ZScore,
}

impl fmt::Display for DetectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PercentChange => write!(f, "percent_change"),
            Self::ZScore => write!(f, "z_score"),
        }
    }
}

/// Detector-specific details of a flagged observation.
///
/// Serialized untagged and flattened into [`AnomalyRecord`], so the field
/// names alone identify the shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnomalyDetail {
    /// Relative change against the immediately preceding row.
    PercentChange {
        /// Value of the preceding row.
        previous: f64,
        /// Change in percent, signed.
        change: f64,
    },
    /// Outlier score against the whole column.
    ZScore {
        /// Signed z-score of the flagged value.
        z_score: f64,
    },
}

/// One flagged observation.
///
/// Records have no identity beyond their fields; the same row may be
/// flagged by several detectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    /// Timestamp of the flagged row, as rendered from the timestamp column.
    pub date: String,
    /// Name of the metric column.
    pub kpi: String,
    /// Value at the flagged row.
    pub current: f64,
    /// Detector-specific fields.
    #[serde(flatten)]
    pub detail: AnomalyDetail,
}

impl AnomalyRecord {
    /// Creates a relative-change record.
    pub fn percent_change(
        date: impl Into<String>,
        kpi: impl Into<String>,
        current: f64,
        previous: f64,
        change: f64,
    ) -> Self {
        Self {
            date: date.into(),
            kpi: kpi.into(),
            current,
            detail: AnomalyDetail::PercentChange { previous, change },
        }
    }

    /// Creates a z-score record.
    pub fn z_score(
        date: impl Into<String>,
        kpi: impl Into<String>,
        current: f64,
        z_score: f64,
    ) -> Self {
        Self {
            date: date.into(),
            kpi: kpi.into(),
            current,
            detail: AnomalyDetail::ZScore { z_score },
        }
    }

    /// Returns the detector that produced this record.
    pub fn kind(&self) -> DetectionKind {
        match self.detail {
            AnomalyDetail::PercentChange { .. } => DetectionKind::PercentChange,
            AnomalyDetail::ZScore { .. } => DetectionKind::ZScore,
        }
    }

    /// Returns the previous value for relative-change records.
    pub fn previous(&self) -> Option<f64> {
        match self.detail {
            AnomalyDetail::PercentChange { previous, .. } => Some(previous),
            AnomalyDetail::ZScore { .. } => None,
        }
    }

    /// Returns the percent change for relative-change records.
    pub fn change(&self) -> Option<f64> {
        match self.detail {
            AnomalyDetail::PercentChange { change, .. } => Some(change),
            AnomalyDetail::ZScore { .. } => None,
        }
    }

    /// Returns the z-score for outlier records.
    pub fn z_score_value(&self) -> Option<f64> {
        match self.detail {
            AnomalyDetail::ZScore { z_score } => Some(z_score),
            AnomalyDetail::PercentChange { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_percent_change_serialization_shape() {
        let record = AnomalyRecord::percent_change("2024-01-02", "revenue", 120.0, 100.0, 20.0);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({
                "date": "2024-01-02",
                "kpi": "revenue",
                "current": 120.0,
                "previous": 100.0,
                "change": 20.0
            })
        );
    }

    #[test]
    fn test_z_score_serialization_shape() {
        let record = AnomalyRecord::z_score("2024-01-04", "revenue", 100.0, 1.5);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({
                "date": "2024-01-04",
                "kpi": "revenue",
                "current": 100.0,
                "z_score": 1.5
            })
        );
    }

    #[test]
    fn test_deserialize_picks_detail_from_fields() {
        let record: AnomalyRecord = serde_json::from_value(json!({
            "date": "2024-01-04",
            "kpi": "bounce_rate",
            "current": 60.0,
            "z_score": -2.5
        }))
        .unwrap();
        assert_eq!(record.kind(), DetectionKind::ZScore);
        assert_eq!(record.z_score_value(), Some(-2.5));
        assert_eq!(record.previous(), None);

        let record: AnomalyRecord = serde_json::from_value(json!({
            "date": "2024-01-02",
            "kpi": "revenue",
            "current": 85.0,
            "previous": 100.0,
            "change": -15.0
        }))
        .unwrap();
        assert_eq!(record.kind(), DetectionKind::PercentChange);
        assert_eq!(record.change(), Some(-15.0));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(DetectionKind::PercentChange.to_string(), "percent_change");
        assert_eq!(DetectionKind::ZScore.to_string(), "z_score");
    }
}
