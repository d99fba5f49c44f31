//! Prelude for commonly used types and traits in kpi-guard.

pub use crate::anomaly::{
    detect_percent_change, detect_zscore, merge, AnomalyDetail, AnomalyDetectionRunner,
    AnomalyRecord, AnomalyReport, DetectionKind, KpiDetector, PercentChangeDetector,
    ZScoreDetector,
};
pub use crate::config::DetectionConfig;
pub use crate::error::{DetectionError, DetectionResult};
pub use crate::sources::{BatchSource, SessionTableSource, TableSource};
pub use crate::table::KpiTable;
