//! Error types for KPI anomaly detection.
//!
//! Only structural problems with a table (or an invalid configuration) are
//! surfaced as errors. Degenerate columns and unusable cells are skipped by the
//! detectors and never abort a scan.

use thiserror::Error;

/// Result type for detection operations.
pub type DetectionResult<T> = Result<T, DetectionError>;

/// Errors that can occur while building tables or running detection.
#[derive(Error, Debug)]
pub enum DetectionError {
    /// The designated timestamp column does not exist in the table.
    #[error("Timestamp column '{0}' not found in table")]
    MissingTimestampColumn(String),

    /// The table has no columns besides the timestamp column.
    #[error("Table has no metric columns besides timestamp column '{0}'")]
    NoMetricColumns(String),

    /// The table has no rows.
    #[error("Table has no rows")]
    EmptyTable,

    /// A requested column does not exist.
    #[error("Column '{0}' not found in table")]
    UnknownColumn(String),

    /// A column cannot be interpreted as numeric values.
    #[error("Column '{column}' of type {data_type} cannot be read as numeric")]
    NonNumericColumn {
        /// Name of the offending column.
        column: String,
        /// Arrow type of the column, rendered for display.
        data_type: String,
    },

    /// Invalid configuration or parameters.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Data is malformed in a way that prevents building a table.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Arrow computation error.
    #[error("Arrow computation failed: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// DataFusion query execution error.
    #[error("Query execution failed: {0}")]
    QueryExecution(#[from] datafusion::error::DataFusionError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A detection task could not be joined.
    #[error("Detection task failed: {0}")]
    TaskFailed(String),
}

impl DetectionError {
    /// Creates an invalid configuration error with the given message.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Creates an invalid data error with the given message.
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }

    /// Creates an unknown column error.
    pub fn unknown_column(column: impl Into<String>) -> Self {
        Self::UnknownColumn(column.into())
    }

    /// Returns true for errors describing the shape of the input table.
    ///
    /// These are the only errors a detector lets escape a scan.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::MissingTimestampColumn(_) | Self::NoMetricColumns(_) | Self::EmptyTable
        )
    }
}

/// Converts serde_json errors to DetectionError.
impl From<serde_json::Error> for DetectionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
