//! Adapters that hand tables to the detectors.
//!
//! Parsing files is the caller's concern. A caller either materializes Arrow
//! record batches itself ([`BatchSource`]) or registers its data with a
//! DataFusion [`SessionContext`] by any means DataFusion supports and points a
//! [`SessionTableSource`] at the registered table.

use std::fmt::Debug;

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use datafusion::prelude::SessionContext;
use tracing::{debug, instrument};

use crate::error::DetectionResult;
use crate::table::KpiTable;

/// A source that can produce a [`KpiTable`].
///
/// # Examples
///
/// ```rust,ignore
/// use kpi_guard::sources::{SessionTableSource, TableSource};
/// use datafusion::prelude::*;
///
/// # async fn example() -> kpi_guard::error::DetectionResult<()> {
/// let ctx = SessionContext::new();
/// ctx.register_csv("kpis", "data/kpis.csv", CsvReadOptions::new()).await?;
///
/// let table = SessionTableSource::new(ctx, "kpis", "date").load().await?;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait TableSource: Debug + Send + Sync {
    /// Loads the data and validates it as a KPI table.
    async fn load(&self) -> DetectionResult<KpiTable>;

    /// Returns a human-readable description of this source.
    fn description(&self) -> String;
}

/// Reads a table registered in a DataFusion session.
///
/// Rows keep the order in which the scan produces them, partition by
/// partition. Nothing is re-sorted.
#[derive(Clone)]
pub struct SessionTableSource {
    ctx: SessionContext,
    table_name: String,
    timestamp_column: String,
}

impl SessionTableSource {
    /// Creates a source for `table_name` in `ctx`.
    pub fn new(
        ctx: SessionContext,
        table_name: impl Into<String>,
        timestamp_column: impl Into<String>,
    ) -> Self {
        Self {
            ctx,
            table_name: table_name.into(),
            timestamp_column: timestamp_column.into(),
        }
    }

    /// Returns the registered table name.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}

impl Debug for SessionTableSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTableSource")
            .field("table_name", &self.table_name)
            .field("timestamp_column", &self.timestamp_column)
            .finish()
    }
}

#[async_trait]
impl TableSource for SessionTableSource {
    #[instrument(skip(self), fields(table = %self.table_name))]
    async fn load(&self) -> DetectionResult<KpiTable> {
        let df = self.ctx.table(self.table_name.as_str()).await?;
        let schema: SchemaRef = df.schema().inner().clone();

        let batches: Vec<RecordBatch> = df
            .collect_partitioned()
            .await?
            .into_iter()
            .flatten()
            .collect();

        debug!(batches = batches.len(), "Collected session table");
        KpiTable::from_batches(schema, &batches, self.timestamp_column.clone())
    }

    fn description(&self) -> String {
        format!("DataFusion table '{}'", self.table_name)
    }
}

/// Wraps record batches that are already in memory.
#[derive(Debug, Clone)]
pub struct BatchSource {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
    timestamp_column: String,
}

impl BatchSource {
    /// Creates a source over `batches`, which must all share `schema`.
    pub fn new(
        schema: SchemaRef,
        batches: Vec<RecordBatch>,
        timestamp_column: impl Into<String>,
    ) -> Self {
        Self {
            schema,
            batches,
            timestamp_column: timestamp_column.into(),
        }
    }
}

#[async_trait]
impl TableSource for BatchSource {
    async fn load(&self) -> DetectionResult<KpiTable> {
        KpiTable::from_batches(
            self.schema.clone(),
            &self.batches,
            self.timestamp_column.clone(),
        )
    }

    fn description(&self) -> String {
        format!("{} in-memory batches", self.batches.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DetectionError;
    use arrow::array::{Float64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use datafusion::prelude::SessionConfig;
    use std::sync::Arc;

    fn kpi_batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("date", DataType::Utf8, false),
            Field::new("revenue", DataType::Float64, true),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec!["2024-01-01", "2024-01-02", "2024-01-03"])),
                Arc::new(Float64Array::from(vec![100.0, 120.0, 90.0])),
            ],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_session_table_source() {
        let ctx = SessionContext::new_with_config(SessionConfig::new().with_target_partitions(1));
        let batch = kpi_batch();
        ctx.register_batch("kpis", batch).unwrap();

        let source = SessionTableSource::new(ctx, "kpis", "date");
        let table = source.load().await.unwrap();
        assert_eq!(table.num_rows(), 3);
        assert_eq!(table.metric_columns(), vec!["revenue"]);
        assert_eq!(table.dates()[2], "2024-01-03");
        assert!(source.description().contains("kpis"));
    }

    #[tokio::test]
    async fn test_session_table_source_missing_table() {
        let source = SessionTableSource::new(SessionContext::new(), "nope", "date");
        let err = source.load().await.unwrap_err();
        assert!(matches!(err, DetectionError::QueryExecution(_)));
    }

    #[tokio::test]
    async fn test_batch_source_concatenates_in_order() {
        let batch = kpi_batch();
        let source = BatchSource::new(
            batch.schema(),
            vec![batch.slice(0, 2), batch.slice(2, 1)],
            "date",
        );
        let table = source.load().await.unwrap();
        let revenue = table.series("revenue").unwrap();
        assert_eq!(revenue.values(), &[Some(100.0), Some(120.0), Some(90.0)]);
    }

    #[tokio::test]
    async fn test_batch_source_without_rows() {
        let batch = kpi_batch();
        let source = BatchSource::new(batch.schema(), vec![], "date");
        assert!(matches!(
            source.load().await.unwrap_err(),
            DetectionError::EmptyTable
        ));
    }
}
