//! End-to-end tests: register a CSV with DataFusion, load it as a KPI table and
//! run both detectors.

use std::io::Write;
use std::sync::Arc;

use datafusion::prelude::{CsvReadOptions, SessionConfig, SessionContext};
use kpi_guard::prelude::*;

const KPI_CSV: &str = "\
date,revenue,daily_active_users,bounce_rate
2024-01-01,100,3200,45
2024-01-02,100,3210,46
2024-01-03,100,3190,n/a
2024-01-04,100,3200,45
2024-01-05,100,3205,44
2024-01-06,100,3195,45
2024-01-07,400,3200,46
2024-01-08,100,3200,45
";

/// Writes `contents` to a temporary CSV file and registers it as `kpis`.
async fn csv_context(contents: &str) -> (SessionContext, tempfile::NamedTempFile) {
    let mut file = tempfile::Builder::new()
        .suffix(".csv")
        .tempfile()
        .unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();

    // A single partition keeps the scan in file order.
    let ctx = SessionContext::new_with_config(SessionConfig::new().with_target_partitions(1));
    ctx.register_csv("kpis", file.path().to_str().unwrap(), CsvReadOptions::new())
        .await
        .unwrap();
    (ctx, file)
}

#[tokio::test]
async fn test_csv_end_to_end_detection() {
    let (ctx, _file) = csv_context(KPI_CSV).await;
    let table = SessionTableSource::new(ctx, "kpis", "date")
        .load()
        .await
        .unwrap();

    assert_eq!(table.num_rows(), 8);
    assert_eq!(
        table.metric_columns(),
        vec!["revenue", "daily_active_users", "bounce_rate"]
    );

    let runner = AnomalyDetectionRunner::from_config(&DetectionConfig::default()).unwrap();
    let report = runner.run(&table).unwrap();

    // Relative-change records come first, then z-score records.
    assert_eq!(report.records.len(), 3);

    let spike = &report.records[0];
    assert_eq!(spike.kind(), DetectionKind::PercentChange);
    assert_eq!(spike.kpi, "revenue");
    assert_eq!(spike.date, "2024-01-07");
    assert_eq!(spike.current, 400.0);
    assert_eq!(spike.previous(), Some(100.0));
    assert_eq!(spike.change(), Some(300.0));

    let recovery = &report.records[1];
    assert_eq!(recovery.kind(), DetectionKind::PercentChange);
    assert_eq!(recovery.date, "2024-01-08");
    assert_eq!(recovery.change(), Some(-75.0));

    let outlier = &report.records[2];
    assert_eq!(outlier.kind(), DetectionKind::ZScore);
    assert_eq!(outlier.date, "2024-01-07");
    let z = outlier.z_score_value().unwrap();
    assert!((z - 2.4749).abs() < 1e-3, "unexpected z-score {z}");
}

#[tokio::test]
async fn test_unparsable_cell_only_affects_its_neighbours() {
    let (ctx, _file) = csv_context(KPI_CSV).await;
    let table = SessionTableSource::new(ctx, "kpis", "date")
        .load()
        .await
        .unwrap();

    let bounce = table.series("bounce_rate").unwrap();
    assert_eq!(bounce.values()[2], None);
    assert_eq!(bounce.values().iter().filter(|v| v.is_some()).count(), 7);

    // A swing across the unparsable cell is not evaluated.
    let records = detect_percent_change(&table, 1.0).unwrap();
    assert!(records
        .iter()
        .filter(|r| r.kpi == "bounce_rate")
        .all(|r| r.date != "2024-01-03" && r.date != "2024-01-04"));
}

#[tokio::test]
async fn test_kpi_selection_and_thresholds_from_json() {
    let (ctx, _file) = csv_context(KPI_CSV).await;
    let table = SessionTableSource::new(ctx, "kpis", "date")
        .load()
        .await
        .unwrap();

    let config = DetectionConfig::from_json_str(
        r#"{"percent_change_threshold": 0.5, "zscore_threshold": 1.5, "kpi_columns": ["daily_active_users"]}"#,
    )
    .unwrap();
    let report = AnomalyDetectionRunner::from_config(&config)
        .unwrap()
        .run(&table)
        .unwrap();

    assert!(!report.is_empty());
    assert!(report.records.iter().all(|r| r.kpi == "daily_active_users"));

    // 3200 -> 3210 is +0.3125%, 3210 -> 3190 is about -0.62%.
    let first = &report.records[0];
    assert_eq!(first.kind(), DetectionKind::PercentChange);
    assert_eq!(first.date, "2024-01-03");

    // mean 3200, sample std ~5.98: 3210 and 3190 score about +/-1.67.
    let outliers: Vec<_> = report
        .records
        .iter()
        .filter(|r| r.kind() == DetectionKind::ZScore)
        .map(|r| r.date.as_str())
        .collect();
    assert_eq!(outliers, vec!["2024-01-02", "2024-01-03"]);
}

#[tokio::test]
async fn test_missing_timestamp_column_fails_loudly() {
    let (ctx, _file) = csv_context(KPI_CSV).await;
    let err = SessionTableSource::new(ctx, "kpis", "day")
        .load()
        .await
        .unwrap_err();
    assert!(matches!(err, DetectionError::MissingTimestampColumn(ref c) if c == "day"));
    assert!(err.is_structural());
}

#[tokio::test]
async fn test_timestamp_only_table_fails_loudly() {
    let (ctx, _file) = csv_context("date\n2024-01-01\n2024-01-02\n").await;
    let err = SessionTableSource::new(ctx, "kpis", "date")
        .load()
        .await
        .unwrap_err();
    assert!(matches!(err, DetectionError::NoMetricColumns(_)));
}

#[tokio::test]
async fn test_concurrent_run_preserves_merge_order() {
    let (ctx, _file) = csv_context(KPI_CSV).await;
    let table = Arc::new(
        SessionTableSource::new(ctx, "kpis", "date")
            .load()
            .await
            .unwrap(),
    );

    let runner = AnomalyDetectionRunner::from_config(&DetectionConfig::default()).unwrap();
    for _ in 0..10 {
        let report = runner.run_concurrent(Arc::clone(&table)).await.unwrap();
        let expected = merge(
            detect_percent_change(&table, 15.0).unwrap(),
            detect_zscore(&table, 2.0).unwrap(),
        );
        assert_eq!(report.records, expected);
    }
}

#[tokio::test]
async fn test_report_json_keeps_record_field_names() {
    let (ctx, _file) = csv_context(KPI_CSV).await;
    let table = SessionTableSource::new(ctx, "kpis", "date")
        .load()
        .await
        .unwrap();
    let report = AnomalyDetectionRunner::from_config(&DetectionConfig::default())
        .unwrap()
        .run(&table)
        .unwrap();

    let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    let records = value["records"].as_array().unwrap();

    let mut keys: Vec<_> = records[0].as_object().unwrap().keys().cloned().collect();
    keys.sort();
    assert_eq!(keys, vec!["change", "current", "date", "kpi", "previous"]);

    let mut keys: Vec<_> = records[2].as_object().unwrap().keys().cloned().collect();
    keys.sort();
    assert_eq!(keys, vec!["current", "date", "kpi", "z_score"]);

    let parsed: AnomalyReport = serde_json::from_value(value).unwrap();
    assert_eq!(parsed.records, report.records);
}
