//! End-to-end tests running gzipped reports through the analyzer

use cloud_carbon::analyzer::EmissionsAnalyzer;
use cloud_carbon::reference::ReferenceData;
use cloud_carbon::report_parser::ExtractOptions;
use cloud_carbon::FootprintError;
use chrono::{Duration, TimeZone, Utc};
use std::fs;
use tempfile::TempDir;

mod common;
use common::{report_csv, sample_rows, write_gzipped, write_report, ReportRow};

fn analyzer() -> EmissionsAnalyzer {
    EmissionsAnalyzer::new(ReferenceData::embedded().unwrap(), ExtractOptions::default())
}

fn assert_close(actual: f64, expected: f64) {
    assert!((actual - expected).abs() < 1e-9, "expected {expected}, got {actual}");
}

#[test]
fn test_e2e_sample_report() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let path = write_report(temp_dir.path(), &sample_rows())?;

    let report = analyzer().analyse_path(&path)?;

    assert_eq!(report.qualifying_rows, 5);
    assert!(report.skipped.is_empty());

    let buckets: Vec<_> = report
        .records
        .iter()
        .map(|r| (r.region.as_str(), r.instance_type.as_str(), r.total_duration))
        .collect();
    assert_eq!(
        buckets,
        vec![
            ("ap-southeast-2", "c4.large", Duration::hours(1)),
            ("eu-central-1", "m5.2xlarge", Duration::hours(1)),
            ("eu-west-1", "t2.micro", Duration::hours(3)),
        ]
    );

    assert_close(report.records[0].emissions_grams, 14.7824);
    assert_close(report.records[2].emissions_grams, 3.0 * 2.75808);

    let sum: f64 = report.records.iter().map(|r| r.emissions_grams).sum();
    assert_close(report.total_grams, sum);

    let span = report.span.unwrap();
    assert_eq!(span.earliest, Utc.with_ymd_and_hms(2022, 8, 1, 0, 0, 0).unwrap());
    assert_eq!(span.latest, Utc.with_ymd_and_hms(2022, 8, 1, 6, 0, 0).unwrap());

    Ok(())
}

#[test]
fn test_e2e_row_order_does_not_matter() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let rows = sample_rows();
    let mut reversed = sample_rows();
    reversed.reverse();

    let forward = analyzer().analyse_reader(report_csv(&rows).as_bytes())?;
    let backward = analyzer().analyse_reader(report_csv(&reversed).as_bytes())?;
    assert_eq!(forward, backward);

    let path = write_report(temp_dir.path(), &reversed)?;
    assert_eq!(analyzer().analyse_path(&path)?, forward);

    Ok(())
}

#[test]
fn test_e2e_unknown_lookups_are_skipped() -> anyhow::Result<()> {
    let rows = vec![
        ReportRow::ec2("eu-west-1", "t2.micro", "2022-08-01T00:00:00Z/2022-08-01T01:00:00Z"),
        ReportRow::ec2("eu-west-1", "x99.huge", "2022-08-01T00:00:00Z/2022-08-01T01:00:00Z"),
        ReportRow::ec2("moon-base-1", "t2.micro", "2022-08-01T00:00:00Z/2022-08-01T01:00:00Z"),
    ];

    let report = analyzer().analyse_reader(report_csv(&rows).as_bytes())?;

    assert_eq!(report.qualifying_rows, 3);
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.skipped.len(), 2);
    assert_close(report.total_grams, 2.75808);

    Ok(())
}

#[test]
fn test_e2e_plain_csv_input() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("report.csv");
    fs::write(&path, report_csv(&sample_rows()))?;

    let report = analyzer().analyse_path(&path)?;
    assert_eq!(report.qualifying_rows, 5);

    Ok(())
}

#[test]
fn test_e2e_empty_report() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let path = write_gzipped(temp_dir.path(), "empty.csv.gz", "")?;

    let report = analyzer().analyse_path(&path)?;

    assert_eq!(report.qualifying_rows, 0);
    assert!(report.records.is_empty());
    assert!(report.span.is_none());
    assert_eq!(report.total_grams, 0.0);

    Ok(())
}

#[test]
fn test_e2e_header_only_report() -> anyhow::Result<()> {
    let report = analyzer().analyse_reader(report_csv(&[]).as_bytes())?;

    assert_eq!(report.qualifying_rows, 0);
    assert!(report.records.is_empty());

    Ok(())
}

#[test]
fn test_e2e_missing_file() {
    let err = analyzer()
        .analyse_path(std::path::Path::new("/nonexistent/report.csv.gz"))
        .unwrap_err();
    assert!(matches!(err, FootprintError::UnreadableInput { .. }));
}

#[test]
fn test_e2e_not_gzip() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("report.csv.gz");
    fs::write(&path, "this is not gzip data at all")?;

    let err = analyzer().analyse_path(&path).unwrap_err();
    assert!(matches!(err, FootprintError::UndecompressibleInput(_)));

    Ok(())
}

#[test]
fn test_e2e_structural_error_aborts() {
    let mut content = report_csv(&sample_rows());
    content.push_str("li-99,too,few,fields\n");

    let err = analyzer().analyse_reader(content.as_bytes()).unwrap_err();
    assert!(matches!(err, FootprintError::MalformedReportRow { row: 10, .. }));
}

#[test]
fn test_e2e_missing_required_column() {
    let content = "identity/TimeInterval,product/regionCode\n2022-08-01T00:00:00Z/2022-08-01T01:00:00Z,eu-west-1\n";

    let err = analyzer().analyse_reader(content.as_bytes()).unwrap_err();
    assert!(matches!(err, FootprintError::MissingColumn(_)));
}

#[test]
fn test_e2e_strict_timestamps() {
    let rows = vec![ReportRow::ec2("eu-west-1", "t2.micro", "yesterday/today")];
    let content = report_csv(&rows);

    let permissive = analyzer().analyse_reader(content.as_bytes()).unwrap();
    assert_eq!(permissive.qualifying_rows, 1);
    assert_eq!(permissive.records[0].total_duration, Duration::zero());
    assert_eq!(permissive.total_grams, 0.0);
    assert!(permissive.rejected.is_empty());

    let strict = EmissionsAnalyzer::new(
        ReferenceData::embedded().unwrap(),
        ExtractOptions {
            strict_timestamps: true,
            ..ExtractOptions::default()
        },
    );
    let report = strict.analyse_reader(content.as_bytes()).unwrap();
    assert_eq!(report.qualifying_rows, 0);
    assert!(report.records.is_empty());
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].line, 2);
}

#[test]
fn test_e2e_malformed_rows_keep_the_rest_of_the_report() -> anyhow::Result<()> {
    let rows = vec![
        ReportRow::ec2("eu-west-1", "t2.micro", "2022-08-01T00:00:00Z/2022-08-01T01:00:00Z"),
        ReportRow::ec2("eu-west-1", "t2.micro", "garbage/2022-08-01T02:00:00Z"),
        ReportRow::ec2("eu-west-1", "t2.micro", "2022-08-01T02:00:00Z/2022-08-01T03:00:00Z"),
        ReportRow::ec2("eu-west-1", "t2.micro", "2022-08-01T05:00:00Z"),
        ReportRow::ec2("eu-west-1", "t2.micro", "2022-08-01T06:00:00Z/2022-08-01T04:00:00Z"),
    ];
    let temp_dir = TempDir::new()?;
    let path = write_report(temp_dir.path(), &rows)?;

    let strict = EmissionsAnalyzer::new(
        ReferenceData::embedded()?,
        ExtractOptions {
            strict_timestamps: true,
            reject_negative_durations: true,
        },
    );
    let report = strict.analyse_path(&path)?;

    assert_eq!(report.qualifying_rows, 2);
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].total_duration, Duration::hours(2));
    assert_close(report.total_grams, 2.0 * 2.75808);

    let lines: Vec<u64> = report.rejected.iter().map(|r| r.line).collect();
    assert_eq!(lines, vec![3, 5, 6]);

    let span = report.span.unwrap();
    assert_eq!(span.earliest, Utc.with_ymd_and_hms(2022, 8, 1, 0, 0, 0).unwrap());
    assert_eq!(span.latest, Utc.with_ymd_and_hms(2022, 8, 1, 3, 0, 0).unwrap());

    Ok(())
}

#[test]
fn test_e2e_unreadable_plain_csv() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("report.csv");
    fs::create_dir(&path)?;

    let err = analyzer().analyse_path(&path).unwrap_err();
    assert!(matches!(err, FootprintError::UnreadableInput { .. }));

    Ok(())
}
