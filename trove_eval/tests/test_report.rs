mod common;

use common::daily;
use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::NamedTempFile;
use trove_eval::report::{best_by, write_csv};
use trove_eval::techniques::{MovingAverageForecaster, NaiveLastValue};
use trove_eval::{
    AnyTechnique, DatasetSplit, Direction, EvalError, Harness, HarnessConfig, MetricRegistry,
    ResultReport,
};

fn reports(registry: &MetricRegistry) -> Vec<ResultReport> {
    let harness = Harness::new(HarnessConfig::default(), registry).unwrap();
    let (train, test) = daily(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 4.0])
        .split_at(5)
        .unwrap();
    let split = DatasetSplit::forecasting("toy", train, test);

    vec![
        harness
            .evaluate(AnyTechnique::forecaster(NaiveLastValue::new()), &split, None)
            .unwrap(),
        harness
            .evaluate(
                AnyTechnique::forecaster(MovingAverageForecaster::new(3).unwrap()),
                &split,
                None,
            )
            .unwrap(),
    ]
}

#[test]
fn test_key_value_lines() {
    let registry = MetricRegistry::with_defaults();
    let report = &reports(&registry)[1];
    let text = report.to_key_value();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines[0], "technique=moving-average");
    assert_eq!(lines[1], "param.window=3");
    assert_eq!(lines[2], "dataset=toy");
    assert_eq!(lines[3], "family=forecasting");
    // Moving average of 3,4,5 forecasts 4 for both steps
    assert!(lines.contains(&"metric.mae=1"));
    assert!(lines.iter().any(|l| l.starts_with("fit_ms=")));
    assert!(lines.iter().any(|l| l.starts_with("infer_ms=")));
}

#[test]
fn test_csv_export() {
    let registry = MetricRegistry::with_defaults();
    let reports = reports(&registry);

    let mut file = NamedTempFile::new().unwrap();
    write_csv(&reports, file.as_file_mut()).unwrap();

    let mut reader = csv::Reader::from_path(file.path()).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(
        headers.iter().collect::<Vec<_>>(),
        vec!["technique", "dataset", "family", "metric", "score", "fit_ms", "infer_ms"]
    );

    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    // Two reports, five forecasting metrics each
    assert_eq!(rows.len(), 10);
    assert_eq!(&rows[0][0], "naive-last-value");
    assert_eq!(&rows[0][3], "mae");
    assert_eq!(&rows[0][4], "1");
}

#[test]
fn test_json_round_trip() {
    let registry = MetricRegistry::with_defaults();
    let report = &reports(&registry)[0];
    let parsed = ResultReport::from_json(&report.to_json().unwrap()).unwrap();
    assert!(parsed.same_outcome(report));
    assert_eq!(parsed.fit_duration(), report.fit_duration());
}

#[test]
fn test_best_by_mae() {
    let registry = MetricRegistry::with_defaults();
    let reports = reports(&registry);
    // Naive: MAE 1. Moving average forecasts 4: MAE (2 + 0) / 2 = 1. First wins ties.
    let best = best_by(&reports, "mae", Direction::LowerIsBetter).unwrap();
    assert_eq!(best.technique().name, "naive-last-value");
}

#[test]
fn test_config_from_json_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"fit_timeout_ms": 1500, "anomaly_threshold": 0.8, "workers": 2, "check_frequency": false}}"#
    )
    .unwrap();

    let config = HarnessConfig::from_json_file(file.path()).unwrap();
    assert_eq!(config.fit_timeout_ms, Some(1500));
    assert_eq!(config.anomaly_threshold, 0.8);
    assert_eq!(config.workers, 2);
    assert!(!config.check_frequency);
}

#[test]
fn test_invalid_config_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, r#"{{"workers": 0}}"#).unwrap();
    assert!(matches!(
        HarnessConfig::from_json_file(file.path()),
        Err(EvalError::Config(_))
    ));

    let mut garbage = NamedTempFile::new().unwrap();
    write!(garbage, "not json").unwrap();
    assert!(matches!(
        HarnessConfig::from_json_file(garbage.path()),
        Err(EvalError::Json(_))
    ));

    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.json");
    assert!(!missing.exists());
    assert!(matches!(
        HarnessConfig::from_json_file(&missing),
        Err(EvalError::IoError(_))
    ));
}
