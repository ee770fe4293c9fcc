use approx::assert_relative_eq;
use rstest::rstest;
use trove_eval::metrics::{forecast, Direction, GroundTruth, Metric, MetricRegistry, Outcome};
use trove_eval::{EvalError, TaskFamily};

fn labels(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_mape_with_zero_actual_is_nan_only_for_mape() {
    let registry = MetricRegistry::with_defaults();
    let scores = registry
        .score(
            TaskFamily::Forecasting,
            &Outcome::Forecast(vec![1.0, 2.0, 3.0]),
            &GroundTruth::Values(vec![0.0, 2.0, 4.0]),
        )
        .unwrap();

    assert!(scores["mape"].is_nan());
    assert_relative_eq!(scores["mae"], 2.0 / 3.0);
    assert_relative_eq!(scores["mse"], 2.0 / 3.0);
    assert!(scores["rmse"].is_finite());
    assert!(scores["smape"].is_finite());
}

#[test]
fn test_mape_is_percent() {
    let registry = MetricRegistry::with_defaults();
    let scores = registry
        .score(
            TaskFamily::Forecasting,
            &Outcome::Forecast(vec![110.0, 90.0]),
            &GroundTruth::Values(vec![100.0, 100.0]),
        )
        .unwrap();
    assert_relative_eq!(scores["mape"], 10.0);
}

#[rstest]
#[case::forecasting(
    TaskFamily::Forecasting,
    Outcome::Forecast(vec![1.0, 2.0]),
    GroundTruth::Values(vec![1.0])
)]
#[case::anomaly_flags(
    TaskFamily::AnomalyDetection,
    Outcome::Anomaly { scores: None, flags: vec![true] },
    GroundTruth::AnomalyLabels(vec![true, false])
)]
#[case::anomaly_scores(
    TaskFamily::AnomalyDetection,
    Outcome::Anomaly { scores: Some(vec![0.1]), flags: vec![true, false] },
    GroundTruth::AnomalyLabels(vec![true, false])
)]
#[case::classification(
    TaskFamily::Classification,
    Outcome::Classification { predicted: labels(&["A", "B"]), classes: labels(&["A", "B"]) },
    GroundTruth::Labels(labels(&["A"]))
)]
#[case::family_mismatch(
    TaskFamily::Forecasting,
    Outcome::Forecast(vec![1.0]),
    GroundTruth::AnomalyLabels(vec![true])
)]
fn test_misaligned_inputs_fail(
    #[case] family: TaskFamily,
    #[case] predicted: Outcome,
    #[case] actual: GroundTruth,
) {
    let registry = MetricRegistry::with_defaults();
    let result = registry.score(family, &predicted, &actual);
    assert!(matches!(result, Err(EvalError::Alignment(_))));
}

#[test]
fn test_classification_unknown_actual_label() {
    let registry = MetricRegistry::with_defaults();
    let result = registry.score(
        TaskFamily::Classification,
        &Outcome::Classification {
            predicted: labels(&["A"]),
            classes: labels(&["A", "B"]),
        },
        &GroundTruth::Labels(labels(&["Z"])),
    );
    assert!(matches!(result, Err(EvalError::UnknownLabel { label, .. }) if label == "Z"));
}

#[test]
fn test_classification_defaults() {
    let registry = MetricRegistry::with_defaults();
    let scores = registry
        .score(
            TaskFamily::Classification,
            &Outcome::Classification {
                predicted: labels(&["A", "B", "A"]),
                classes: labels(&["A", "B"]),
            },
            &GroundTruth::Labels(labels(&["A", "A", "A"])),
        )
        .unwrap();

    assert_relative_eq!(scores["accuracy"], 2.0 / 3.0);
    assert_relative_eq!(scores["macro_precision"], 0.5);
    assert_relative_eq!(scores["macro_recall"], 1.0 / 3.0);
    assert_relative_eq!(scores["macro_f1"], 0.4);
}

#[test]
fn test_roc_auc_is_nan_without_scores() {
    let registry = MetricRegistry::with_defaults();
    let scores = registry
        .score(
            TaskFamily::AnomalyDetection,
            &Outcome::Anomaly {
                scores: None,
                flags: vec![false, true, false, true],
            },
            &GroundTruth::AnomalyLabels(vec![false, true, false, false]),
        )
        .unwrap();

    assert!(scores["roc_auc"].is_nan());
    assert_relative_eq!(scores["precision"], 0.5);
}

#[test]
fn test_duplicate_registration_fails() {
    let mut registry = MetricRegistry::with_defaults();
    let err = registry
        .register(Metric::forecast(
            "mae",
            Direction::LowerIsBetter,
            forecast::mean_absolute_error,
        ))
        .unwrap_err();

    assert!(matches!(
        err,
        EvalError::DuplicateMetric { family: TaskFamily::Forecasting, ref name } if name == "mae"
    ));
    assert_eq!(registry.metrics(TaskFamily::Forecasting).len(), 5);
}

#[test]
fn test_custom_metric_and_non_finite_result() {
    let mut registry = MetricRegistry::new();
    registry
        .register(Metric::forecast("max_error", Direction::LowerIsBetter, |p, a| {
            Ok(p.iter()
                .zip(a)
                .map(|(p, a)| (p - a).abs())
                .fold(0.0, f64::max))
        }))
        .unwrap();
    registry
        .register(Metric::forecast("infinite", Direction::LowerIsBetter, |_, _| {
            Ok(f64::INFINITY)
        }))
        .unwrap();

    let scores = registry
        .score(
            TaskFamily::Forecasting,
            &Outcome::Forecast(vec![1.0, 5.0]),
            &GroundTruth::Values(vec![2.0, 2.0]),
        )
        .unwrap();
    assert_relative_eq!(scores["max_error"], 3.0);
    assert!(scores["infinite"].is_nan());
    assert_eq!(
        registry.direction(TaskFamily::Forecasting, "max_error"),
        Some(Direction::LowerIsBetter)
    );
    assert!(registry.get(TaskFamily::Classification, "max_error").is_none());
}

#[test]
fn test_metrics_are_pure() {
    let registry = MetricRegistry::with_defaults();
    let predicted = Outcome::Anomaly {
        scores: Some(vec![0.3, 0.8, 0.1, 0.7, 0.2]),
        flags: vec![false, true, false, true, false],
    };
    let actual = GroundTruth::AnomalyLabels(vec![false, true, false, false, true]);

    let first = registry
        .score(TaskFamily::AnomalyDetection, &predicted, &actual)
        .unwrap();
    let second = registry
        .score(TaskFamily::AnomalyDetection, &predicted, &actual)
        .unwrap();
    assert_eq!(first, second);
}
