use chrono::{NaiveDate, TimeZone, Utc};
use std::time::Duration;
use ts_trove::eval::techniques::{
    IqrDetector, MajorityClass, NaiveLastValue, NearestCentroid, ZScoreDetector,
};
use ts_trove::eval::utils::parse_frequency;
use ts_trove::eval::{EvaluationJob, LabeledSeries};
use ts_trove::{AnyTechnique, DatasetSplit, Harness, HarnessConfig, MetricRegistry, Series};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("ts_trove: Parallel Runs");
    println!("=======================\n");

    let start = NaiveDate::from_ymd_opt(2024, 1, 1).ok_or("invalid start date")?;

    // Forecasting split, sampled hourly
    let midnight = start.and_hms_opt(0, 0, 0).ok_or("invalid start time")?;
    let values: Vec<f64> = (0..30).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0).collect();
    let hourly = Series::regular(Utc.from_utc_datetime(&midnight), parse_frequency("hourly")?, values)?;
    let (train, test) = hourly.split_at(25)?;
    let forecast_split = DatasetSplit::forecasting("sine", train, test);

    // Anomaly split: a calm training month, then a test week with two spikes
    let calm: Vec<f64> = (0..30).map(|i| 10.0 + (i % 3) as f64 * 0.5).collect();
    let train = Series::daily(start, calm)?;
    let test = train.following(vec![10.0, 10.5, 25.0, 11.0, 10.0, -4.0, 10.5])?;
    let labels = vec![false, false, true, false, false, true, false];
    let anomaly_split = DatasetSplit::anomaly_detection("spikes", train, test, labels);

    // Classification split: low vs high level series
    let instance = |level: f64, label: &str| -> Result<LabeledSeries, Box<dyn std::error::Error>> {
        let values = (0..10).map(|i| level + (i % 2) as f64).collect();
        Ok(LabeledSeries::new(Series::daily(start, values)?, label))
    };
    let train = vec![
        instance(1.0, "low")?,
        instance(2.0, "low")?,
        instance(20.0, "high")?,
        instance(21.0, "high")?,
        instance(1.5, "low")?,
    ];
    let test = vec![
        instance(1.2, "low")?.series,
        instance(19.0, "high")?.series,
        instance(2.5, "low")?.series,
    ];
    let labels = vec!["low".to_string(), "high".to_string(), "low".to_string()];
    let class_split = DatasetSplit::classification("levels", train, test, labels);

    let registry = MetricRegistry::with_defaults();
    let config = HarnessConfig {
        workers: 4,
        ..HarnessConfig::default()
    };
    let harness = Harness::new(config, &registry)?;

    let jobs = vec![
        EvaluationJob::new(AnyTechnique::forecaster(NaiveLastValue::new()), &forecast_split),
        EvaluationJob::new(
            AnyTechnique::anomaly_detector(ZScoreDetector::new(3.0)?),
            &anomaly_split,
        )
        .with_timeout(Duration::from_secs(5)),
        EvaluationJob::new(AnyTechnique::anomaly_detector(IqrDetector::new(1.5)?), &anomaly_split),
        EvaluationJob::new(AnyTechnique::classifier(NearestCentroid::new()), &class_split),
        EvaluationJob::new(AnyTechnique::classifier(MajorityClass::new()), &class_split),
        // Wrong family on purpose: fails validation without affecting the other runs
        EvaluationJob::new(AnyTechnique::forecaster(NaiveLastValue::new()), &class_split),
    ];

    for outcome in harness.evaluate_many(jobs)? {
        match outcome {
            Ok(report) => {
                println!("{} on {}:", report.technique().name, report.dataset());
                for (metric, score) in report.scores() {
                    println!("  {:<16} {:.4}", metric, score);
                }
                if let Some(confusion) = report.confusion() {
                    println!("  confusion {:?} over {:?}", confusion.counts(), confusion.classes());
                }
            }
            Err(err) => println!("Run failed: {}", err),
        }
        println!();
    }

    Ok(())
}
