//! Evaluation harness: fit, infer, align, score
//!
//! A run takes ownership of one technique instance and one dataset split.
//! Runs share nothing mutable: series buffers and the metric registry are
//! read-only, so independent runs can be spread over a worker pool with
//! [`Harness::evaluate_many`].
//!
//! Fit timeouts are best effort. The fit runs on its own thread and the
//! harness stops waiting once the budget is spent, tripping the run's
//! [`FitContext`]. A technique that never calls [`FitContext::checkpoint`]
//! cannot be interrupted: its thread keeps running until the fit returns,
//! after which the instance is dropped.

use crate::config::HarnessConfig;
use crate::error::{EvalError, Result, RunError, Stage};
use crate::metrics::{ConfusionMatrix, GroundTruth, MetricRegistry, Outcome};
use crate::report::ResultReport;
use crate::series::Series;
use crate::technique::{AnyTechnique, ClassOutput, FitContext, LabeledSeries, TaskFamily};
use crate::utils::future_timestamps;
use log::{debug, info, warn};
use rayon::prelude::*;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

/// Training data, evaluation data and ground truth for one dataset
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetSplit {
    /// Forecast `test.len()` steps past the end of `train`
    Forecasting {
        name: String,
        train: Series,
        test: Series,
    },
    /// Flag anomalous points of `test`; `labels` holds one flag per point
    AnomalyDetection {
        name: String,
        train: Series,
        test: Series,
        labels: Vec<bool>,
    },
    /// Label every series of `test`; `labels` holds one label per series
    Classification {
        name: String,
        train: Vec<LabeledSeries>,
        test: Vec<Series>,
        labels: Vec<String>,
    },
}

impl DatasetSplit {
    pub fn forecasting(name: impl Into<String>, train: Series, test: Series) -> Self {
        DatasetSplit::Forecasting {
            name: name.into(),
            train,
            test,
        }
    }

    pub fn anomaly_detection(
        name: impl Into<String>,
        train: Series,
        test: Series,
        labels: Vec<bool>,
    ) -> Self {
        DatasetSplit::AnomalyDetection {
            name: name.into(),
            train,
            test,
            labels,
        }
    }

    pub fn classification(
        name: impl Into<String>,
        train: Vec<LabeledSeries>,
        test: Vec<Series>,
        labels: Vec<String>,
    ) -> Self {
        DatasetSplit::Classification {
            name: name.into(),
            train,
            test,
            labels,
        }
    }

    /// Dataset name used in reports and errors
    pub fn name(&self) -> &str {
        match self {
            DatasetSplit::Forecasting { name, .. }
            | DatasetSplit::AnomalyDetection { name, .. }
            | DatasetSplit::Classification { name, .. } => name,
        }
    }

    pub fn family(&self) -> TaskFamily {
        match self {
            DatasetSplit::Forecasting { .. } => TaskFamily::Forecasting,
            DatasetSplit::AnomalyDetection { .. } => TaskFamily::AnomalyDetection,
            DatasetSplit::Classification { .. } => TaskFamily::Classification,
        }
    }

    /// Number of training observations (instances for classification)
    pub fn train_len(&self) -> usize {
        match self {
            DatasetSplit::Forecasting { train, .. }
            | DatasetSplit::AnomalyDetection { train, .. } => train.len(),
            DatasetSplit::Classification { train, .. } => train.len(),
        }
    }
}

/// One independent run for [`Harness::evaluate_many`]
#[derive(Debug)]
pub struct EvaluationJob<'a> {
    pub technique: AnyTechnique,
    pub split: &'a DatasetSplit,
    /// Overrides the configured fit timeout when set
    pub timeout: Option<Duration>,
}

impl<'a> EvaluationJob<'a> {
    pub fn new(technique: AnyTechnique, split: &'a DatasetSplit) -> Self {
        Self {
            technique,
            split,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Raw inference output before alignment
enum RawOutput {
    Forecast(Vec<f64>),
    Anomaly {
        scores: Option<Vec<f64>>,
        flags: Vec<bool>,
    },
    Classification {
        outputs: Vec<ClassOutput>,
        classes: Vec<String>,
    },
}

/// Runs techniques against dataset splits and scores them
#[derive(Debug, Clone)]
pub struct Harness<'r> {
    config: HarnessConfig,
    registry: &'r MetricRegistry,
}

impl<'r> Harness<'r> {
    /// Create a harness; fails if the configuration is invalid
    pub fn new(config: HarnessConfig, registry: &'r MetricRegistry) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, registry })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn registry(&self) -> &MetricRegistry {
        self.registry
    }

    /// Fit `technique` on the split's training data, run inference on its
    /// evaluation data, and score the output against the ground truth.
    ///
    /// `timeout` overrides the configured fit timeout. Errors carry the
    /// technique name, dataset name and the stage that failed; nothing is
    /// retried.
    pub fn evaluate(
        &self,
        technique: AnyTechnique,
        split: &DatasetSplit,
        timeout: Option<Duration>,
    ) -> std::result::Result<ResultReport, RunError> {
        let identity = technique.identity().clone();
        let dataset = split.name();
        let fail = |stage: Stage| {
            let name = identity.name.clone();
            move |source: EvalError| RunError::new(&name, dataset, stage, source)
        };

        info!(
            "Evaluating '{}' on '{}' ({})",
            identity.name,
            dataset,
            split.family()
        );

        validate(&technique, split).map_err(fail(Stage::Validate))?;

        let timeout = timeout.or_else(|| self.config.fit_timeout());
        let started = Instant::now();
        let technique = match timeout {
            Some(budget) => fit_with_timeout(technique, split, budget),
            None => fit_inline(technique, split, &FitContext::new()),
        }
        .map_err(fail(Stage::Fit))?;
        let fit_duration = started.elapsed();
        debug!("Fit of '{}' took {:?}", identity.name, fit_duration);

        let started = Instant::now();
        let raw = infer(&technique, split, self.config.anomaly_threshold)
            .map_err(fail(Stage::Infer))?;
        let infer_duration = started.elapsed();
        debug!("Inference of '{}' took {:?}", identity.name, infer_duration);

        let (outcome, truth, confusion) =
            self.align(raw, split).map_err(fail(Stage::Align))?;

        let scores = self
            .registry
            .score(split.family(), &outcome, &truth)
            .map_err(fail(Stage::Score))?;

        info!(
            "Finished '{}' on '{}' with {} metrics",
            identity.name,
            dataset,
            scores.len()
        );

        Ok(ResultReport::new(
            identity,
            dataset,
            split.family(),
            scores,
            confusion,
            fit_duration,
            infer_duration,
        ))
    }

    /// Run independent jobs on a pool of `workers` threads.
    ///
    /// Results come back in job order. A failing run yields its own error
    /// without affecting the others; the outer error is only returned when
    /// the pool cannot be created.
    pub fn evaluate_many(
        &self,
        jobs: Vec<EvaluationJob<'_>>,
    ) -> Result<Vec<std::result::Result<ResultReport, RunError>>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .thread_name(|i| format!("trove-eval-{}", i))
            .build()
            .map_err(|e| EvalError::Config(format!("Cannot build worker pool: {}", e)))?;

        debug!(
            "Dispatching {} runs to {} workers",
            jobs.len(),
            self.config.workers
        );

        Ok(pool.install(|| {
            jobs.into_par_iter()
                .map(|job| self.evaluate(job.technique, job.split, job.timeout))
                .collect()
        }))
    }

    /// Line the inference output up with the ground truth
    fn align(
        &self,
        raw: RawOutput,
        split: &DatasetSplit,
    ) -> Result<(Outcome, GroundTruth, Option<ConfusionMatrix>)> {
        match (raw, split) {
            (RawOutput::Forecast(values), DatasetSplit::Forecasting { train, test, .. }) => {
                if self.config.check_frequency {
                    check_continuation(train, test)?;
                }
                let actual = test.univariate()?.to_vec();
                expect_length("forecast values", values.len(), actual.len())?;
                Ok((Outcome::Forecast(values), GroundTruth::Values(actual), None))
            }
            (
                RawOutput::Anomaly { scores, flags },
                DatasetSplit::AnomalyDetection { test, labels, .. },
            ) => {
                expect_length("ground-truth labels", labels.len(), test.len())?;
                expect_length("anomaly flags", flags.len(), labels.len())?;
                if let Some(scores) = &scores {
                    expect_length("anomaly scores", scores.len(), labels.len())?;
                }
                Ok((
                    Outcome::Anomaly { scores, flags },
                    GroundTruth::AnomalyLabels(labels.clone()),
                    None,
                ))
            }
            (
                RawOutput::Classification { outputs, classes },
                DatasetSplit::Classification { labels, .. },
            ) => {
                expect_length("predictions", outputs.len(), labels.len())?;
                let predicted = outputs
                    .iter()
                    .map(|output| output.resolve(&classes))
                    .collect::<Result<Vec<_>>>()?;
                let confusion = ConfusionMatrix::new(&classes, &predicted, labels)?;
                Ok((
                    Outcome::Classification { predicted, classes },
                    GroundTruth::Labels(labels.clone()),
                    Some(confusion),
                ))
            }
            _ => Err(family_mismatch(split)),
        }
    }
}

fn family_mismatch(split: &DatasetSplit) -> EvalError {
    EvalError::InvalidParameter(format!(
        "Technique cannot run on a {} split",
        split.family()
    ))
}

fn expect_length(what: &str, actual: usize, expected: usize) -> Result<()> {
    if actual != expected {
        return Err(EvalError::Alignment(format!(
            "Expected {} {}, got {}",
            expected, what, actual
        )));
    }
    Ok(())
}

/// The test span must pick up exactly one step after the training tail
fn check_continuation(train: &Series, test: &Series) -> Result<()> {
    let (Some(step), Some(last), Some(first)) = (
        train.frequency(),
        train.last_timestamp(),
        test.first_timestamp(),
    ) else {
        return Ok(());
    };

    if let Some(test_step) = test.frequency() {
        if test_step != step {
            return Err(EvalError::Alignment(format!(
                "Training frequency {} differs from test frequency {}",
                step, test_step
            )));
        }
    }

    let expected = future_timestamps(last, 1, step)?;
    if expected.first() != Some(&first) {
        return Err(EvalError::Alignment(format!(
            "Test span starts at {}, expected {}",
            first, expected[0]
        )));
    }
    Ok(())
}

fn check_train_length(required: usize, actual: usize) -> Result<()> {
    let required = required.max(1);
    if actual < required {
        return Err(EvalError::InsufficientData { required, actual });
    }
    Ok(())
}

fn check_not_empty(series: &Series, what: &str) -> Result<()> {
    if series.is_empty() {
        return Err(EvalError::MalformedSeries(format!("{} is empty", what)));
    }
    Ok(())
}

/// Emptiness, minimum length and family checks, before the technique is touched
fn validate(technique: &AnyTechnique, split: &DatasetSplit) -> Result<()> {
    if technique.family() != split.family() {
        return Err(EvalError::InvalidParameter(format!(
            "{} technique cannot run on a {} split",
            technique.family(),
            split.family()
        )));
    }

    check_train_length(technique.min_training_length(), split.train_len())?;

    match split {
        DatasetSplit::Forecasting { test, .. } | DatasetSplit::AnomalyDetection { test, .. } => {
            check_not_empty(test, "Test series")
        }
        DatasetSplit::Classification { train, test, .. } => {
            for instance in train {
                check_not_empty(&instance.series, "Training instance")?;
            }
            if test.is_empty() {
                return Err(EvalError::MalformedSeries(
                    "No test instances".to_string(),
                ));
            }
            test.iter()
                .try_for_each(|series| check_not_empty(series, "Test instance"))
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Fit on the current thread, turning a panic into a technique error
fn fit_inline(
    mut technique: AnyTechnique,
    split: &DatasetSplit,
    ctx: &FitContext,
) -> Result<AnyTechnique> {
    let outcome = catch_unwind(AssertUnwindSafe(|| match (&mut technique, split) {
        (AnyTechnique::Forecaster(t), DatasetSplit::Forecasting { train, .. }) => t.fit(train, ctx),
        (AnyTechnique::AnomalyDetector(t), DatasetSplit::AnomalyDetection { train, .. }) => {
            t.fit(train, ctx)
        }
        (AnyTechnique::Classifier(t), DatasetSplit::Classification { train, .. }) => {
            t.fit(train, ctx)
        }
        _ => Err(family_mismatch(split)),
    }));

    match outcome {
        Ok(Ok(())) => Ok(technique),
        Ok(Err(err)) => Err(err),
        Err(payload) => Err(EvalError::Technique(format!(
            "fit panicked: {}",
            panic_message(payload)
        ))),
    }
}

/// Fit on a dedicated thread, giving up after `budget`
fn fit_with_timeout(
    technique: AnyTechnique,
    split: &DatasetSplit,
    budget: Duration,
) -> Result<AnyTechnique> {
    let ctx = FitContext::new();
    let worker_ctx = ctx.clone();
    let name = technique.identity().name.clone();
    // Series buffers are shared, so this clone only copies handles and labels
    let split = split.clone();
    let (tx, rx) = mpsc::channel();

    thread::Builder::new()
        .name(format!("fit-{}", name))
        .spawn(move || {
            let result = fit_inline(technique, &split, &worker_ctx);
            // The receiver is gone once the harness has given up
            let _ = tx.send(result);
        })?;

    match rx.recv_timeout(budget) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            ctx.cancel();
            warn!(
                "Fit of '{}' exceeded {:?}; detaching from its thread",
                name, budget
            );
            Err(EvalError::FitTimeout(budget))
        }
        Err(RecvTimeoutError::Disconnected) => Err(EvalError::Technique(format!(
            "fit thread of '{}' exited without a result",
            name
        ))),
    }
}

/// Run inference for the split's family
fn infer(technique: &AnyTechnique, split: &DatasetSplit, threshold: f64) -> Result<RawOutput> {
    let outcome = catch_unwind(AssertUnwindSafe(|| match (technique, split) {
        (AnyTechnique::Forecaster(t), DatasetSplit::Forecasting { train, test, .. }) => {
            Ok(RawOutput::Forecast(t.infer(train, test.len())?))
        }
        (AnyTechnique::AnomalyDetector(t), DatasetSplit::AnomalyDetection { test, .. }) => {
            let output = t.infer(test)?;
            let flags = output.flags_or_threshold(threshold).ok_or_else(|| {
                EvalError::Technique(format!(
                    "{} returned neither scores nor flags",
                    t.name()
                ))
            })?;
            Ok(RawOutput::Anomaly {
                scores: output.scores,
                flags,
            })
        }
        (AnyTechnique::Classifier(t), DatasetSplit::Classification { test, .. }) => {
            let classes = t
                .classes()
                .ok_or_else(|| {
                    EvalError::InvalidState(format!("{} has no label set", t.name()))
                })?
                .to_vec();
            let outputs = test
                .iter()
                .map(|series| t.infer(series))
                .collect::<Result<Vec<_>>>()?;
            Ok(RawOutput::Classification { outputs, classes })
        }
        _ => Err(family_mismatch(split)),
    }));

    outcome.unwrap_or_else(|payload| {
        Err(EvalError::Technique(format!(
            "inference panicked: {}",
            panic_message(payload)
        )))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::techniques::{NaiveLastValue, ZScoreDetector};
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn daily(start_day: u32, values: Vec<f64>) -> Series {
        Series::daily(NaiveDate::from_ymd_opt(2024, 1, start_day).unwrap(), values).unwrap()
    }

    #[test]
    fn test_forecast_run() {
        let registry = MetricRegistry::with_defaults();
        let harness = Harness::new(HarnessConfig::default(), &registry).unwrap();
        let split = DatasetSplit::forecasting(
            "toy",
            daily(1, vec![1.0, 2.0, 3.0, 4.0, 5.0]),
            daily(6, vec![6.0, 4.0]),
        );

        let report = harness
            .evaluate(AnyTechnique::forecaster(NaiveLastValue::new()), &split, None)
            .unwrap();
        assert_relative_eq!(report.score("mae").unwrap(), 1.0);
        assert_eq!(report.dataset(), "toy");
    }

    #[test]
    fn test_family_mismatch_fails_validation() {
        let registry = MetricRegistry::with_defaults();
        let harness = Harness::new(HarnessConfig::default(), &registry).unwrap();
        let split = DatasetSplit::forecasting("toy", daily(1, vec![1.0, 2.0]), daily(3, vec![3.0]));

        let err = harness
            .evaluate(
                AnyTechnique::anomaly_detector(ZScoreDetector::new(3.0).unwrap()),
                &split,
                None,
            )
            .unwrap_err();
        assert_eq!(err.stage, Stage::Validate);
        assert!(matches!(err.kind(), EvalError::InvalidParameter(_)));
    }

    #[test]
    fn test_discontinuous_test_span() {
        let registry = MetricRegistry::with_defaults();
        let harness = Harness::new(HarnessConfig::default(), &registry).unwrap();
        // Gap of one day between train and test
        let split = DatasetSplit::forecasting(
            "gap",
            daily(1, vec![1.0, 2.0, 3.0]),
            daily(5, vec![4.0, 5.0]),
        );

        let err = harness
            .evaluate(AnyTechnique::forecaster(NaiveLastValue::new()), &split, None)
            .unwrap_err();
        assert_eq!(err.stage, Stage::Align);
        assert!(matches!(err.kind(), EvalError::Alignment(_)));

        let lenient = Harness::new(
            HarnessConfig {
                check_frequency: false,
                ..HarnessConfig::default()
            },
            &registry,
        )
        .unwrap();
        assert!(lenient
            .evaluate(AnyTechnique::forecaster(NaiveLastValue::new()), &split, None)
            .is_ok());
    }
}
