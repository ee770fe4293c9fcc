//! Metric registry: scoring functions per task family
//!
//! Each [`Metric`] pairs a name and a comparison [`Direction`] with a kernel.
//! The kernel variant fixes the task family, so a forecasting kernel can never
//! be registered under classification by mistake. Kernels must be pure: the
//! same inputs always give the same score.
//!
//! When a single kernel fails (returns an error, a non-finite value, or
//! panics) its score is recorded as `NaN` and the remaining metrics are still
//! computed. Shape problems are different: a length mismatch between predicted
//! and actual values fails the whole call with [`EvalError::Alignment`].

pub mod anomaly;
pub mod classification;
pub mod forecast;

pub use classification::ConfusionMatrix;

use crate::error::{EvalError, Result};
use crate::technique::TaskFamily;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};
use thiserror::Error;

/// Failure of an individual metric; downgraded to a `NaN` score
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetricError {
    #[error("Division by zero: {0}")]
    DivisionByZero(String),

    #[error("Metric undefined: {0}")]
    Undefined(String),
}

/// Result of a metric kernel
pub type MetricResult = std::result::Result<f64, MetricError>;

/// Per-metric scores of one run, ordered by metric name
pub type ScoreMap = BTreeMap<String, f64>;

/// Whether larger or smaller scores are better
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    HigherIsBetter,
    LowerIsBetter,
}

impl Direction {
    /// Whether score `a` is strictly better than `b`; NaN is never better
    pub fn is_better(&self, a: f64, b: f64) -> bool {
        if a.is_nan() {
            return false;
        }
        if b.is_nan() {
            return true;
        }
        match self {
            Direction::HigherIsBetter => a > b,
            Direction::LowerIsBetter => a < b,
        }
    }
}

/// Inputs to an anomaly-detection kernel
#[derive(Debug, Clone, Copy)]
pub struct AnomalyInput<'a> {
    /// Per-point scores, when the technique produced them
    pub scores: Option<&'a [f64]>,
    /// Predicted anomaly flags
    pub predicted: &'a [bool],
    /// Ground-truth anomaly flags
    pub actual: &'a [bool],
}

/// Inputs to a classification kernel
#[derive(Debug, Clone, Copy)]
pub struct ClassificationInput<'a> {
    /// Predicted label per instance
    pub predicted: &'a [String],
    /// Ground-truth label per instance
    pub actual: &'a [String],
    /// Label set established at fit time
    pub classes: &'a [String],
}

type ForecastFn = Arc<dyn Fn(&[f64], &[f64]) -> MetricResult + Send + Sync>;
type AnomalyFn = Arc<dyn Fn(&AnomalyInput<'_>) -> MetricResult + Send + Sync>;
type ClassificationFn = Arc<dyn Fn(&ClassificationInput<'_>) -> MetricResult + Send + Sync>;

/// Scoring function, tagged by the task family it applies to
#[derive(Clone)]
pub enum MetricKernel {
    /// `(predicted, actual)` over aligned values
    Forecast(ForecastFn),
    Anomaly(AnomalyFn),
    Classification(ClassificationFn),
}

impl MetricKernel {
    /// Task family this kernel scores
    pub fn family(&self) -> TaskFamily {
        match self {
            MetricKernel::Forecast(_) => TaskFamily::Forecasting,
            MetricKernel::Anomaly(_) => TaskFamily::AnomalyDetection,
            MetricKernel::Classification(_) => TaskFamily::Classification,
        }
    }
}

/// A named scoring function
#[derive(Clone)]
pub struct Metric {
    name: String,
    direction: Direction,
    kernel: MetricKernel,
}

impl Metric {
    /// Forecasting metric over `(predicted, actual)`
    pub fn forecast<F>(name: impl Into<String>, direction: Direction, f: F) -> Self
    where
        F: Fn(&[f64], &[f64]) -> MetricResult + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            direction,
            kernel: MetricKernel::Forecast(Arc::new(f)),
        }
    }

    /// Anomaly-detection metric
    pub fn anomaly<F>(name: impl Into<String>, direction: Direction, f: F) -> Self
    where
        F: Fn(&AnomalyInput<'_>) -> MetricResult + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            direction,
            kernel: MetricKernel::Anomaly(Arc::new(f)),
        }
    }

    /// Classification metric
    pub fn classification<F>(name: impl Into<String>, direction: Direction, f: F) -> Self
    where
        F: Fn(&ClassificationInput<'_>) -> MetricResult + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            direction,
            kernel: MetricKernel::Classification(Arc::new(f)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn family(&self) -> TaskFamily {
        self.kernel.family()
    }

    /// Run the kernel, turning any failure into `NaN`
    fn evaluate(&self, inputs: &Inputs<'_>) -> f64 {
        let outcome = catch_unwind(AssertUnwindSafe(|| match (&self.kernel, inputs) {
            (MetricKernel::Forecast(f), Inputs::Forecast(predicted, actual)) => f(predicted, actual),
            (MetricKernel::Anomaly(f), Inputs::Anomaly(input)) => f(input),
            (MetricKernel::Classification(f), Inputs::Classification(input)) => f(input),
            _ => Err(MetricError::Undefined(
                "Kernel does not match the task family".to_string(),
            )),
        }));

        match outcome {
            Ok(Ok(score)) if score.is_finite() => score,
            Ok(Ok(score)) => {
                warn!("Metric '{}' produced non-finite score {}", self.name, score);
                f64::NAN
            }
            Ok(Err(err)) => {
                warn!("Metric '{}' failed, recording NaN: {}", self.name, err);
                f64::NAN
            }
            Err(_) => {
                warn!("Metric '{}' panicked, recording NaN", self.name);
                f64::NAN
            }
        }
    }
}

impl fmt::Debug for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metric")
            .field("name", &self.name)
            .field("family", &self.family())
            .field("direction", &self.direction)
            .finish()
    }
}

/// Technique output to be scored, tagged by task family
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Forecast values, one per horizon step
    Forecast(Vec<f64>),
    /// Per-point flags with optional scores
    Anomaly {
        scores: Option<Vec<f64>>,
        flags: Vec<bool>,
    },
    /// Per-instance predicted labels with the fitted label set
    Classification {
        predicted: Vec<String>,
        classes: Vec<String>,
    },
}

impl Outcome {
    pub fn family(&self) -> TaskFamily {
        match self {
            Outcome::Forecast(_) => TaskFamily::Forecasting,
            Outcome::Anomaly { .. } => TaskFamily::AnomalyDetection,
            Outcome::Classification { .. } => TaskFamily::Classification,
        }
    }
}

/// Ground truth to score against, tagged by task family
#[derive(Debug, Clone, PartialEq)]
pub enum GroundTruth {
    /// Observed future values
    Values(Vec<f64>),
    /// Actual anomaly flags per point
    AnomalyLabels(Vec<bool>),
    /// Actual label per instance
    Labels(Vec<String>),
}

impl GroundTruth {
    pub fn family(&self) -> TaskFamily {
        match self {
            GroundTruth::Values(_) => TaskFamily::Forecasting,
            GroundTruth::AnomalyLabels(_) => TaskFamily::AnomalyDetection,
            GroundTruth::Labels(_) => TaskFamily::Classification,
        }
    }
}

/// Validated, borrowed kernel inputs
enum Inputs<'a> {
    Forecast(&'a [f64], &'a [f64]),
    Anomaly(AnomalyInput<'a>),
    Classification(ClassificationInput<'a>),
}

fn check_lengths(what: &str, predicted: usize, actual: usize) -> Result<()> {
    if predicted != actual {
        return Err(EvalError::Alignment(format!(
            "Predicted {} has length {}, actual has length {}",
            what, predicted, actual
        )));
    }
    Ok(())
}

fn check_labels(labels: &[String], classes: &[String]) -> Result<()> {
    match labels.iter().find(|label| !classes.contains(label)) {
        Some(label) => Err(EvalError::UnknownLabel {
            label: label.clone(),
            known: classes.to_vec(),
        }),
        None => Ok(()),
    }
}

/// Align predicted with actual values, enforcing the family's shape rules
fn align<'a>(
    family: TaskFamily,
    predicted: &'a Outcome,
    actual: &'a GroundTruth,
) -> Result<Inputs<'a>> {
    if predicted.family() != family || actual.family() != family {
        return Err(EvalError::Alignment(format!(
            "Cannot score {} output against {} ground truth as {}",
            predicted.family(),
            actual.family(),
            family
        )));
    }

    match (predicted, actual) {
        (Outcome::Forecast(p), GroundTruth::Values(a)) => {
            check_lengths("values", p.len(), a.len())?;
            Ok(Inputs::Forecast(p, a))
        }
        (Outcome::Anomaly { scores, flags }, GroundTruth::AnomalyLabels(a)) => {
            check_lengths("flags", flags.len(), a.len())?;
            if let Some(scores) = scores {
                check_lengths("scores", scores.len(), a.len())?;
            }
            Ok(Inputs::Anomaly(AnomalyInput {
                scores: scores.as_deref(),
                predicted: flags,
                actual: a,
            }))
        }
        (Outcome::Classification { predicted, classes }, GroundTruth::Labels(a)) => {
            check_lengths("labels", predicted.len(), a.len())?;
            check_labels(a, classes)?;
            check_labels(predicted, classes)?;
            Ok(Inputs::Classification(ClassificationInput {
                predicted,
                actual: a,
                classes,
            }))
        }
        _ => Err(EvalError::Alignment(
            "Predicted output and ground truth belong to different task families".to_string(),
        )),
    }
}

/// Set of metrics per task family.
///
/// Populate it once at start-up; after that it is only read, and can be
/// shared freely between concurrent evaluations.
#[derive(Debug, Clone, Default)]
pub struct MetricRegistry {
    metrics: BTreeMap<TaskFamily, Vec<Metric>>,
}

impl MetricRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the standard metrics for every family
    pub fn with_defaults() -> Self {
        use Direction::{HigherIsBetter, LowerIsBetter};

        let defaults = [
            Metric::forecast("mae", LowerIsBetter, forecast::mean_absolute_error),
            Metric::forecast("mse", LowerIsBetter, forecast::mean_squared_error),
            Metric::forecast("rmse", LowerIsBetter, forecast::root_mean_squared_error),
            Metric::forecast("mape", LowerIsBetter, forecast::mean_absolute_percentage_error),
            Metric::forecast(
                "smape",
                LowerIsBetter,
                forecast::symmetric_mean_absolute_percentage_error,
            ),
            Metric::anomaly("precision", HigherIsBetter, anomaly::precision),
            Metric::anomaly("recall", HigherIsBetter, anomaly::recall),
            Metric::anomaly("f1", HigherIsBetter, anomaly::f1),
            Metric::anomaly("accuracy", HigherIsBetter, anomaly::accuracy),
            Metric::anomaly("roc_auc", HigherIsBetter, anomaly::roc_auc),
            Metric::classification("accuracy", HigherIsBetter, classification::accuracy),
            Metric::classification("macro_precision", HigherIsBetter, classification::macro_precision),
            Metric::classification("macro_recall", HigherIsBetter, classification::macro_recall),
            Metric::classification("macro_f1", HigherIsBetter, classification::macro_f1),
        ];

        let mut registry = Self::new();
        for metric in defaults {
            // Names above are unique per family
            let family = metric.family();
            registry.metrics.entry(family).or_default().push(metric);
        }
        registry
    }

    /// Add a metric; fails if its name is already taken within its family
    pub fn register(&mut self, metric: Metric) -> Result<()> {
        let family = metric.family();
        let entries = self.metrics.entry(family).or_default();
        if entries.iter().any(|m| m.name == metric.name) {
            return Err(EvalError::DuplicateMetric {
                family,
                name: metric.name,
            });
        }
        entries.push(metric);
        Ok(())
    }

    /// Metrics registered for a family, in registration order
    pub fn metrics(&self, family: TaskFamily) -> &[Metric] {
        self.metrics.get(&family).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Look up a metric by family and name
    pub fn get(&self, family: TaskFamily, name: &str) -> Option<&Metric> {
        self.metrics(family).iter().find(|m| m.name == name)
    }

    /// Comparison direction of a metric
    pub fn direction(&self, family: TaskFamily, name: &str) -> Option<Direction> {
        self.get(family, name).map(Metric::direction)
    }

    /// Compute every metric registered for `family`.
    ///
    /// Fails with `Alignment` on a shape mismatch and `UnknownLabel` on a label
    /// outside the fitted label set. Individual metric failures become `NaN`.
    pub fn score(
        &self,
        family: TaskFamily,
        predicted: &Outcome,
        actual: &GroundTruth,
    ) -> Result<ScoreMap> {
        let inputs = align(family, predicted, actual)?;
        Ok(self
            .metrics(family)
            .iter()
            .map(|metric| (metric.name.clone(), metric.evaluate(&inputs)))
            .collect())
    }
}

static GLOBAL_REGISTRY: OnceLock<MetricRegistry> = OnceLock::new();

/// Install the process-wide registry. Only the first call succeeds, and only
/// if nothing has read the global registry yet.
pub fn init_global_registry(registry: MetricRegistry) -> Result<()> {
    GLOBAL_REGISTRY
        .set(registry)
        .map_err(|_| EvalError::Config("Global metric registry is already initialised".to_string()))
}

/// The process-wide registry; installs the defaults on first use if
/// [`init_global_registry`] was never called
pub fn global_registry() -> &'static MetricRegistry {
    GLOBAL_REGISTRY.get_or_init(MetricRegistry::with_defaults)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_forecast_scores() {
        let registry = MetricRegistry::with_defaults();
        let scores = registry
            .score(
                TaskFamily::Forecasting,
                &Outcome::Forecast(vec![5.0, 5.0]),
                &GroundTruth::Values(vec![6.0, 4.0]),
            )
            .unwrap();
        assert_relative_eq!(scores["mae"], 1.0);
        assert_relative_eq!(scores["rmse"], 1.0);
        assert_eq!(scores.len(), 5);
    }

    #[test]
    fn test_duplicate_metric() {
        let mut registry = MetricRegistry::new();
        registry
            .register(Metric::forecast("mae", Direction::LowerIsBetter, forecast::mean_absolute_error))
            .unwrap();
        let err = registry
            .register(Metric::forecast("mae", Direction::LowerIsBetter, forecast::mean_squared_error))
            .unwrap_err();
        assert!(matches!(err, EvalError::DuplicateMetric { .. }));

        // Same name in another family is fine
        registry
            .register(Metric::classification("mae", Direction::LowerIsBetter, |_| Ok(0.0)))
            .unwrap();
    }

    #[test]
    fn test_panicking_metric_is_isolated() {
        let mut registry = MetricRegistry::new();
        registry
            .register(Metric::forecast("boom", Direction::LowerIsBetter, |_, _| {
                panic!("kernel bug")
            }))
            .unwrap();
        registry
            .register(Metric::forecast("mae", Direction::LowerIsBetter, forecast::mean_absolute_error))
            .unwrap();

        let scores = registry
            .score(
                TaskFamily::Forecasting,
                &Outcome::Forecast(vec![1.0]),
                &GroundTruth::Values(vec![2.0]),
            )
            .unwrap();
        assert!(scores["boom"].is_nan());
        assert_relative_eq!(scores["mae"], 1.0);
    }

    #[test]
    fn test_family_mismatch_is_alignment_error() {
        let registry = MetricRegistry::with_defaults();
        let result = registry.score(
            TaskFamily::Classification,
            &Outcome::Forecast(vec![1.0]),
            &GroundTruth::Values(vec![1.0]),
        );
        assert!(matches!(result, Err(EvalError::Alignment(_))));
    }

    #[test]
    fn test_direction_comparison() {
        assert!(Direction::LowerIsBetter.is_better(1.0, 2.0));
        assert!(Direction::HigherIsBetter.is_better(2.0, 1.0));
        assert!(!Direction::HigherIsBetter.is_better(f64::NAN, 1.0));
        assert!(Direction::HigherIsBetter.is_better(0.0, f64::NAN));
    }
}
