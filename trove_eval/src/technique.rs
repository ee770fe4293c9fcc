//! Capability interfaces for fittable techniques
//!
//! Every technique belongs to exactly one [`TaskFamily`] and implements the
//! matching capability trait: [`Forecaster`], [`AnomalyDetector`] or
//! [`Classifier`]. The harness only ever looks at the family tag carried by
//! [`AnyTechnique`], never at the concrete type.
//!
//! Lifecycle: a technique is constructed unfit, `fit` moves it to the fitted
//! state, and `infer` is only valid afterwards. A failed or cancelled fit
//! leaves the technique unfit; refitting replaces all previous state.

use crate::error::{EvalError, Result};
use crate::series::Series;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The three task families a technique can belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskFamily {
    Forecasting,
    AnomalyDetection,
    Classification,
}

impl fmt::Display for TaskFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskFamily::Forecasting => write!(f, "forecasting"),
            TaskFamily::AnomalyDetection => write!(f, "anomaly_detection"),
            TaskFamily::Classification => write!(f, "classification"),
        }
    }
}

/// Value of a single configuration option
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{}", v),
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Text(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<usize> for ParamValue {
    fn from(v: usize) -> Self {
        ParamValue::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Text(v.to_string())
    }
}

/// Fixed identity of a technique: its name and flat configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechniqueIdentity {
    /// Technique name, e.g. "naive-last-value"
    pub name: String,
    /// Configuration options by name
    pub params: BTreeMap<String, ParamValue>,
}

impl TechniqueIdentity {
    /// Identity without parameters
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: BTreeMap::new(),
        }
    }

    /// Add a configuration option
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// Cooperative cancellation handle passed to `fit`.
///
/// Long-running fits should call [`FitContext::checkpoint`] between
/// iterations. Once the harness gives up on a fit (timeout), checkpoints fail
/// with [`EvalError::Cancelled`] so the fit can unwind early. A fit that never
/// checks in keeps running on its detached thread until it returns.
#[derive(Debug, Clone, Default)]
pub struct FitContext {
    cancelled: Arc<AtomicBool>,
}

impl FitContext {
    /// Context that is never cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fail with `Cancelled` once cancellation has been requested
    pub fn checkpoint(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(EvalError::Cancelled);
        }
        Ok(())
    }
}

/// Capabilities shared by every technique
pub trait Technique: Send {
    /// Name and configuration
    fn identity(&self) -> &TechniqueIdentity;

    /// Task family this technique belongs to
    fn family(&self) -> TaskFamily;

    /// Smallest training set the technique accepts
    fn min_training_length(&self) -> usize {
        1
    }

    /// Whether `fit` has completed successfully
    fn is_fitted(&self) -> bool;

    /// Technique name
    fn name(&self) -> &str {
        &self.identity().name
    }
}

/// Predicts future values of a series
pub trait Forecaster: Technique {
    /// Fit on the training series
    fn fit(&mut self, train: &Series, ctx: &FitContext) -> Result<()>;

    /// Predict `horizon` values following `history`, one per future step
    fn infer(&self, history: &Series, horizon: usize) -> Result<Vec<f64>>;

    /// Fit on `train`, then forecast `horizon` steps past its end
    fn fit_predict(&mut self, train: &Series, horizon: usize) -> Result<Vec<f64>> {
        self.fit(train, &FitContext::new())?;
        self.infer(train, horizon)
    }
}

/// Per-point anomaly scores and/or flags
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnomalyOutput {
    /// Anomaly scores, higher means more anomalous
    pub scores: Option<Vec<f64>>,
    /// Boolean anomaly flags
    pub flags: Option<Vec<bool>>,
}

impl AnomalyOutput {
    /// Output carrying only scores
    pub fn from_scores(scores: Vec<f64>) -> Self {
        Self {
            scores: Some(scores),
            flags: None,
        }
    }

    /// Output carrying only flags
    pub fn from_flags(flags: Vec<bool>) -> Self {
        Self {
            scores: None,
            flags: Some(flags),
        }
    }

    /// Flags, deriving them from scores when absent (strictly above threshold)
    pub fn flags_or_threshold(&self, threshold: f64) -> Option<Vec<bool>> {
        match (&self.flags, &self.scores) {
            (Some(flags), _) => Some(flags.clone()),
            (None, Some(scores)) => Some(scores.iter().map(|&s| s > threshold).collect()),
            (None, None) => None,
        }
    }
}

/// Scores every point of a series for anomalousness
pub trait AnomalyDetector: Technique {
    /// Fit on (mostly normal) training data
    fn fit(&mut self, train: &Series, ctx: &FitContext) -> Result<()>;

    /// Scores and/or flags, one per observation of `series`
    fn infer(&self, series: &Series) -> Result<AnomalyOutput>;

    /// Fit on `series` and score it in one go
    fn fit_infer(&mut self, series: &Series) -> Result<AnomalyOutput> {
        self.fit(series, &FitContext::new())?;
        self.infer(series)
    }
}

/// A series instance with its class label
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledSeries {
    pub series: Series,
    pub label: String,
}

impl LabeledSeries {
    /// Pair a series with a label
    pub fn new(series: Series, label: impl Into<String>) -> Self {
        Self {
            series,
            label: label.into(),
        }
    }
}

/// Output of a classifier for one series instance
#[derive(Debug, Clone, PartialEq)]
pub enum ClassOutput {
    /// A single label from the fitted label set
    Label(String),
    /// One score per class, ordered as [`Classifier::classes`]
    Scores(Vec<f64>),
}

impl ClassOutput {
    /// Resolve to a label; scores pick the highest-scoring class (first on ties)
    pub fn resolve(&self, classes: &[String]) -> Result<String> {
        match self {
            ClassOutput::Label(label) => Ok(label.clone()),
            ClassOutput::Scores(scores) => {
                if scores.len() != classes.len() {
                    return Err(EvalError::Alignment(format!(
                        "Got {} class scores for {} classes",
                        scores.len(),
                        classes.len()
                    )));
                }
                let best = scores
                    .iter()
                    .enumerate()
                    .fold(None, |best: Option<(usize, f64)>, (i, &s)| match best {
                        Some((_, b)) if b >= s || s.is_nan() => best,
                        _ => Some((i, s)),
                    })
                    .map(|(i, _)| i)
                    .ok_or_else(|| EvalError::Alignment("No class scores".to_string()))?;
                Ok(classes[best].clone())
            }
        }
    }
}

/// Assigns a label to a whole series
pub trait Classifier: Technique {
    /// Fit on labelled instances; the set of labels seen becomes the label set
    fn fit(&mut self, train: &[LabeledSeries], ctx: &FitContext) -> Result<()>;

    /// Label set established at fit time, `None` while unfit
    fn classes(&self) -> Option<&[String]>;

    /// Label or per-class scores for one instance
    fn infer(&self, series: &Series) -> Result<ClassOutput>;

    /// Fit on `train` and label `series` in one call
    fn fit_infer(&mut self, train: &[LabeledSeries], series: &Series) -> Result<String> {
        self.fit(train, &FitContext::new())?;
        let output = self.infer(series)?;
        let classes = self.classes().ok_or_else(|| {
            EvalError::InvalidState(format!("{} has no label set after fitting", self.name()))
        })?;
        output.resolve(classes)
    }
}

/// A technique tagged with its capability
pub enum AnyTechnique {
    Forecaster(Box<dyn Forecaster>),
    AnomalyDetector(Box<dyn AnomalyDetector>),
    Classifier(Box<dyn Classifier>),
}

impl AnyTechnique {
    /// Wrap a forecaster
    pub fn forecaster(t: impl Forecaster + 'static) -> Self {
        AnyTechnique::Forecaster(Box::new(t))
    }

    /// Wrap an anomaly detector
    pub fn anomaly_detector(t: impl AnomalyDetector + 'static) -> Self {
        AnyTechnique::AnomalyDetector(Box::new(t))
    }

    /// Wrap a classifier
    pub fn classifier(t: impl Classifier + 'static) -> Self {
        AnyTechnique::Classifier(Box::new(t))
    }

    /// Task family of the wrapped technique
    pub fn family(&self) -> TaskFamily {
        match self {
            AnyTechnique::Forecaster(_) => TaskFamily::Forecasting,
            AnyTechnique::AnomalyDetector(_) => TaskFamily::AnomalyDetection,
            AnyTechnique::Classifier(_) => TaskFamily::Classification,
        }
    }

    /// Identity of the wrapped technique
    pub fn identity(&self) -> &TechniqueIdentity {
        match self {
            AnyTechnique::Forecaster(t) => t.identity(),
            AnyTechnique::AnomalyDetector(t) => t.identity(),
            AnyTechnique::Classifier(t) => t.identity(),
        }
    }

    /// Minimum training length of the wrapped technique
    pub fn min_training_length(&self) -> usize {
        match self {
            AnyTechnique::Forecaster(t) => t.min_training_length(),
            AnyTechnique::AnomalyDetector(t) => t.min_training_length(),
            AnyTechnique::Classifier(t) => t.min_training_length(),
        }
    }

    /// Whether the wrapped technique is fitted
    pub fn is_fitted(&self) -> bool {
        match self {
            AnyTechnique::Forecaster(t) => t.is_fitted(),
            AnyTechnique::AnomalyDetector(t) => t.is_fitted(),
            AnyTechnique::Classifier(t) => t.is_fitted(),
        }
    }
}

impl fmt::Debug for AnyTechnique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyTechnique")
            .field("family", &self.family())
            .field("identity", self.identity())
            .field("fitted", &self.is_fitted())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_params() {
        let identity = TechniqueIdentity::new("moving-average")
            .with_param("window", 3usize)
            .with_param("center", false);
        assert_eq!(identity.params.get("window"), Some(&ParamValue::Int(3)));
        assert_eq!(identity.params["center"].to_string(), "false");
    }

    #[test]
    fn test_fit_context_cancellation() {
        let ctx = FitContext::new();
        assert!(ctx.checkpoint().is_ok());
        let shared = ctx.clone();
        shared.cancel();
        assert!(matches!(ctx.checkpoint(), Err(EvalError::Cancelled)));
    }

    #[test]
    fn test_anomaly_output_thresholding() {
        let output = AnomalyOutput::from_scores(vec![0.1, 0.9, 0.5]);
        assert_eq!(
            output.flags_or_threshold(0.5),
            Some(vec![false, true, false])
        );
        assert_eq!(AnomalyOutput::default().flags_or_threshold(0.5), None);

        let flagged = AnomalyOutput::from_flags(vec![true]);
        assert_eq!(flagged.flags_or_threshold(0.5), Some(vec![true]));
    }

    #[test]
    fn test_class_output_resolve() {
        let classes = vec!["A".to_string(), "B".to_string()];
        assert_eq!(
            ClassOutput::Scores(vec![0.2, 0.8]).resolve(&classes).unwrap(),
            "B"
        );
        assert_eq!(
            ClassOutput::Scores(vec![0.5, 0.5]).resolve(&classes).unwrap(),
            "A"
        );
        assert!(ClassOutput::Scores(vec![1.0]).resolve(&classes).is_err());
        assert_eq!(
            ClassOutput::Label("A".to_string()).resolve(&classes).unwrap(),
            "A"
        );
    }
}
