//! Error types for the trove_eval crate

use crate::technique::TaskFamily;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use trove_math::MathError;

/// Custom error types for the trove_eval crate
#[derive(Debug, Error)]
pub enum EvalError {
    /// Raw timestamps/values do not form a valid series
    #[error("Malformed series: {0}")]
    MalformedSeries(String),

    /// A technique was used outside its lifecycle (e.g. inference before fit)
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Training data is shorter than the technique can work with
    #[error("Insufficient data: required {required}, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// Fitting exceeded the caller-supplied budget
    #[error("Fit exceeded timeout of {0:?}")]
    FitTimeout(Duration),

    /// Predicted output does not line up with the ground truth
    #[error("Alignment error: {0}")]
    Alignment(String),

    /// A metric with the same name already exists for the task family
    #[error("Duplicate metric '{name}' for {family}")]
    DuplicateMetric { family: TaskFamily, name: String },

    /// A classification label outside the label set established at fit time
    #[error("Unknown label '{label}', known labels: {known:?}")]
    UnknownLabel { label: String, known: Vec<String> },

    /// Cooperative cancellation was requested during fitting
    #[error("Fit cancelled")]
    Cancelled,

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Failure raised from inside a technique
    #[error("Technique error: {0}")]
    Technique(String),

    /// Error from numeric kernels
    #[error("Math error: {0}")]
    Math(#[from] MathError),

    /// Invalid harness configuration
    #[error("Config error: {0}")]
    Config(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from JSON (de)serialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error from CSV export
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, EvalError>;

/// Phase of an evaluation run in which an error surfaced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validate,
    Fit,
    Infer,
    Align,
    Score,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Validate => write!(f, "validate"),
            Stage::Fit => write!(f, "fit"),
            Stage::Infer => write!(f, "infer"),
            Stage::Align => write!(f, "align"),
            Stage::Score => write!(f, "score"),
        }
    }
}

/// An evaluation failure together with the run it belongs to
#[derive(Debug, Error)]
#[error("{stage} stage failed for technique '{technique}' on dataset '{dataset}': {source}")]
pub struct RunError {
    /// Name of the technique under evaluation
    pub technique: String,
    /// Name of the dataset split
    pub dataset: String,
    /// Stage that failed
    pub stage: Stage,
    /// Underlying error, unchanged
    #[source]
    pub source: EvalError,
}

impl RunError {
    /// Create a new run error
    pub fn new(technique: &str, dataset: &str, stage: Stage, source: EvalError) -> Self {
        Self {
            technique: technique.to_string(),
            dataset: dataset.to_string(),
            stage,
            source,
        }
    }

    /// The underlying error
    pub fn kind(&self) -> &EvalError {
        &self.source
    }
}
