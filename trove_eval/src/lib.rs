//! # Trove Eval
//!
//! A harness for evaluating time series techniques under one uniform contract.
//!
//! ## Features
//!
//! - Validated, immutable time series (`Series`)
//! - Capability traits for forecasters, anomaly detectors and classifiers
//! - A metric registry with standard metrics per task family
//! - An evaluation harness with fit timeouts and a fixed-size worker pool
//! - Result reports exportable as key-value text, JSON and CSV
//! - Exploratory summaries of a series' time index and value distribution
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use trove_eval::harness::{DatasetSplit, Harness};
//! use trove_eval::techniques::NaiveLastValue;
//! use trove_eval::{AnyTechnique, HarnessConfig, MetricRegistry, Series};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let series = Series::daily(start, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 4.0])?;
//! let (train, test) = series.split_at(5)?;
//!
//! let registry = MetricRegistry::with_defaults();
//! let harness = Harness::new(HarnessConfig::default(), &registry)?;
//! let split = DatasetSplit::forecasting("toy", train, test);
//!
//! let report = harness.evaluate(AnyTechnique::forecaster(NaiveLastValue::new()), &split, None)?;
//! assert_eq!(report.score("mae"), Some(1.0));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod eda;
pub mod error;
pub mod harness;
pub mod metrics;
pub mod report;
pub mod series;
pub mod technique;
pub mod techniques;
pub mod utils;

// Re-export commonly used types
pub use crate::config::HarnessConfig;
pub use crate::error::{EvalError, Result, RunError, Stage};
pub use crate::harness::{DatasetSplit, EvaluationJob, Harness};
pub use crate::metrics::{
    global_registry, init_global_registry, Direction, GroundTruth, Metric, MetricRegistry,
    Outcome, ScoreMap,
};
pub use crate::report::ResultReport;
pub use crate::series::Series;
pub use crate::technique::{
    AnomalyDetector, AnomalyOutput, AnyTechnique, ClassOutput, Classifier, FitContext,
    Forecaster, LabeledSeries, ParamValue, TaskFamily, Technique, TechniqueIdentity,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
