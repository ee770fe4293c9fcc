//! # ts_trove
//!
//! Umbrella crate for the time series evaluation workspace.
//!
//! - [`eval`]: series, technique interfaces, metrics, the evaluation harness
//!   and result reports
//! - [`math`]: the numeric kernels behind them
//!
//! ## Example
//!
//! ```
//! use ts_trove::eval::techniques::NaiveLastValue;
//! use ts_trove::eval::{Forecaster, Series};
//!
//! let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let train = Series::daily(start, vec![1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
//!
//! let mut model = NaiveLastValue::new();
//! assert_eq!(model.fit_predict(&train, 2).unwrap(), vec![5.0, 5.0]);
//! ```

pub use trove_eval as eval;
pub use trove_math as math;

pub use trove_eval::{
    AnyTechnique, DatasetSplit, EvalError, Harness, HarnessConfig, MetricRegistry, ResultReport,
    RunError, Series, TaskFamily,
};
