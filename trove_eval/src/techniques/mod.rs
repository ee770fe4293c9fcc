//! Reference techniques for each task family
//!
//! These are simple baselines. They exercise the harness end to
//! end and give a floor that more elaborate techniques should beat.

pub mod anomaly;
pub mod classification;
pub mod forecasting;

pub use anomaly::{IqrDetector, ZScoreDetector};
pub use classification::{MajorityClass, NearestCentroid};
pub use forecasting::{ExponentialSmoothing, MovingAverageForecaster, NaiveLastValue, SeasonalNaive};

use crate::error::{EvalError, Result};

pub(crate) fn not_fitted(name: &str) -> EvalError {
    EvalError::InvalidState(format!("{} must be fitted before inference", name))
}

pub(crate) fn check_horizon(horizon: usize) -> Result<()> {
    if horizon == 0 {
        return Err(EvalError::InvalidParameter(
            "Horizon must be a positive integer".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn check_length(required: usize, actual: usize) -> Result<()> {
    if actual < required {
        return Err(EvalError::InsufficientData { required, actual });
    }
    Ok(())
}
