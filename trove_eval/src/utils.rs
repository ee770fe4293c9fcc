//! Utility functions for the trove_eval crate

use crate::error::{EvalError, Result};
use crate::series::Series;
use chrono::{DateTime, Duration, Utc};

/// Split a series into training and test spans, the test span taking the
/// last `test_ratio` of the observations
pub fn train_test_split(series: &Series, test_ratio: f64) -> Result<(Series, Series)> {
    if !(test_ratio > 0.0 && test_ratio < 1.0) {
        return Err(EvalError::InvalidParameter(format!(
            "Test ratio must be in (0, 1), got {}",
            test_ratio
        )));
    }

    let test_size = (series.len() as f64 * test_ratio).round() as usize;
    if test_size == 0 || test_size >= series.len() {
        return Err(EvalError::InsufficientData {
            required: 2,
            actual: series.len(),
        });
    }

    series.split_at(series.len() - test_size)
}

/// Parse a frequency alias such as "daily" or "1h"
pub fn parse_frequency(frequency: &str) -> Result<Duration> {
    match frequency {
        "daily" | "d" | "1d" => Ok(Duration::days(1)),
        "weekly" | "w" | "1w" => Ok(Duration::weeks(1)),
        "hourly" | "h" | "1h" => Ok(Duration::hours(1)),
        "minute" | "min" | "1min" => Ok(Duration::minutes(1)),
        "second" | "s" | "1s" => Ok(Duration::seconds(1)),
        _ => Err(EvalError::InvalidParameter(format!(
            "Unsupported frequency: {}",
            frequency
        ))),
    }
}

/// The `horizon` timestamps following `last` at a fixed step
pub fn future_timestamps(
    last: DateTime<Utc>,
    horizon: usize,
    step: Duration,
) -> Result<Vec<DateTime<Utc>>> {
    if step <= Duration::zero() {
        return Err(EvalError::InvalidParameter(
            "Step must be positive".to_string(),
        ));
    }

    let mut timestamps = Vec::with_capacity(horizon);
    let mut current = last;
    for _ in 0..horizon {
        current = current.checked_add_signed(step).ok_or_else(|| {
            EvalError::InvalidParameter("Timestamp overflow".to_string())
        })?;
        timestamps.push(current);
    }

    Ok(timestamps)
}
