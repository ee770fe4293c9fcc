//! Point-forecast accuracy metrics over aligned `(predicted, actual)` pairs

use super::{MetricError, MetricResult};

fn mean_of(values: impl Iterator<Item = f64>, n: usize) -> MetricResult {
    if n == 0 {
        return Err(MetricError::Undefined(
            "No observations to average".to_string(),
        ));
    }
    Ok(values.sum::<f64>() / n as f64)
}

/// Mean Absolute Error
pub fn mean_absolute_error(predicted: &[f64], actual: &[f64]) -> MetricResult {
    mean_of(
        predicted.iter().zip(actual).map(|(p, a)| (p - a).abs()),
        actual.len(),
    )
}

/// Mean Squared Error
pub fn mean_squared_error(predicted: &[f64], actual: &[f64]) -> MetricResult {
    mean_of(
        predicted.iter().zip(actual).map(|(p, a)| (p - a).powi(2)),
        actual.len(),
    )
}

/// Root Mean Squared Error
pub fn root_mean_squared_error(predicted: &[f64], actual: &[f64]) -> MetricResult {
    Ok(mean_squared_error(predicted, actual)?.sqrt())
}

/// Mean Absolute Percentage Error, in percent.
///
/// Undefined when any actual value is zero.
pub fn mean_absolute_percentage_error(predicted: &[f64], actual: &[f64]) -> MetricResult {
    if let Some(pos) = actual.iter().position(|&a| a == 0.0) {
        return Err(MetricError::DivisionByZero(format!(
            "Actual value at index {} is zero",
            pos
        )));
    }
    mean_of(
        predicted
            .iter()
            .zip(actual)
            .map(|(p, a)| ((a - p) / a).abs() * 100.0),
        actual.len(),
    )
}

/// Symmetric Mean Absolute Percentage Error, in percent (0..=200).
///
/// Pairs where both values are zero contribute no error.
pub fn symmetric_mean_absolute_percentage_error(predicted: &[f64], actual: &[f64]) -> MetricResult {
    mean_of(
        predicted.iter().zip(actual).map(|(&p, &a)| {
            let denom = a.abs() + p.abs();
            if denom == 0.0 {
                0.0
            } else {
                200.0 * (a - p).abs() / denom
            }
        }),
        actual.len(),
    )
}
