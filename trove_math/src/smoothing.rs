//! Smoothing kernels used by the baseline forecasters
//!
//! - Rolling simple moving average
//! - Simple exponential smoothing level

use crate::{MathError, Result};
use std::collections::VecDeque;

/// Rolling Simple Moving Average over the last `period` values
#[derive(Debug, Clone)]
pub struct SimpleMovingAverage {
    period: usize,
    values: VecDeque<f64>,
    sum: f64,
}

impl SimpleMovingAverage {
    /// Create a new Simple Moving Average with the specified period
    pub fn new(period: usize) -> Result<Self> {
        if period == 0 {
            return Err(MathError::InvalidInput(
                "Period must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            period,
            values: VecDeque::with_capacity(period),
            sum: 0.0,
        })
    }

    /// Push a new value into the window
    pub fn update(&mut self, value: f64) {
        self.values.push_back(value);
        self.sum += value;

        if self.values.len() > self.period {
            if let Some(old_value) = self.values.pop_front() {
                self.sum -= old_value;
            }
        }
    }

    /// Current average, once the window is full
    pub fn value(&self) -> Result<f64> {
        if self.values.len() < self.period {
            return Err(MathError::InsufficientData(format!(
                "Not enough data for SMA calculation. Need {} values, have {}.",
                self.period,
                self.values.len()
            )));
        }

        Ok(self.sum / self.period as f64)
    }
}

/// Final level of simple exponential smoothing, seeded with the first value.
///
/// `alpha` must lie in `(0, 1]`.
pub fn exponential_level(values: &[f64], alpha: f64) -> Result<f64> {
    if !(alpha > 0.0 && alpha <= 1.0) {
        return Err(MathError::InvalidInput(format!(
            "Alpha must be in (0, 1], got {}",
            alpha
        )));
    }
    let (first, rest) = values.split_first().ok_or_else(|| {
        MathError::InsufficientData("Exponential smoothing needs at least 1 value".to_string())
    })?;

    Ok(rest
        .iter()
        .fold(*first, |level, &value| alpha * value + (1.0 - alpha) * level))
}
