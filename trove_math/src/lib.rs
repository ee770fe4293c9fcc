//! # Trove Math
//!
//! Numeric kernels shared by the evaluation harness and the reference
//! techniques. This crate provides:
//!
//! - Descriptive statistics (mean, variance, quantiles, skewness, kurtosis)
//! - Sample autocorrelation and partial autocorrelation
//! - Rolling and exponential smoothing
//! - Distances between equal-length vectors
//! - Ordinary least squares and the augmented Dickey-Fuller test

use thiserror::Error;

pub mod autocorrelation;
pub mod descriptive;
pub mod distance;
pub mod regression;
pub mod smoothing;
pub mod stationarity;

pub use autocorrelation::{acf, pacf};
pub use descriptive::{kurtosis, mean, quantile, skewness, std_dev, variance};
pub use distance::euclidean;
pub use regression::{ols, OlsFit};
pub use smoothing::{exponential_level, SimpleMovingAverage};
pub use stationarity::{adf, AdfTest, CriticalValues};

/// Errors that can occur in numeric calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for numeric operations
pub type Result<T> = std::result::Result<T, MathError>;
