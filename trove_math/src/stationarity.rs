//! Augmented Dickey-Fuller unit root test
//!
//! The test regresses the first difference on a constant, the lagged level
//! and `p` lagged differences:
//!
//! ```text
//! Δy[t] = c + γ·y[t-1] + Σ_{i=1..p} β_i·Δy[t-i] + ε[t]
//! ```
//!
//! and reports the t statistic of `γ`. The lag order `p` is chosen by AIC
//! over `0..=max_lag` on a common sample. p-values and critical values use
//! MacKinnon's response surfaces for a single series with a constant.

use crate::regression::{ols, OlsFit};
use crate::{MathError, Result};
use statrs::function::erf::erfc;

/// MacKinnon (2010) critical value coefficients at 1%, 5% and 10%, as
/// polynomials in `1/nobs`
const CRITICAL_SURFACE: [[f64; 4]; 3] = [
    [-3.43035, -6.5393, -16.786, -79.433],
    [-2.86154, -2.8903, -4.234, -40.040],
    [-2.56677, -1.5384, -2.809, 0.0],
];

/// MacKinnon (1994) p-value polynomial for statistics at or below `TAU_STAR`
const SMALL_P: [f64; 3] = [2.1659, 1.4412, 3.8269e-2];
/// MacKinnon (1994) p-value polynomial for statistics above `TAU_STAR`
const LARGE_P: [f64; 4] = [1.7339, 9.3202e-1, -1.2745e-1, -1.0368e-2];
const TAU_STAR: f64 = -1.61;
const TAU_MIN: f64 = -18.83;
const TAU_MAX: f64 = 2.74;

/// Critical values of the test statistic
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CriticalValues {
    pub one_percent: f64,
    pub five_percent: f64,
    pub ten_percent: f64,
}

/// Outcome of an augmented Dickey-Fuller test
#[derive(Debug, Clone, PartialEq)]
pub struct AdfTest {
    /// t statistic of the lagged level
    pub statistic: f64,
    /// Approximate p-value of the unit root hypothesis
    pub p_value: f64,
    /// Number of lagged differences in the final regression
    pub used_lag: usize,
    /// Observations in the final regression
    pub nobs: usize,
    pub critical_values: CriticalValues,
    /// Lowest AIC found during lag selection
    pub ic_best: f64,
}

impl AdfTest {
    /// Whether the unit root is rejected at the 5% level
    pub fn is_stationary(&self) -> bool {
        self.statistic < self.critical_values.five_percent
    }
}

fn polynomial(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

fn standard_normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / std::f64::consts::SQRT_2)
}

/// Approximate p-value of an ADF statistic
pub fn mackinnon_p_value(statistic: f64) -> f64 {
    if statistic > TAU_MAX {
        return 1.0;
    }
    if statistic < TAU_MIN {
        return 0.0;
    }
    let coefficients: &[f64] = if statistic <= TAU_STAR {
        &SMALL_P
    } else {
        &LARGE_P
    };
    standard_normal_cdf(polynomial(coefficients, statistic))
}

/// Finite-sample critical values for a regression on `nobs` observations
pub fn mackinnon_critical_values(nobs: usize) -> CriticalValues {
    let inverse = 1.0 / nobs as f64;
    CriticalValues {
        one_percent: polynomial(&CRITICAL_SURFACE[0], inverse),
        five_percent: polynomial(&CRITICAL_SURFACE[1], inverse),
        ten_percent: polynomial(&CRITICAL_SURFACE[2], inverse),
    }
}

/// Regress `Δy[t]` for `t > skip` on the level, a constant and `lags`
/// lagged differences
fn regress(values: &[f64], diffs: &[f64], lags: usize, skip: usize) -> Result<OlsFit> {
    let rows = skip + 1..values.len();
    let mut regressors = vec![
        rows.clone().map(|t| values[t - 1]).collect::<Vec<f64>>(),
        vec![1.0; rows.len()],
    ];
    for lag in 1..=lags {
        regressors.push(rows.clone().map(|t| diffs[t - 1 - lag]).collect());
    }
    let response: Vec<f64> = rows.map(|t| diffs[t - 1]).collect();
    ols(&regressors, &response)
}

/// Augmented Dickey-Fuller test with a constant.
///
/// `max_lag` bounds the lag search and defaults to `ceil(12 * (n/100)^0.25)`.
/// It may not exceed `n/2 - 2`.
pub fn adf(values: &[f64], max_lag: Option<usize>) -> Result<AdfTest> {
    let n = values.len();
    if n < 4 {
        return Err(MathError::InsufficientData(format!(
            "ADF test requires at least 4 values, got {}",
            n
        )));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(MathError::InvalidInput(
            "ADF test requires finite values".to_string(),
        ));
    }
    if values.windows(2).all(|w| w[0] == w[1]) {
        return Err(MathError::InvalidInput(
            "ADF test is undefined for a constant series".to_string(),
        ));
    }

    let limit = n / 2 - 2;
    let max_lag = match max_lag {
        Some(lag) if lag > limit => {
            return Err(MathError::InvalidInput(format!(
                "Maximum lag must be at most {} for {} values, got {}",
                limit, n, lag
            )))
        }
        Some(lag) => lag,
        None => ((12.0 * (n as f64 / 100.0).powf(0.25)).ceil() as usize).min(limit),
    };

    let diffs: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();

    // Every candidate sees the same observations so their AICs compare
    let mut best: Option<(usize, f64)> = None;
    for lags in 0..=max_lag {
        let aic = regress(values, &diffs, lags, max_lag)?.aic();
        if best.map_or(true, |(_, b)| aic < b) {
            best = Some((lags, aic));
        }
    }
    let (used_lag, ic_best) = best.ok_or_else(|| {
        MathError::CalculationError("No lag order could be evaluated".to_string())
    })?;

    let fit = regress(values, &diffs, used_lag, used_lag)?;
    let statistic = fit.t_value(0).ok_or_else(|| {
        MathError::CalculationError("Missing lagged level coefficient".to_string())
    })?;
    if !statistic.is_finite() {
        return Err(MathError::CalculationError(
            "ADF statistic is not finite; the series is perfectly predictable".to_string(),
        ));
    }

    Ok(AdfTest {
        statistic,
        p_value: mackinnon_p_value(statistic),
        used_lag,
        nobs: fit.nobs,
        critical_values: mackinnon_critical_values(fit.nobs),
        ic_best,
    })
}
