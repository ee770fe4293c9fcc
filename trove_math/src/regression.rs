//! Ordinary least squares
//!
//! Solves the normal equations through a Cholesky factorisation and reports
//! classical standard errors, enough for the regression-based tests built on
//! top of it.

use crate::{MathError, Result};
use nalgebra::{DMatrix, DVector};
use std::f64::consts::PI;

/// Result of an ordinary least squares fit
#[derive(Debug, Clone, PartialEq)]
pub struct OlsFit {
    /// One coefficient per regressor, in regressor order
    pub coefficients: Vec<f64>,
    /// Classical standard error of each coefficient
    pub std_errors: Vec<f64>,
    /// Sum of squared residuals
    pub ssr: f64,
    /// Number of observations
    pub nobs: usize,
}

impl OlsFit {
    /// t statistic of coefficient `index`
    pub fn t_value(&self, index: usize) -> Option<f64> {
        let coefficient = self.coefficients.get(index)?;
        let se = self.std_errors.get(index)?;
        Some(coefficient / se)
    }

    /// Gaussian log-likelihood at the fitted coefficients
    pub fn log_likelihood(&self) -> f64 {
        let n = self.nobs as f64;
        -0.5 * n * ((2.0 * PI).ln() + (self.ssr / n).ln() + 1.0)
    }

    /// Akaike information criterion, counting every coefficient
    pub fn aic(&self) -> f64 {
        -2.0 * self.log_likelihood() + 2.0 * self.coefficients.len() as f64
    }
}

/// Regress `response` on the given regressor columns.
///
/// Every column must have the same length as `response`, and there must be
/// more observations than regressors. Include a column of ones for an
/// intercept.
pub fn ols(regressors: &[Vec<f64>], response: &[f64]) -> Result<OlsFit> {
    let n = response.len();
    let k = regressors.len();
    if k == 0 {
        return Err(MathError::InvalidInput(
            "Regression requires at least one regressor".to_string(),
        ));
    }
    if let Some(column) = regressors.iter().position(|c| c.len() != n) {
        return Err(MathError::InvalidInput(format!(
            "Regressor {} has {} values, expected {}",
            column,
            regressors[column].len(),
            n
        )));
    }
    if n <= k {
        return Err(MathError::InsufficientData(format!(
            "Regression with {} regressors requires more than {} observations, got {}",
            k, k, n
        )));
    }

    let x = DMatrix::from_fn(n, k, |i, j| regressors[j][i]);
    let y = DVector::from_column_slice(response);

    let cholesky = (x.transpose() * &x).cholesky().ok_or_else(|| {
        MathError::CalculationError("Regressors are collinear".to_string())
    })?;
    let beta = cholesky.solve(&(x.transpose() * &y));
    let xtx_inverse = cholesky.inverse();

    let residuals = &y - &x * &beta;
    let ssr = residuals.norm_squared();
    let sigma2 = ssr / (n - k) as f64;

    Ok(OlsFit {
        coefficients: beta.iter().copied().collect(),
        std_errors: (0..k)
            .map(|i| (sigma2 * xtx_inverse[(i, i)]).sqrt())
            .collect(),
        ssr,
        nobs: n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ols_recovers_line() {
        let x: Vec<f64> = (0..6).map(|i| i as f64).collect();
        // y = 1 + 2x with alternating noise of +-0.1
        let y: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, v)| 1.0 + 2.0 * v + if i % 2 == 0 { 0.1 } else { -0.1 })
            .collect();
        let fit = ols(&[vec![1.0; 6], x], &y).unwrap();

        // Noise covaries with x by -0.3 over Sxx = 17.5
        assert_relative_eq!(fit.coefficients[1], 2.0 - 0.3 / 17.5, epsilon = 1e-9);
        assert_relative_eq!(fit.coefficients[0], 6.0 - (2.0 - 0.3 / 17.5) * 2.5, epsilon = 1e-9);
        assert!(fit.ssr > 0.0);
        assert!(fit.t_value(1).unwrap() > 50.0);
        assert_eq!(fit.t_value(2), None);
    }

    #[test]
    fn test_ols_aic_counts_parameters() {
        let fit = OlsFit {
            coefficients: vec![0.0, 0.0],
            std_errors: vec![1.0, 1.0],
            ssr: 10.0,
            nobs: 10,
        };
        // llf = -5 * (ln(2 pi) + ln(1) + 1)
        let llf = -5.0 * ((2.0 * PI).ln() + 1.0);
        assert_relative_eq!(fit.log_likelihood(), llf);
        assert_relative_eq!(fit.aic(), -2.0 * llf + 4.0);
    }

    #[test]
    fn test_ols_rejects_bad_input() {
        assert!(matches!(
            ols(&[], &[1.0, 2.0]),
            Err(MathError::InvalidInput(_))
        ));
        assert!(matches!(
            ols(&[vec![1.0, 1.0]], &[1.0, 2.0, 3.0]),
            Err(MathError::InvalidInput(_))
        ));
        assert!(matches!(
            ols(&[vec![1.0, 1.0], vec![2.0, 3.0]], &[1.0, 2.0]),
            Err(MathError::InsufficientData(_))
        ));
        // Two identical columns
        assert!(matches!(
            ols(&[vec![1.0; 4], vec![1.0; 4]], &[1.0, 2.0, 3.0, 4.0]),
            Err(MathError::CalculationError(_))
        ));
    }
}
