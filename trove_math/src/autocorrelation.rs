//! Sample autocorrelation and partial autocorrelation functions

use crate::descriptive::mean;
use crate::{MathError, Result};

/// Sample autocorrelation at lags `0..=nlags`.
///
/// Autocovariances use the biased `1/n` normalisation, so the first value is
/// always 1.0. `nlags` must be smaller than the series length.
pub fn acf(values: &[f64], nlags: usize) -> Result<Vec<f64>> {
    if values.len() < 2 {
        return Err(MathError::InsufficientData(format!(
            "Autocorrelation requires at least 2 values, got {}",
            values.len()
        )));
    }
    if nlags >= values.len() {
        return Err(MathError::InvalidInput(format!(
            "Number of lags ({}) must be smaller than the series length ({})",
            nlags,
            values.len()
        )));
    }

    let m = mean(values)?;
    let n = values.len() as f64;
    let centred: Vec<f64> = values.iter().map(|v| v - m).collect();

    let autocovariance = |lag: usize| -> f64 {
        centred
            .iter()
            .zip(centred[lag..].iter())
            .map(|(a, b)| a * b)
            .sum::<f64>()
            / n
    };

    let c0 = autocovariance(0);
    if c0.abs() < f64::EPSILON {
        return Err(MathError::CalculationError(
            "Autocorrelation is undefined for a constant series".to_string(),
        ));
    }

    Ok((0..=nlags).map(|lag| autocovariance(lag) / c0).collect())
}

/// Partial autocorrelation at lags `0..=nlags`, from the sample
/// autocorrelations via the Durbin-Levinson recursion
pub fn pacf(values: &[f64], nlags: usize) -> Result<Vec<f64>> {
    let r = acf(values, nlags)?;
    let mut result = vec![1.0];
    let mut phi: Vec<f64> = Vec::with_capacity(nlags);

    for k in 1..=nlags {
        let num = r[k] - (1..k).map(|j| phi[j - 1] * r[k - j]).sum::<f64>();
        let den = 1.0 - (1..k).map(|j| phi[j - 1] * r[j]).sum::<f64>();
        if den.abs() < f64::EPSILON {
            return Err(MathError::CalculationError(format!(
                "Partial autocorrelation is undefined at lag {}",
                k
            )));
        }
        let phi_kk = num / den;

        let previous = phi.clone();
        for j in 1..k {
            phi[j - 1] = previous[j - 1] - phi_kk * previous[k - j - 1];
        }
        phi.push(phi_kk);
        result.push(phi_kk);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_acf_lag_zero_is_one() {
        let values = [1.0, 3.0, 2.0, 5.0, 4.0];
        let result = acf(&values, 2).unwrap();
        assert_eq!(result.len(), 3);
        assert_relative_eq!(result[0], 1.0);
    }

    #[test]
    fn test_acf_alternating_series() {
        let values = [1.0, -1.0, 1.0, -1.0];
        let result = acf(&values, 1).unwrap();
        // c1 = -3/4, c0 = 1
        assert_relative_eq!(result[1], -0.75);
    }

    #[test]
    fn test_pacf_first_lag_matches_acf() {
        let values = [1.0, 3.0, 2.0, 5.0, 4.0, 6.0, 5.0, 8.0];
        let a = acf(&values, 3).unwrap();
        let p = pacf(&values, 3).unwrap();
        assert_eq!(p.len(), 4);
        assert_relative_eq!(p[0], 1.0);
        assert_relative_eq!(p[1], a[1]);
        // Second lag from the closed form (r2 - r1^2) / (1 - r1^2)
        assert_relative_eq!(p[2], (a[2] - a[1] * a[1]) / (1.0 - a[1] * a[1]), epsilon = 1e-12);
    }

    #[test]
    fn test_acf_errors() {
        assert!(matches!(acf(&[1.0], 0), Err(MathError::InsufficientData(_))));
        assert!(matches!(acf(&[1.0, 2.0], 2), Err(MathError::InvalidInput(_))));
        assert!(matches!(
            acf(&[2.0, 2.0, 2.0], 1),
            Err(MathError::CalculationError(_))
        ));
    }
}
