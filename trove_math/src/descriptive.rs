//! Descriptive statistics over slices of floats
//!
//! Definitions follow the conventions used by common dataframe libraries:
//! - `variance` / `std_dev` use the sample (n - 1) denominator
//! - `quantile` interpolates linearly between order statistics
//! - `skewness` is the adjusted Fisher-Pearson coefficient
//! - `kurtosis` is the bias-corrected excess kurtosis

use crate::{MathError, Result};
use num_traits::Float;

fn cast<T: Float>(n: usize) -> Result<T> {
    T::from(n).ok_or_else(|| {
        MathError::CalculationError(format!("Cannot represent {} as a float", n))
    })
}

fn require<T>(values: &[T], needed: usize, what: &str) -> Result<()> {
    if values.len() < needed {
        return Err(MathError::InsufficientData(format!(
            "{} requires at least {} values, got {}",
            what,
            needed,
            values.len()
        )));
    }
    Ok(())
}

/// Arithmetic mean
pub fn mean<T: Float>(values: &[T]) -> Result<T> {
    require(values, 1, "Mean")?;
    let sum = values.iter().fold(T::zero(), |acc, &v| acc + v);
    Ok(sum / cast(values.len())?)
}

/// Sample variance (n - 1 denominator)
pub fn variance<T: Float>(values: &[T]) -> Result<T> {
    require(values, 2, "Variance")?;
    let m = mean(values)?;
    let ss = values
        .iter()
        .fold(T::zero(), |acc, &v| acc + (v - m) * (v - m));
    Ok(ss / cast(values.len() - 1)?)
}

/// Sample standard deviation
pub fn std_dev<T: Float>(values: &[T]) -> Result<T> {
    Ok(variance(values)?.sqrt())
}

/// Quantile with linear interpolation between the two nearest order statistics.
///
/// `q` must lie in `[0, 1]`. NaN values are rejected since they have no order.
pub fn quantile<T: Float>(values: &[T], q: f64) -> Result<T> {
    require(values, 1, "Quantile")?;
    if !(0.0..=1.0).contains(&q) {
        return Err(MathError::InvalidInput(format!(
            "Quantile must be between 0 and 1, got {}",
            q
        )));
    }
    if values.iter().any(|v| v.is_nan()) {
        return Err(MathError::InvalidInput(
            "Quantile is undefined for NaN values".to_string(),
        ));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = T::from(position - lower as f64).unwrap_or_else(T::zero);

    Ok(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// Sums of centred powers 2..=4, used by the shape statistics
fn centred_power_sums<T: Float>(values: &[T]) -> Result<(T, T, T)> {
    let m = mean(values)?;
    Ok(values.iter().fold(
        (T::zero(), T::zero(), T::zero()),
        |(s2, s3, s4), &v| {
            let d = v - m;
            let d2 = d * d;
            (s2 + d2, s3 + d2 * d, s4 + d2 * d2)
        },
    ))
}

/// Adjusted Fisher-Pearson skewness. A constant series has zero skew.
pub fn skewness<T: Float>(values: &[T]) -> Result<T> {
    require(values, 3, "Skewness")?;
    let (s2, s3, _) = centred_power_sums(values)?;
    if s2 == T::zero() {
        return Ok(T::zero());
    }

    let n: T = cast(values.len())?;
    let one = T::one();
    let two = one + one;
    Ok(n * (n - one).sqrt() / (n - two) * (s3 / s2.powf(T::from(1.5).unwrap_or(one))))
}

/// Bias-corrected excess kurtosis. A constant series has zero kurtosis.
pub fn kurtosis<T: Float>(values: &[T]) -> Result<T> {
    require(values, 4, "Kurtosis")?;
    let (s2, _, s4) = centred_power_sums(values)?;
    if s2 == T::zero() {
        return Ok(T::zero());
    }

    let n: T = cast(values.len())?;
    let one = T::one();
    let two = one + one;
    let three = two + one;
    let denom = (n - two) * (n - three);
    let adj = three * (n - one) * (n - one) / denom;
    Ok(n * (n + one) * (n - one) * s4 / (denom * s2 * s2) - adj)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_and_variance() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(mean(&values).unwrap(), 5.0);
        assert_relative_eq!(variance(&values).unwrap(), 32.0 / 7.0);
        assert_relative_eq!(std_dev(&values).unwrap(), (32.0f64 / 7.0).sqrt());
    }

    #[test]
    fn test_works_for_f32() {
        let values = [1.0f32, 2.0, 3.0];
        assert_relative_eq!(mean(&values).unwrap(), 2.0f32);
    }

    #[test]
    fn test_quantile_interpolates() {
        let values = [4.0, 1.0, 3.0, 2.0];
        assert_relative_eq!(quantile(&values, 0.0).unwrap(), 1.0);
        assert_relative_eq!(quantile(&values, 0.25).unwrap(), 1.75);
        assert_relative_eq!(quantile(&values, 0.5).unwrap(), 2.5);
        assert_relative_eq!(quantile(&values, 1.0).unwrap(), 4.0);
    }

    #[test]
    fn test_quantile_rejects_out_of_range() {
        assert!(matches!(
            quantile(&[1.0, 2.0], 1.5),
            Err(MathError::InvalidInput(_))
        ));
        assert!(matches!(
            quantile(&[1.0, f64::NAN], 0.5),
            Err(MathError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_shape_statistics() {
        // Symmetric data has no skew
        let symmetric = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_relative_eq!(skewness(&symmetric).unwrap(), 0.0);
        // Uniform-like data is platykurtic: pandas gives -1.2 for 1..=5
        assert_relative_eq!(kurtosis(&symmetric).unwrap(), -1.2, epsilon = 1e-12);

        let skewed = [1.0, 1.0, 1.0, 10.0];
        assert!(skewness(&skewed).unwrap() > 0.0);
    }

    #[test]
    fn test_constant_series_shape() {
        let constant = [3.0; 6];
        assert_eq!(skewness(&constant).unwrap(), 0.0);
        assert_eq!(kurtosis(&constant).unwrap(), 0.0);
    }

    #[test]
    fn test_insufficient_data() {
        let empty: [f64; 0] = [];
        assert!(matches!(mean(&empty), Err(MathError::InsufficientData(_))));
        assert!(matches!(variance(&[1.0]), Err(MathError::InsufficientData(_))));
        assert!(matches!(
            kurtosis(&[1.0, 2.0, 3.0]),
            Err(MathError::InsufficientData(_))
        ));
    }
}
