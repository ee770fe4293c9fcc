//! Baseline forecasters

use super::{check_horizon, check_length, not_fitted};
use crate::error::{EvalError, Result};
use crate::series::Series;
use crate::technique::{FitContext, Forecaster, TaskFamily, Technique, TechniqueIdentity};
use trove_math::{exponential_level, SimpleMovingAverage};

/// Repeats the last observed value for every future step
#[derive(Debug, Clone)]
pub struct NaiveLastValue {
    identity: TechniqueIdentity,
    last_value: Option<f64>,
}

impl NaiveLastValue {
    /// Create an unfit naive forecaster
    pub fn new() -> Self {
        Self {
            identity: TechniqueIdentity::new("naive-last-value"),
            last_value: None,
        }
    }
}

impl Default for NaiveLastValue {
    fn default() -> Self {
        Self::new()
    }
}

impl Technique for NaiveLastValue {
    fn identity(&self) -> &TechniqueIdentity {
        &self.identity
    }

    fn family(&self) -> TaskFamily {
        TaskFamily::Forecasting
    }

    fn is_fitted(&self) -> bool {
        self.last_value.is_some()
    }
}

impl Forecaster for NaiveLastValue {
    fn fit(&mut self, train: &Series, _ctx: &FitContext) -> Result<()> {
        self.last_value = None;
        let values = train.univariate()?;
        self.last_value = Some(*values.last().ok_or(EvalError::InsufficientData {
            required: 1,
            actual: 0,
        })?);
        Ok(())
    }

    fn infer(&self, history: &Series, horizon: usize) -> Result<Vec<f64>> {
        let fitted = self.last_value.ok_or_else(|| not_fitted(self.name()))?;
        check_horizon(horizon)?;

        let last = history.univariate()?.last().copied().unwrap_or(fitted);
        Ok(vec![last; horizon])
    }
}

/// Repeats the last full season of the history
#[derive(Debug, Clone)]
pub struct SeasonalNaive {
    identity: TechniqueIdentity,
    period: usize,
    fitted: bool,
}

impl SeasonalNaive {
    /// Create a seasonal naive forecaster with the given season length
    pub fn new(period: usize) -> Result<Self> {
        if period == 0 {
            return Err(EvalError::InvalidParameter(
                "Season length must be positive".to_string(),
            ));
        }

        Ok(Self {
            identity: TechniqueIdentity::new("seasonal-naive").with_param("period", period),
            period,
            fitted: false,
        })
    }
}

impl Technique for SeasonalNaive {
    fn identity(&self) -> &TechniqueIdentity {
        &self.identity
    }

    fn family(&self) -> TaskFamily {
        TaskFamily::Forecasting
    }

    fn min_training_length(&self) -> usize {
        self.period
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }
}

impl Forecaster for SeasonalNaive {
    fn fit(&mut self, train: &Series, _ctx: &FitContext) -> Result<()> {
        self.fitted = false;
        check_length(self.period, train.univariate()?.len())?;
        self.fitted = true;
        Ok(())
    }

    fn infer(&self, history: &Series, horizon: usize) -> Result<Vec<f64>> {
        if !self.fitted {
            return Err(not_fitted(self.name()));
        }
        check_horizon(horizon)?;

        let values = history.univariate()?;
        check_length(self.period, values.len())?;
        let season = &values[values.len() - self.period..];

        Ok((0..horizon).map(|h| season[h % self.period]).collect())
    }
}

/// Forecasts the mean of the last `window` observations
#[derive(Debug, Clone)]
pub struct MovingAverageForecaster {
    identity: TechniqueIdentity,
    window: usize,
    fitted: bool,
}

impl MovingAverageForecaster {
    /// Create a new moving average forecaster
    pub fn new(window: usize) -> Result<Self> {
        if window == 0 {
            return Err(EvalError::InvalidParameter(
                "Window size must be positive".to_string(),
            ));
        }

        Ok(Self {
            identity: TechniqueIdentity::new("moving-average").with_param("window", window),
            window,
            fitted: false,
        })
    }

    fn average(&self, values: &[f64]) -> Result<f64> {
        let mut sma = SimpleMovingAverage::new(self.window)?;
        for &value in values {
            sma.update(value);
        }
        Ok(sma.value()?)
    }
}

impl Technique for MovingAverageForecaster {
    fn identity(&self) -> &TechniqueIdentity {
        &self.identity
    }

    fn family(&self) -> TaskFamily {
        TaskFamily::Forecasting
    }

    fn min_training_length(&self) -> usize {
        self.window
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }
}

impl Forecaster for MovingAverageForecaster {
    fn fit(&mut self, train: &Series, _ctx: &FitContext) -> Result<()> {
        self.fitted = false;
        check_length(self.window, train.univariate()?.len())?;
        self.fitted = true;
        Ok(())
    }

    fn infer(&self, history: &Series, horizon: usize) -> Result<Vec<f64>> {
        if !self.fitted {
            return Err(not_fitted(self.name()));
        }
        check_horizon(horizon)?;

        let values = history.univariate()?;
        check_length(self.window, values.len())?;
        Ok(vec![self.average(values)?; horizon])
    }
}

/// Simple exponential smoothing with a fixed or fitted smoothing factor
#[derive(Debug, Clone)]
pub struct ExponentialSmoothing {
    identity: TechniqueIdentity,
    /// Fixed alpha; `None` selects alpha by grid search during fit
    alpha: Option<f64>,
    fitted_alpha: Option<f64>,
}

/// Candidate smoothing factors tried by the grid search
const ALPHA_GRID_STEPS: usize = 20;

impl ExponentialSmoothing {
    /// Create a model with a fixed smoothing factor in `(0, 1]`
    pub fn new(alpha: f64) -> Result<Self> {
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(EvalError::InvalidParameter(
                "Alpha must be in (0, 1]".to_string(),
            ));
        }

        Ok(Self {
            identity: TechniqueIdentity::new("exponential-smoothing").with_param("alpha", alpha),
            alpha: Some(alpha),
            fitted_alpha: None,
        })
    }

    /// Create a model that picks alpha minimising one-step-ahead squared error
    pub fn optimized() -> Self {
        Self {
            identity: TechniqueIdentity::new("exponential-smoothing")
                .with_param("alpha", "optimized"),
            alpha: None,
            fitted_alpha: None,
        }
    }

    /// Smoothing factor chosen at fit time
    pub fn fitted_alpha(&self) -> Option<f64> {
        self.fitted_alpha
    }

    fn one_step_sse(values: &[f64], alpha: f64) -> f64 {
        let mut level = values[0];
        let mut sse = 0.0;
        for &value in &values[1..] {
            sse += (value - level).powi(2);
            level = alpha * value + (1.0 - alpha) * level;
        }
        sse
    }
}

impl Technique for ExponentialSmoothing {
    fn identity(&self) -> &TechniqueIdentity {
        &self.identity
    }

    fn family(&self) -> TaskFamily {
        TaskFamily::Forecasting
    }

    fn min_training_length(&self) -> usize {
        2
    }

    fn is_fitted(&self) -> bool {
        self.fitted_alpha.is_some()
    }
}

impl Forecaster for ExponentialSmoothing {
    fn fit(&mut self, train: &Series, ctx: &FitContext) -> Result<()> {
        self.fitted_alpha = None;
        let values = train.univariate()?;
        check_length(self.min_training_length(), values.len())?;

        let alpha = match self.alpha {
            Some(alpha) => alpha,
            None => {
                let mut best = (f64::INFINITY, 1.0);
                for step in 1..=ALPHA_GRID_STEPS {
                    ctx.checkpoint()?;
                    let alpha = step as f64 / ALPHA_GRID_STEPS as f64;
                    let sse = Self::one_step_sse(values, alpha);
                    if sse < best.0 {
                        best = (sse, alpha);
                    }
                }
                best.1
            }
        };

        self.fitted_alpha = Some(alpha);
        Ok(())
    }

    fn infer(&self, history: &Series, horizon: usize) -> Result<Vec<f64>> {
        let alpha = self.fitted_alpha.ok_or_else(|| not_fitted(self.name()))?;
        check_horizon(horizon)?;

        let level = exponential_level(history.univariate()?, alpha)?;
        Ok(vec![level; horizon])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn series(values: Vec<f64>) -> Series {
        Series::daily(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), values).unwrap()
    }

    #[test]
    fn test_naive_last_value() {
        let train = series(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        let mut model = NaiveLastValue::new();
        assert!(matches!(
            model.infer(&train, 2),
            Err(EvalError::InvalidState(_))
        ));

        model.fit(&train, &FitContext::new()).unwrap();
        assert_eq!(model.infer(&train, 2).unwrap(), vec![5.0, 5.0]);
        assert!(model.infer(&train, 0).is_err());
    }

    #[test]
    fn test_seasonal_naive() {
        let train = series(vec![1.0, 2.0, 3.0, 10.0, 20.0, 30.0]);
        let mut model = SeasonalNaive::new(3).unwrap();
        model.fit(&train, &FitContext::new()).unwrap();
        assert_eq!(
            model.infer(&train, 4).unwrap(),
            vec![10.0, 20.0, 30.0, 10.0]
        );
        assert_eq!(model.min_training_length(), 3);
        assert!(SeasonalNaive::new(0).is_err());
    }

    #[test]
    fn test_moving_average() {
        let train = series(vec![1.0, 2.0, 3.0, 4.0]);
        let mut model = MovingAverageForecaster::new(2).unwrap();
        model.fit(&train, &FitContext::new()).unwrap();
        assert_eq!(model.infer(&train, 3).unwrap(), vec![3.5, 3.5, 3.5]);
    }

    #[test]
    fn test_exponential_smoothing_optimized_prefers_tracking() {
        // A steadily rising series is tracked best by alpha = 1
        let train = series((1..=10).map(f64::from).collect());
        let mut model = ExponentialSmoothing::optimized();
        model.fit(&train, &FitContext::new()).unwrap();
        assert_eq!(model.fitted_alpha(), Some(1.0));
        assert_eq!(model.infer(&train, 1).unwrap(), vec![10.0]);
    }

    #[test]
    fn test_exponential_smoothing_respects_cancellation() {
        let train = series(vec![1.0, 2.0, 3.0]);
        let mut model = ExponentialSmoothing::optimized();
        let ctx = FitContext::new();
        ctx.cancel();
        assert!(matches!(model.fit(&train, &ctx), Err(EvalError::Cancelled)));
        assert!(!model.is_fitted());
    }

    #[test]
    fn test_refit_replaces_state() {
        let mut model = NaiveLastValue::new();
        model.fit(&series(vec![1.0, 2.0]), &FitContext::new()).unwrap();
        model.fit(&series(vec![7.0]), &FitContext::new()).unwrap();
        let empty = series(vec![1.0]).slice(
            chrono::Utc::now() + chrono::Duration::days(1),
            chrono::Utc::now() + chrono::Duration::days(2),
        );
        assert_eq!(model.infer(&empty, 1).unwrap(), vec![7.0]);
    }
}
