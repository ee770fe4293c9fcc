//! Exploratory summaries of a single series
//!
//! Shape statistics follow the usual dataframe conventions: sample standard
//! deviation, adjusted skewness, excess kurtosis and linearly interpolated
//! percentiles.

use crate::error::{EvalError, Result};
use crate::series::Series;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use trove_math::SimpleMovingAverage;

/// Regularity of a series' time index
#[derive(Debug, Clone, PartialEq)]
pub struct TimeIndexSummary {
    /// Most common step between consecutive timestamps, `None` for a single
    /// point or an irregular index
    pub step: Option<Duration>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Timestamps on the `step` grid from start to end that are absent
    pub missing: Vec<DateTime<Utc>>,
}

impl TimeIndexSummary {
    pub fn missing_count(&self) -> usize {
        self.missing.len()
    }

    /// Whether a step was inferred and every grid point is present
    pub fn is_regular(&self) -> bool {
        self.step.is_some() && self.missing.is_empty()
    }
}

/// Location and shape of a series' values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionSummary {
    pub count: usize,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
    pub range: f64,
    pub mean: f64,
    /// Sample standard deviation; `None` for a single value
    pub std_dev: Option<f64>,
    /// `None` with fewer than 3 values
    pub skewness: Option<f64>,
    /// Excess kurtosis; `None` with fewer than 4 values
    pub kurtosis: Option<f64>,
}

/// Augmented Dickey-Fuller test of a series, constant included
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationaritySummary {
    pub adf_statistic: f64,
    pub p_value: f64,
    pub used_lag: usize,
    pub n_obs: usize,
    pub critical_value_1pct: f64,
    pub critical_value_5pct: f64,
    pub critical_value_10pct: f64,
    /// AIC of the selected lag order
    pub ic_best: f64,
    /// Unit root rejected at the 5% level
    pub stationary: bool,
}

/// Rolling mean and standard deviation, each stamped at the end of its window
#[derive(Debug, Clone, PartialEq)]
pub struct RollingSummary {
    pub window: usize,
    pub mean: Series,
    /// Sample standard deviation; `NaN` throughout for a window of 1
    pub std_dev: Series,
}

fn non_empty(series: &Series) -> Result<()> {
    if series.is_empty() {
        return Err(EvalError::InsufficientData {
            required: 1,
            actual: 0,
        });
    }
    Ok(())
}

/// Largest grid, as a multiple of the observed length, that the time index
/// summary will enumerate
const MAX_GRID_FACTOR: i64 = 2;

/// Number of points on a `step` grid covering `span`, endpoints included
fn grid_points(span: Duration, step: Duration) -> Option<i64> {
    match (span.num_nanoseconds(), step.num_nanoseconds()) {
        (Some(span), Some(step)) if step > 0 => Some(span / step + 1),
        _ => {
            let step = step.num_milliseconds();
            (step > 0).then(|| span.num_milliseconds() / step + 1)
        }
    }
}

/// Infer the time step and list the gaps in the index.
///
/// The step is the most common gap between timestamps. When the observed
/// points cover less than half of that step's grid the index is treated as
/// irregular: `step` is `None` and no gaps are listed.
pub fn describe_time_index(series: &Series) -> Result<TimeIndexSummary> {
    non_empty(series)?;
    let timestamps = series.timestamps();
    let (start, end) = (timestamps[0], timestamps[timestamps.len() - 1]);

    let mut steps: BTreeMap<Duration, usize> = BTreeMap::new();
    for pair in timestamps.windows(2) {
        *steps.entry(pair[1] - pair[0]).or_insert(0) += 1;
    }
    // Ascending keys: the shortest step wins ties
    let modal = steps
        .iter()
        .fold(None, |best: Option<(Duration, usize)>, (&s, &count)| match best {
            Some((_, c)) if c >= count => best,
            _ => Some((s, count)),
        })
        .map(|(s, _)| s);

    // An index that fills less than half of its own grid has no usable step
    let step = modal.filter(|&step| {
        grid_points(end - start, step)
            .map_or(false, |points| points <= MAX_GRID_FACTOR * timestamps.len() as i64)
    });

    let mut missing = Vec::new();
    if let Some(step) = step {
        let mut current = start;
        while current < end {
            if timestamps.binary_search(&current).is_err() {
                missing.push(current);
            }
            current = match current.checked_add_signed(step) {
                Some(next) => next,
                None => break,
            };
        }
    }

    Ok(TimeIndexSummary {
        step,
        start,
        end,
        missing,
    })
}

/// Summary statistics of a univariate series
pub fn describe_distribution(series: &Series) -> Result<DistributionSummary> {
    non_empty(series)?;
    let values = series.univariate()?;
    if values.iter().any(|v| v.is_nan()) {
        return Err(EvalError::MalformedSeries(
            "Distribution summary requires values without NaN".to_string(),
        ));
    }

    let min = Statistics::min(values.iter());
    let max = Statistics::max(values.iter());

    Ok(DistributionSummary {
        count: values.len(),
        min,
        q25: trove_math::quantile(values, 0.25)?,
        median: trove_math::quantile(values, 0.5)?,
        q75: trove_math::quantile(values, 0.75)?,
        max,
        range: max - min,
        mean: trove_math::mean(values)?,
        std_dev: trove_math::std_dev(values).ok(),
        skewness: trove_math::skewness(values).ok(),
        kurtosis: trove_math::kurtosis(values).ok(),
    })
}

/// Autocorrelation at lags `0..=nlags`
pub fn describe_acf(series: &Series, nlags: usize) -> Result<Vec<f64>> {
    Ok(trove_math::acf(series.univariate()?, nlags)?)
}

/// Partial autocorrelation at lags `0..=nlags`
pub fn describe_pacf(series: &Series, nlags: usize) -> Result<Vec<f64>> {
    Ok(trove_math::pacf(series.univariate()?, nlags)?)
}

/// Unit root test of a univariate series.
///
/// `max_lag` bounds the AIC lag search; `None` uses `ceil(12 * (n/100)^0.25)`.
pub fn describe_stationarity(series: &Series, max_lag: Option<usize>) -> Result<StationaritySummary> {
    let test = trove_math::adf(series.univariate()?, max_lag)?;
    Ok(StationaritySummary {
        adf_statistic: test.statistic,
        p_value: test.p_value,
        used_lag: test.used_lag,
        n_obs: test.nobs,
        critical_value_1pct: test.critical_values.one_percent,
        critical_value_5pct: test.critical_values.five_percent,
        critical_value_10pct: test.critical_values.ten_percent,
        ic_best: test.ic_best,
        stationary: test.is_stationary(),
    })
}

/// Rolling statistics over `window` consecutive observations
pub fn describe_rolling(series: &Series, window: usize) -> Result<RollingSummary> {
    let values = series.univariate()?;
    let mut sma = SimpleMovingAverage::new(window)?;
    if values.len() < window {
        return Err(EvalError::InsufficientData {
            required: window,
            actual: values.len(),
        });
    }

    let mut means = Vec::with_capacity(values.len() + 1 - window);
    for &value in values {
        sma.update(value);
        if let Ok(mean) = sma.value() {
            means.push(mean);
        }
    }
    let std_devs = values
        .windows(window)
        .map(|w| trove_math::std_dev(w).unwrap_or(f64::NAN))
        .collect();

    let timestamps = series.timestamps()[window - 1..].to_vec();
    let name = |suffix: &str| match series.name() {
        Some(name) => format!("{}_{}", name, suffix),
        None => suffix.to_string(),
    };
    Ok(RollingSummary {
        window,
        mean: Series::new(timestamps.clone(), means)?.with_name(name("rolling_mean")),
        std_dev: Series::new(timestamps, std_devs)?.with_name(name("rolling_std")),
    })
}

/// First differences `x[t] - x[t-1]`, stamped at `t`
pub fn difference(series: &Series) -> Result<Series> {
    let values = series.univariate()?;
    if values.len() < 2 {
        return Err(EvalError::InsufficientData {
            required: 2,
            actual: values.len(),
        });
    }

    let diffs = values.windows(2).map(|w| w[1] - w[0]).collect();
    let differenced = Series::new(series.timestamps()[1..].to_vec(), diffs)?;
    Ok(match series.name() {
        Some(name) => differenced.with_name(name),
        None => differenced,
    })
}
