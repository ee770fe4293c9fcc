//! Time-indexed series of observations
//!
//! A [`Series`] is immutable once built. Timestamps are strictly increasing,
//! and every observation is a row of `width` floats (width 1 for scalar
//! series). Buffers are reference counted so cloning a series is cheap and
//! it can be shared read-only between concurrent runs.

use crate::error::{EvalError, Result};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use std::sync::Arc;

/// Time series with strictly increasing timestamps
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    /// Optional display name
    name: Option<String>,
    /// Observation times
    timestamps: Arc<[DateTime<Utc>]>,
    /// Row-major observation values
    values: Arc<[f64]>,
    /// Number of values per observation
    width: usize,
    /// Step between observations when it is uniform
    frequency: Option<Duration>,
}

impl Series {
    /// Create a scalar series from timestamps and values
    pub fn new(timestamps: Vec<DateTime<Utc>>, values: Vec<f64>) -> Result<Self> {
        validate_timestamps(&timestamps, values.len())?;
        Ok(Self::from_parts(None, timestamps, values, 1))
    }

    /// Create a vector-valued series; every row must have the same width
    pub fn multivariate(timestamps: Vec<DateTime<Utc>>, rows: Vec<Vec<f64>>) -> Result<Self> {
        validate_timestamps(&timestamps, rows.len())?;

        let width = rows.first().map(Vec::len).unwrap_or(0);
        if width == 0 {
            return Err(EvalError::MalformedSeries(
                "Observations must have at least one value".to_string(),
            ));
        }
        if let Some(pos) = rows.iter().position(|row| row.len() != width) {
            return Err(EvalError::MalformedSeries(format!(
                "Row {} has width {}, expected {}",
                pos,
                rows[pos].len(),
                width
            )));
        }

        let values = rows.into_iter().flatten().collect();
        Ok(Self::from_parts(None, timestamps, values, width))
    }

    /// Create a scalar series sampled every `step` starting at `start`
    pub fn regular(start: DateTime<Utc>, step: Duration, values: Vec<f64>) -> Result<Self> {
        if step <= Duration::zero() {
            return Err(EvalError::MalformedSeries(format!(
                "Step must be positive, got {}",
                step
            )));
        }
        let timestamps = (0..values.len())
            .map(|i| {
                i32::try_from(i)
                    .ok()
                    .and_then(|i| step.checked_mul(i))
                    .and_then(|offset| start.checked_add_signed(offset))
                    .ok_or_else(|| {
                        EvalError::MalformedSeries(format!("Timestamp {} overflows", i))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(timestamps, values)
    }

    /// Create a daily scalar series starting at midnight UTC on `start`
    pub fn daily(start: NaiveDate, values: Vec<f64>) -> Result<Self> {
        let midnight = start.and_hms_opt(0, 0, 0).ok_or_else(|| {
            EvalError::MalformedSeries(format!("Invalid start date {}", start))
        })?;
        Self::regular(Utc.from_utc_datetime(&midnight), Duration::days(1), values)
    }

    fn from_parts(
        name: Option<String>,
        timestamps: Vec<DateTime<Utc>>,
        values: Vec<f64>,
        width: usize,
    ) -> Self {
        let frequency = infer_frequency(&timestamps);
        Self {
            name,
            timestamps: timestamps.into(),
            values: values.into(),
            width,
            frequency,
        }
    }

    /// Attach a display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Display name, if any
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Number of observations
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// True for a series without observations (only produced by slicing)
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Number of values per observation
    pub fn width(&self) -> usize {
        self.width
    }

    /// Observation timestamps
    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    /// All values in row-major order
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Values of a scalar series; fails for vector-valued series
    pub fn univariate(&self) -> Result<&[f64]> {
        if self.width != 1 {
            return Err(EvalError::MalformedSeries(format!(
                "Expected a univariate series, got width {}",
                self.width
            )));
        }
        Ok(&self.values)
    }

    /// Values of observation `index`
    pub fn row(&self, index: usize) -> Option<&[f64]> {
        if index >= self.len() {
            return None;
        }
        let start = index * self.width;
        Some(&self.values[start..start + self.width])
    }

    /// Values of component `index` across all observations
    pub fn column(&self, index: usize) -> Option<Vec<f64>> {
        if index >= self.width {
            return None;
        }
        Some(
            self.values
                .iter()
                .skip(index)
                .step_by(self.width)
                .copied()
                .collect(),
        )
    }

    /// Uniform step between observations, if the series has one
    pub fn frequency(&self) -> Option<Duration> {
        self.frequency
    }

    /// First timestamp, if any
    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamps.first().copied()
    }

    /// Last timestamp, if any
    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamps.last().copied()
    }

    /// Observations with `start <= timestamp < end`.
    ///
    /// Returns an empty series instead of failing when no observation falls in
    /// the range; callers must check [`Series::is_empty`] before fitting.
    pub fn slice(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Series {
        let lo = self.timestamps.partition_point(|t| *t < start);
        let hi = self.timestamps.partition_point(|t| *t < end).max(lo);
        self.range(lo, hi)
    }

    /// First `n` observations (fewer if the series is shorter)
    pub fn head(&self, n: usize) -> Series {
        self.range(0, n.min(self.len()))
    }

    /// Last `n` observations (fewer if the series is shorter)
    pub fn tail(&self, n: usize) -> Series {
        let len = self.len();
        self.range(len - n.min(len), len)
    }

    /// Split into the observations before `index` and from `index` on.
    ///
    /// Like every slicing helper, each half copies its observations into new
    /// buffers; only clones of a half share them.
    pub fn split_at(&self, index: usize) -> Result<(Series, Series)> {
        if index > self.len() {
            return Err(EvalError::InvalidParameter(format!(
                "Split index {} exceeds series length {}",
                index,
                self.len()
            )));
        }
        Ok((self.range(0, index), self.range(index, self.len())))
    }

    /// Scalar series continuing this one at its uniform frequency
    pub fn following(&self, values: Vec<f64>) -> Result<Series> {
        let (last, step) = match (self.last_timestamp(), self.frequency) {
            (Some(last), Some(step)) => (last, step),
            _ => {
                return Err(EvalError::MalformedSeries(
                    "Only a series with a uniform frequency can be continued".to_string(),
                ))
            }
        };
        let start = last.checked_add_signed(step).ok_or_else(|| {
            EvalError::MalformedSeries("Continuation start overflows".to_string())
        })?;
        Series::regular(start, step, values)
    }

    fn range(&self, lo: usize, hi: usize) -> Series {
        Self::from_parts(
            self.name.clone(),
            self.timestamps[lo..hi].to_vec(),
            self.values[lo * self.width..hi * self.width].to_vec(),
            self.width,
        )
    }
}

fn validate_timestamps(timestamps: &[DateTime<Utc>], n_rows: usize) -> Result<()> {
    if timestamps.len() != n_rows {
        return Err(EvalError::MalformedSeries(format!(
            "Got {} timestamps but {} observations",
            timestamps.len(),
            n_rows
        )));
    }
    if timestamps.is_empty() {
        return Err(EvalError::MalformedSeries(
            "Series must contain at least one observation".to_string(),
        ));
    }

    for (i, pair) in timestamps.windows(2).enumerate() {
        if pair[1] == pair[0] {
            return Err(EvalError::MalformedSeries(format!(
                "Duplicate timestamp {} at position {}",
                pair[1],
                i + 1
            )));
        }
        if pair[1] < pair[0] {
            return Err(EvalError::MalformedSeries(format!(
                "Timestamps must be strictly increasing: {} follows {} at position {}",
                pair[1],
                pair[0],
                i + 1
            )));
        }
    }

    Ok(())
}

fn infer_frequency(timestamps: &[DateTime<Utc>]) -> Option<Duration> {
    let mut gaps = timestamps.windows(2).map(|pair| pair[1] - pair[0]);
    let first = gaps.next()?;
    gaps.all(|gap| gap == first).then_some(first)
}
