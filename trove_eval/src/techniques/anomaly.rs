//! Baseline anomaly detectors

use super::{check_length, not_fitted};
use crate::error::{EvalError, Result};
use crate::series::Series;
use crate::technique::{AnomalyDetector, AnomalyOutput, FitContext, TaskFamily, Technique, TechniqueIdentity};
use trove_math::{mean, quantile, std_dev};

/// Flags observations more than `threshold` standard deviations from the mean.
///
/// Vector-valued series are scored per component; an observation's score is
/// its largest absolute z-score. Components with zero spread score 0.
#[derive(Debug, Clone)]
pub struct ZScoreDetector {
    identity: TechniqueIdentity,
    threshold: f64,
    /// Per-component (mean, std dev)
    moments: Option<Vec<(f64, f64)>>,
}

impl ZScoreDetector {
    /// Create a new z-score detector
    pub fn new(threshold: f64) -> Result<Self> {
        if !(threshold > 0.0) {
            return Err(EvalError::InvalidParameter(
                "Threshold must be positive".to_string(),
            ));
        }

        Ok(Self {
            identity: TechniqueIdentity::new("z-score").with_param("threshold", threshold),
            threshold,
            moments: None,
        })
    }
}

impl Technique for ZScoreDetector {
    fn identity(&self) -> &TechniqueIdentity {
        &self.identity
    }

    fn family(&self) -> TaskFamily {
        TaskFamily::AnomalyDetection
    }

    fn min_training_length(&self) -> usize {
        2
    }

    fn is_fitted(&self) -> bool {
        self.moments.is_some()
    }
}

impl AnomalyDetector for ZScoreDetector {
    fn fit(&mut self, train: &Series, ctx: &FitContext) -> Result<()> {
        self.moments = None;
        check_length(self.min_training_length(), train.len())?;

        let mut moments = Vec::with_capacity(train.width());
        for component in 0..train.width() {
            ctx.checkpoint()?;
            let column = train.column(component).unwrap_or_default();
            moments.push((mean(&column)?, std_dev(&column)?));
        }

        self.moments = Some(moments);
        Ok(())
    }

    fn infer(&self, series: &Series) -> Result<AnomalyOutput> {
        let moments = self
            .moments
            .as_ref()
            .ok_or_else(|| not_fitted(self.name()))?;
        if series.width() != moments.len() {
            return Err(EvalError::Alignment(format!(
                "Detector was fitted on width {}, got width {}",
                moments.len(),
                series.width()
            )));
        }

        let scores: Vec<f64> = (0..series.len())
            .filter_map(|i| series.row(i))
            .map(|row| {
                row.iter()
                    .zip(moments.iter())
                    .map(|(&x, &(m, s))| if s > 0.0 { ((x - m) / s).abs() } else { 0.0 })
                    .fold(0.0, f64::max)
            })
            .collect();
        let flags = scores.iter().map(|&s| s > self.threshold).collect();

        Ok(AnomalyOutput {
            scores: Some(scores),
            flags: Some(flags),
        })
    }
}

/// Flags observations outside the Tukey fences `[q1 - k*iqr, q3 + k*iqr]`.
///
/// The score is the distance past the nearest fence in units of the IQR,
/// 0 for points inside the fences.
#[derive(Debug, Clone)]
pub struct IqrDetector {
    identity: TechniqueIdentity,
    k: f64,
    /// (lower fence, upper fence, iqr)
    fences: Option<(f64, f64, f64)>,
}

impl IqrDetector {
    /// Create a new IQR detector; `k` is commonly 1.5
    pub fn new(k: f64) -> Result<Self> {
        if !(k > 0.0) {
            return Err(EvalError::InvalidParameter(
                "Fence multiplier must be positive".to_string(),
            ));
        }

        Ok(Self {
            identity: TechniqueIdentity::new("iqr").with_param("k", k),
            k,
            fences: None,
        })
    }
}

impl Technique for IqrDetector {
    fn identity(&self) -> &TechniqueIdentity {
        &self.identity
    }

    fn family(&self) -> TaskFamily {
        TaskFamily::AnomalyDetection
    }

    fn min_training_length(&self) -> usize {
        4
    }

    fn is_fitted(&self) -> bool {
        self.fences.is_some()
    }
}

impl AnomalyDetector for IqrDetector {
    fn fit(&mut self, train: &Series, _ctx: &FitContext) -> Result<()> {
        self.fences = None;
        let values = train.univariate()?;
        check_length(self.min_training_length(), values.len())?;

        let q1 = quantile(values, 0.25)?;
        let q3 = quantile(values, 0.75)?;
        let iqr = q3 - q1;
        self.fences = Some((q1 - self.k * iqr, q3 + self.k * iqr, iqr));
        Ok(())
    }

    fn infer(&self, series: &Series) -> Result<AnomalyOutput> {
        let (lower, upper, iqr) = self.fences.ok_or_else(|| not_fitted(self.name()))?;
        let scale = if iqr > 0.0 { iqr } else { 1.0 };

        let scores: Vec<f64> = series
            .univariate()?
            .iter()
            .map(|&x| {
                if x < lower {
                    (lower - x) / scale
                } else if x > upper {
                    (x - upper) / scale
                } else {
                    0.0
                }
            })
            .collect();
        let flags = scores.iter().map(|&s| s > 0.0).collect();

        Ok(AnomalyOutput {
            scores: Some(scores),
            flags: Some(flags),
        })
    }
}
