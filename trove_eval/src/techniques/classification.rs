//! Baseline series classifiers

use super::{check_length, not_fitted};
use crate::error::{EvalError, Result};
use crate::series::Series;
use crate::technique::{
    ClassOutput, Classifier, FitContext, LabeledSeries, TaskFamily, Technique, TechniqueIdentity,
};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use trove_math::euclidean;

/// Summary features of a univariate series: mean, spread, min, max
fn summary_features(series: &Series) -> Result<Vec<f64>> {
    let values = series.univariate()?;
    if values.is_empty() {
        return Err(EvalError::InsufficientData {
            required: 1,
            actual: 0,
        });
    }

    Ok(vec![
        values.iter().mean(),
        values.iter().population_std_dev(),
        Statistics::min(values.iter()),
        Statistics::max(values.iter()),
    ])
}

/// Assigns each series to the class whose feature centroid is closest.
///
/// Returns per-class scores `exp(-distance)` normalised to sum to 1, computed
/// relative to the nearest centroid so large distances do not underflow.
#[derive(Debug, Clone)]
pub struct NearestCentroid {
    identity: TechniqueIdentity,
    /// Sorted labels with their centroids
    centroids: Option<(Vec<String>, Vec<Vec<f64>>)>,
}

impl NearestCentroid {
    /// Create an unfit nearest-centroid classifier
    pub fn new() -> Self {
        Self {
            identity: TechniqueIdentity::new("nearest-centroid")
                .with_param("features", "mean,std,min,max"),
            centroids: None,
        }
    }
}

impl Default for NearestCentroid {
    fn default() -> Self {
        Self::new()
    }
}

impl Technique for NearestCentroid {
    fn identity(&self) -> &TechniqueIdentity {
        &self.identity
    }

    fn family(&self) -> TaskFamily {
        TaskFamily::Classification
    }

    fn is_fitted(&self) -> bool {
        self.centroids.is_some()
    }
}

impl Classifier for NearestCentroid {
    fn fit(&mut self, train: &[LabeledSeries], ctx: &FitContext) -> Result<()> {
        self.centroids = None;
        check_length(self.min_training_length(), train.len())?;

        let mut sums: BTreeMap<&str, (Vec<f64>, usize)> = BTreeMap::new();
        for instance in train {
            ctx.checkpoint()?;
            let features = summary_features(&instance.series)?;
            let entry = sums
                .entry(instance.label.as_str())
                .or_insert_with(|| (vec![0.0; features.len()], 0));
            for (acc, f) in entry.0.iter_mut().zip(features) {
                *acc += f;
            }
            entry.1 += 1;
        }

        let (labels, centroids): (Vec<String>, Vec<Vec<f64>>) = sums
            .into_iter()
            .map(|(label, (sum, count))| {
                let centroid: Vec<f64> = sum.into_iter().map(|s| s / count as f64).collect();
                (label.to_string(), centroid)
            })
            .unzip();

        self.centroids = Some((labels, centroids));
        Ok(())
    }

    fn classes(&self) -> Option<&[String]> {
        self.centroids.as_ref().map(|(labels, _)| labels.as_slice())
    }

    fn infer(&self, series: &Series) -> Result<ClassOutput> {
        let (_, centroids) = self
            .centroids
            .as_ref()
            .ok_or_else(|| not_fitted(self.name()))?;

        let features = summary_features(series)?;
        let distances = centroids
            .iter()
            .map(|c| euclidean(&features, c))
            .collect::<trove_math::Result<Vec<f64>>>()?;

        // Shift by the nearest distance so the closest class always weighs 1
        let nearest = distances.iter().copied().fold(f64::INFINITY, f64::min);
        if !nearest.is_finite() {
            return Err(EvalError::MalformedSeries(
                "Series features are not finite".to_string(),
            ));
        }
        let weights: Vec<f64> = distances.iter().map(|d| (nearest - d).exp()).collect();
        let total: f64 = weights.iter().sum();
        let scores = weights.iter().map(|w| w / total).collect();
        Ok(ClassOutput::Scores(scores))
    }
}

/// Always predicts the most frequent training label (lexicographically first on ties)
#[derive(Debug, Clone)]
pub struct MajorityClass {
    identity: TechniqueIdentity,
    classes: Option<Vec<String>>,
    majority: Option<String>,
}

impl MajorityClass {
    /// Create an unfit majority-class classifier
    pub fn new() -> Self {
        Self {
            identity: TechniqueIdentity::new("majority-class"),
            classes: None,
            majority: None,
        }
    }
}

impl Default for MajorityClass {
    fn default() -> Self {
        Self::new()
    }
}

impl Technique for MajorityClass {
    fn identity(&self) -> &TechniqueIdentity {
        &self.identity
    }

    fn family(&self) -> TaskFamily {
        TaskFamily::Classification
    }

    fn is_fitted(&self) -> bool {
        self.majority.is_some()
    }
}

impl Classifier for MajorityClass {
    fn fit(&mut self, train: &[LabeledSeries], _ctx: &FitContext) -> Result<()> {
        self.classes = None;
        self.majority = None;
        check_length(self.min_training_length(), train.len())?;

        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for instance in train {
            *counts.entry(instance.label.as_str()).or_insert(0) += 1;
        }

        // BTreeMap iterates in label order, so keeping the first maximum breaks ties
        let majority = counts
            .iter()
            .fold(None, |best: Option<(&str, usize)>, (&label, &count)| match best {
                Some((_, c)) if c >= count => best,
                _ => Some((label, count)),
            })
            .map(|(label, _)| label.to_string());

        self.classes = Some(counts.keys().map(|k| k.to_string()).collect());
        self.majority = majority;
        Ok(())
    }

    fn classes(&self) -> Option<&[String]> {
        self.classes.as_deref()
    }

    fn infer(&self, _series: &Series) -> Result<ClassOutput> {
        self.majority
            .clone()
            .map(ClassOutput::Label)
            .ok_or_else(|| not_fitted(self.name()))
    }
}
