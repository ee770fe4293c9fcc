//! Label agreement metrics for series classification

use super::{ClassificationInput, MetricError, MetricResult};
use crate::error::{EvalError, Result};
use serde::{Deserialize, Serialize};

/// Counts of (actual, predicted) label pairs over a fixed label set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// Label set, indexing both axes
    classes: Vec<String>,
    /// `counts[actual][predicted]`
    counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    /// Tabulate aligned predicted/actual labels; every label must be in `classes`
    pub fn new(classes: &[String], predicted: &[String], actual: &[String]) -> Result<Self> {
        if predicted.len() != actual.len() {
            return Err(EvalError::Alignment(format!(
                "Got {} predicted labels for {} actual labels",
                predicted.len(),
                actual.len()
            )));
        }

        let index = |label: &String| {
            classes
                .iter()
                .position(|c| c == label)
                .ok_or_else(|| EvalError::UnknownLabel {
                    label: label.clone(),
                    known: classes.to_vec(),
                })
        };

        let mut counts = vec![vec![0; classes.len()]; classes.len()];
        for (p, a) in predicted.iter().zip(actual) {
            counts[index(a)?][index(p)?] += 1;
        }

        Ok(Self {
            classes: classes.to_vec(),
            counts,
        })
    }

    /// Label set
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Number of instances with the given actual and predicted labels
    pub fn count(&self, actual: &str, predicted: &str) -> usize {
        let a = self.classes.iter().position(|c| c == actual);
        let p = self.classes.iter().position(|c| c == predicted);
        match (a, p) {
            (Some(a), Some(p)) => self.counts[a][p],
            _ => 0,
        }
    }

    /// Row-major counts, `counts()[actual][predicted]`
    pub fn counts(&self) -> &[Vec<usize>] {
        &self.counts
    }

    /// Total number of instances
    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    /// Correctly classified instances
    pub fn correct(&self) -> usize {
        (0..self.classes.len()).map(|i| self.counts[i][i]).sum()
    }

    /// Per-class (precision, recall), 0 where a denominator is empty, for
    /// classes that occur among the actual or predicted labels
    fn per_class(&self) -> Vec<(f64, f64)> {
        (0..self.classes.len())
            .filter_map(|i| {
                let actual: usize = self.counts[i].iter().sum();
                let predicted: usize = self.counts.iter().map(|row| row[i]).sum();
                if actual == 0 && predicted == 0 {
                    return None;
                }
                let tp = self.counts[i][i] as f64;
                let precision = if predicted > 0 { tp / predicted as f64 } else { 0.0 };
                let recall = if actual > 0 { tp / actual as f64 } else { 0.0 };
                Some((precision, recall))
            })
            .collect()
    }
}

fn matrix(input: &ClassificationInput<'_>) -> std::result::Result<ConfusionMatrix, MetricError> {
    let matrix = ConfusionMatrix::new(input.classes, input.predicted, input.actual)
        .map_err(|e| MetricError::Undefined(e.to_string()))?;
    if matrix.total() == 0 {
        return Err(MetricError::DivisionByZero(
            "No instances to score".to_string(),
        ));
    }
    Ok(matrix)
}

fn macro_average(input: &ClassificationInput<'_>, f: impl Fn(f64, f64) -> f64) -> MetricResult {
    let per_class = matrix(input)?.per_class();
    Ok(per_class.iter().map(|&(p, r)| f(p, r)).sum::<f64>() / per_class.len() as f64)
}

/// Fraction of instances labelled correctly
pub fn accuracy(input: &ClassificationInput<'_>) -> MetricResult {
    let m = matrix(input)?;
    Ok(m.correct() as f64 / m.total() as f64)
}

/// Unweighted mean of per-class precision
pub fn macro_precision(input: &ClassificationInput<'_>) -> MetricResult {
    macro_average(input, |p, _| p)
}

/// Unweighted mean of per-class recall
pub fn macro_recall(input: &ClassificationInput<'_>) -> MetricResult {
    macro_average(input, |_, r| r)
}

/// Unweighted mean of per-class F1
pub fn macro_f1(input: &ClassificationInput<'_>) -> MetricResult {
    macro_average(input, |p, r| if p + r > 0.0 { 2.0 * p * r / (p + r) } else { 0.0 })
}
