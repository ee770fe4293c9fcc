//! Detection metrics over per-point anomaly flags and scores

use super::{AnomalyInput, MetricError, MetricResult};

/// Confusion counts for binary anomaly flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BinaryCounts {
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
}

impl BinaryCounts {
    /// Count outcomes over aligned predicted/actual flags
    pub fn from_flags(predicted: &[bool], actual: &[bool]) -> Self {
        predicted
            .iter()
            .zip(actual)
            .fold(Self::default(), |mut counts, (&p, &a)| {
                match (p, a) {
                    (true, true) => counts.true_positives += 1,
                    (true, false) => counts.false_positives += 1,
                    (false, false) => counts.true_negatives += 1,
                    (false, true) => counts.false_negatives += 1,
                }
                counts
            })
    }

    fn total(&self) -> usize {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }
}

fn ratio(numerator: usize, denominator: usize, what: &str) -> MetricResult {
    if denominator == 0 {
        return Err(MetricError::DivisionByZero(format!("{} is undefined", what)));
    }
    Ok(numerator as f64 / denominator as f64)
}

/// Fraction of flagged points that are real anomalies
pub fn precision(input: &AnomalyInput<'_>) -> MetricResult {
    let c = BinaryCounts::from_flags(input.predicted, input.actual);
    ratio(
        c.true_positives,
        c.true_positives + c.false_positives,
        "Precision with no flagged points",
    )
}

/// Fraction of real anomalies that were flagged
pub fn recall(input: &AnomalyInput<'_>) -> MetricResult {
    let c = BinaryCounts::from_flags(input.predicted, input.actual);
    ratio(
        c.true_positives,
        c.true_positives + c.false_negatives,
        "Recall with no actual anomalies",
    )
}

/// Harmonic mean of precision and recall
pub fn f1(input: &AnomalyInput<'_>) -> MetricResult {
    let c = BinaryCounts::from_flags(input.predicted, input.actual);
    ratio(
        2 * c.true_positives,
        2 * c.true_positives + c.false_positives + c.false_negatives,
        "F1 with no positives",
    )
}

/// Fraction of points classified correctly
pub fn accuracy(input: &AnomalyInput<'_>) -> MetricResult {
    let c = BinaryCounts::from_flags(input.predicted, input.actual);
    ratio(
        c.true_positives + c.true_negatives,
        c.total(),
        "Accuracy over no points",
    )
}

/// Area under the ROC curve of the anomaly scores.
///
/// Computed as the Mann-Whitney U statistic with tied scores sharing their
/// average rank. Needs scores and at least one anomalous and one normal point.
pub fn roc_auc(input: &AnomalyInput<'_>) -> MetricResult {
    let scores = input.scores.ok_or_else(|| {
        MetricError::Undefined("ROC AUC needs anomaly scores".to_string())
    })?;
    if scores.iter().any(|s| s.is_nan()) {
        return Err(MetricError::Undefined("ROC AUC with NaN scores".to_string()));
    }

    let positives = input.actual.iter().filter(|&&a| a).count();
    let negatives = input.actual.len() - positives;
    if positives == 0 || negatives == 0 {
        return Err(MetricError::Undefined(
            "ROC AUC needs both anomalous and normal points".to_string(),
        ));
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut ranks = vec![0.0; scores.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // Ranks are 1-based; ties share the mean of start+1..=end
        let rank = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = rank;
        }
        start = end;
    }

    let positive_rank_sum: f64 = ranks
        .iter()
        .zip(input.actual)
        .filter(|&(_, &a)| a)
        .map(|(r, _)| r)
        .sum();
    let p = positives as f64;
    Ok((positive_rank_sum - p * (p + 1.0) / 2.0) / (p * negatives as f64))
}
