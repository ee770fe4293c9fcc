//! Result reports for completed evaluation runs
//!
//! A [`ResultReport`] is built once by the harness and never changes
//! afterwards. It can be rendered as `key=value` lines for notebooks, as JSON,
//! or exported in bulk to CSV.

use crate::error::Result;
use crate::metrics::{ConfusionMatrix, Direction, ScoreMap};
use crate::technique::{TaskFamily, TechniqueIdentity};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::time::Duration;

/// Outcome of a single evaluation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultReport {
    technique: TechniqueIdentity,
    dataset: String,
    family: TaskFamily,
    #[serde(with = "nan_as_null")]
    scores: ScoreMap,
    confusion: Option<ConfusionMatrix>,
    fit_duration: Duration,
    infer_duration: Duration,
}

impl ResultReport {
    pub(crate) fn new(
        technique: TechniqueIdentity,
        dataset: impl Into<String>,
        family: TaskFamily,
        scores: ScoreMap,
        confusion: Option<ConfusionMatrix>,
        fit_duration: Duration,
        infer_duration: Duration,
    ) -> Self {
        Self {
            technique,
            dataset: dataset.into(),
            family,
            scores,
            confusion,
            fit_duration,
            infer_duration,
        }
    }

    /// Identity of the evaluated technique
    pub fn technique(&self) -> &TechniqueIdentity {
        &self.technique
    }

    /// Name of the dataset split
    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    pub fn family(&self) -> TaskFamily {
        self.family
    }

    /// Score per metric name; failed metrics are `NaN`
    pub fn scores(&self) -> &ScoreMap {
        &self.scores
    }

    /// Score of one metric, if it was computed
    pub fn score(&self, metric: &str) -> Option<f64> {
        self.scores.get(metric).copied()
    }

    /// Confusion matrix of a classification run
    pub fn confusion(&self) -> Option<&ConfusionMatrix> {
        self.confusion.as_ref()
    }

    /// Wall-clock time spent in `fit`
    pub fn fit_duration(&self) -> Duration {
        self.fit_duration
    }

    /// Wall-clock time spent in `infer`
    pub fn infer_duration(&self) -> Duration {
        self.infer_duration
    }

    /// Render as one `key=value` line per field
    pub fn to_key_value(&self) -> String {
        let mut lines = vec![format!("technique={}", self.technique.name)];
        lines.extend(
            self.technique
                .params
                .iter()
                .map(|(k, v)| format!("param.{}={}", k, v)),
        );
        lines.push(format!("dataset={}", self.dataset));
        lines.push(format!("family={}", self.family));
        lines.extend(
            self.scores
                .iter()
                .map(|(name, score)| format!("metric.{}={}", name, score)),
        );
        lines.push(format!("fit_ms={:.3}", millis(self.fit_duration)));
        lines.push(format!("infer_ms={:.3}", millis(self.infer_duration)));
        lines.join("\n")
    }

    /// Serialize to a JSON string; `NaN` scores become `null`
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a report produced by [`ResultReport::to_json`]
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Whether two runs produced the same result, ignoring timings.
    ///
    /// `NaN` scores compare equal to each other.
    pub fn same_outcome(&self, other: &ResultReport) -> bool {
        self.technique == other.technique
            && self.dataset == other.dataset
            && self.family == other.family
            && self.confusion == other.confusion
            && self.scores.len() == other.scores.len()
            && self
                .scores
                .iter()
                .zip(other.scores.iter())
                .all(|((ka, a), (kb, b))| ka == kb && (a == b || (a.is_nan() && b.is_nan())))
    }
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// Write reports as CSV, one row per (report, metric)
pub fn write_csv<W: Write>(reports: &[ResultReport], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record([
        "technique",
        "dataset",
        "family",
        "metric",
        "score",
        "fit_ms",
        "infer_ms",
    ])?;

    for report in reports {
        let family = report.family.to_string();
        let fit_ms = format!("{:.3}", millis(report.fit_duration));
        let infer_ms = format!("{:.3}", millis(report.infer_duration));
        for (metric, score) in &report.scores {
            wtr.write_record([
                report.technique.name.as_str(),
                report.dataset.as_str(),
                family.as_str(),
                metric.as_str(),
                score.to_string().as_str(),
                fit_ms.as_str(),
                infer_ms.as_str(),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}

/// Report with the best value of `metric`; reports lacking the metric or
/// scoring `NaN` are skipped. The first report wins ties.
pub fn best_by<'a>(
    reports: &'a [ResultReport],
    metric: &str,
    direction: Direction,
) -> Option<&'a ResultReport> {
    reports
        .iter()
        .filter_map(|r| r.score(metric).filter(|s| !s.is_nan()).map(|s| (r, s)))
        .fold(None, |best: Option<(&ResultReport, f64)>, (r, s)| match best {
            Some((_, b)) if !direction.is_better(s, b) => best,
            _ => Some((r, s)),
        })
        .map(|(r, _)| r)
}

/// JSON has no NaN, so scores round-trip through `null`
mod nan_as_null {
    use crate::metrics::ScoreMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S: Serializer>(scores: &ScoreMap, serializer: S) -> Result<S::Ok, S::Error> {
        let map: BTreeMap<&String, Option<f64>> = scores
            .iter()
            .map(|(k, &v)| (k, if v.is_nan() { None } else { Some(v) }))
            .collect();
        map.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ScoreMap, D::Error> {
        let map: BTreeMap<String, Option<f64>> = BTreeMap::deserialize(deserializer)?;
        Ok(map
            .into_iter()
            .map(|(k, v)| (k, v.unwrap_or(f64::NAN)))
            .collect())
    }
}
