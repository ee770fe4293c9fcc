//! Harness configuration

use crate::error::{EvalError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::thread;
use std::time::Duration;

/// Threshold applied to anomaly scores when a detector returns no flags
pub const DEFAULT_ANOMALY_THRESHOLD: f64 = 0.5;

fn default_anomaly_threshold() -> f64 {
    DEFAULT_ANOMALY_THRESHOLD
}

fn default_workers() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

fn default_check_frequency() -> bool {
    true
}

/// Settings shared by every run of a [`Harness`](crate::harness::Harness)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Default fit budget in milliseconds; `None` fits without a deadline
    pub fit_timeout_ms: Option<u64>,
    /// Anomaly scores strictly above this are flagged
    #[serde(default = "default_anomaly_threshold")]
    pub anomaly_threshold: f64,
    /// Size of the worker pool used by `evaluate_many`
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Require the forecast test span to continue the training frequency
    #[serde(default = "default_check_frequency")]
    pub check_frequency: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            fit_timeout_ms: None,
            anomaly_threshold: default_anomaly_threshold(),
            workers: default_workers(),
            check_frequency: default_check_frequency(),
        }
    }
}

impl HarnessConfig {
    /// Load and validate a configuration from a JSON file; missing keys take
    /// their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let config: Self = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the settings are usable
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(EvalError::Config(
                "workers must be at least 1".to_string(),
            ));
        }
        if !self.anomaly_threshold.is_finite() {
            return Err(EvalError::Config(format!(
                "anomaly_threshold must be finite, got {}",
                self.anomaly_threshold
            )));
        }
        if self.fit_timeout_ms == Some(0) {
            return Err(EvalError::Config(
                "fit_timeout_ms must be positive when set".to_string(),
            ));
        }
        Ok(())
    }

    /// Default fit budget as a duration
    pub fn fit_timeout(&self) -> Option<Duration> {
        self.fit_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HarnessConfig::default();
        assert_eq!(config.anomaly_threshold, 0.5);
        assert!(config.workers >= 1);
        assert!(config.check_frequency);
        assert_eq!(config.fit_timeout(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config: HarnessConfig = serde_json::from_str(r#"{"fit_timeout_ms": 250}"#).unwrap();
        assert_eq!(config.fit_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.anomaly_threshold, DEFAULT_ANOMALY_THRESHOLD);
    }

    #[test]
    fn test_validation() {
        let config = HarnessConfig {
            workers: 0,
            ..HarnessConfig::default()
        };
        assert!(matches!(config.validate(), Err(EvalError::Config(_))));

        let config = HarnessConfig {
            anomaly_threshold: f64::NAN,
            ..HarnessConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
