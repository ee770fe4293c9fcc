//! Shared fixtures and stub techniques for the integration tests
#![allow(dead_code)]

use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use trove_eval::error::{EvalError, Result};
use trove_eval::{
    AnomalyDetector, AnomalyOutput, FitContext, Forecaster, Series, TaskFamily, Technique,
    TechniqueIdentity,
};

pub fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

/// Daily series starting on 2024-01-01
pub fn daily(values: Vec<f64>) -> Series {
    Series::daily(start_date(), values).unwrap()
}

/// Seeded Gaussian random walk
pub fn random_walk(seed: u64, len: usize) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, 1.0).unwrap();
    let mut level = 100.0;
    (0..len)
        .map(|_| {
            level += normal.sample(&mut rng);
            level
        })
        .collect()
}

/// Detector that returns a fixed set of scores and no flags
pub struct FixedScores {
    identity: TechniqueIdentity,
    scores: Vec<f64>,
    fitted: bool,
}

impl FixedScores {
    pub fn new(scores: Vec<f64>) -> Self {
        Self {
            identity: TechniqueIdentity::new("fixed-scores"),
            scores,
            fitted: false,
        }
    }
}

impl Technique for FixedScores {
    fn identity(&self) -> &TechniqueIdentity {
        &self.identity
    }

    fn family(&self) -> TaskFamily {
        TaskFamily::AnomalyDetection
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }
}

impl AnomalyDetector for FixedScores {
    fn fit(&mut self, _train: &Series, _ctx: &FitContext) -> Result<()> {
        self.fitted = true;
        Ok(())
    }

    fn infer(&self, _series: &Series) -> Result<AnomalyOutput> {
        if !self.fitted {
            return Err(EvalError::InvalidState("fixed-scores is not fitted".to_string()));
        }
        Ok(AnomalyOutput::from_scores(self.scores.clone()))
    }
}

/// Forecaster whose fit takes `duration`, optionally honouring cancellation
pub struct SlowForecaster {
    identity: TechniqueIdentity,
    duration: Duration,
    cooperative: bool,
    /// Set once the fit observes a cancellation request
    pub saw_cancel: Arc<AtomicBool>,
    fitted: bool,
}

impl SlowForecaster {
    pub fn new(duration: Duration, cooperative: bool) -> Self {
        Self {
            identity: TechniqueIdentity::new("slow").with_param("cooperative", cooperative),
            duration,
            cooperative,
            saw_cancel: Arc::new(AtomicBool::new(false)),
            fitted: false,
        }
    }
}

impl Technique for SlowForecaster {
    fn identity(&self) -> &TechniqueIdentity {
        &self.identity
    }

    fn family(&self) -> TaskFamily {
        TaskFamily::Forecasting
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }
}

impl Forecaster for SlowForecaster {
    fn fit(&mut self, _train: &Series, ctx: &FitContext) -> Result<()> {
        let started = Instant::now();
        while started.elapsed() < self.duration {
            if self.cooperative {
                if let Err(err) = ctx.checkpoint() {
                    self.saw_cancel.store(true, Ordering::SeqCst);
                    return Err(err);
                }
            }
            thread::sleep(Duration::from_millis(5));
        }
        self.fitted = true;
        Ok(())
    }

    fn infer(&self, _history: &Series, horizon: usize) -> Result<Vec<f64>> {
        if !self.fitted {
            return Err(EvalError::InvalidState("slow is not fitted".to_string()));
        }
        Ok(vec![0.0; horizon])
    }
}

/// Forecaster whose fit always fails, or whose inference panics
pub struct BrokenForecaster {
    identity: TechniqueIdentity,
    panic_on_infer: bool,
}

impl BrokenForecaster {
    pub fn failing_fit() -> Self {
        Self {
            identity: TechniqueIdentity::new("broken-fit"),
            panic_on_infer: false,
        }
    }

    pub fn panicking_infer() -> Self {
        Self {
            identity: TechniqueIdentity::new("broken-infer"),
            panic_on_infer: true,
        }
    }
}

impl Technique for BrokenForecaster {
    fn identity(&self) -> &TechniqueIdentity {
        &self.identity
    }

    fn family(&self) -> TaskFamily {
        TaskFamily::Forecasting
    }

    fn is_fitted(&self) -> bool {
        self.panic_on_infer
    }
}

impl Forecaster for BrokenForecaster {
    fn fit(&mut self, _train: &Series, _ctx: &FitContext) -> Result<()> {
        if self.panic_on_infer {
            Ok(())
        } else {
            Err(EvalError::Technique("solver diverged".to_string()))
        }
    }

    fn infer(&self, _history: &Series, _horizon: usize) -> Result<Vec<f64>> {
        panic!("inference blew up")
    }
}
