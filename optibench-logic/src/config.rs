//! Classification configuration, immutable for the duration of a run.

use optibench_core::{Mode, OuterBound, ParsedBound};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Prior results keyed by benchmark path
pub type RegressionBaseline = HashMap<String, ParsedBound>;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be a finite non-negative number, got {value}")]
    InvalidTolerance { name: &'static str, value: f64 },
}

/// Run-wide tolerance, mode and soundness policy
#[derive(Debug, Clone)]
pub struct ClassificationConfig {
    pub mode: Mode,
    pub abs_tol: f64,
    pub rel_tol: f64,
    /// Time budget per benchmark; `0` disables the budget
    pub timeout_seconds: u64,
    /// Crossing the outer bound is `BROKEN` rather than `BAD_*`
    pub strict_bounds: bool,
    pub outer_bound: OuterBound,
    pub regression_baseline: Option<Arc<RegressionBaseline>>,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Max,
            abs_tol: 1e-12,
            rel_tol: 0.01,
            timeout_seconds: 60,
            strict_bounds: true,
            outer_bound: OuterBound::Auto,
            regression_baseline: None,
        }
    }
}

impl ClassificationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [("abs_tol", self.abs_tol), ("rel_tol", self.rel_tol)] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidTolerance { name, value });
            }
        }
        Ok(())
    }

    /// Process-level budget, `None` when unbounded
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_seconds > 0).then(|| Duration::from_secs(self.timeout_seconds))
    }

    /// Elapsed time has exhausted the budget
    pub fn budget_exhausted(&self, elapsed_seconds: f64) -> bool {
        self.timeout_seconds > 0 && elapsed_seconds >= self.timeout_seconds as f64
    }

    /// Baseline entry recorded for `key`
    pub fn baseline_for(&self, key: &str) -> Option<&ParsedBound> {
        self.regression_baseline.as_ref()?.get(key)
    }

    pub fn with_baseline(mut self, baseline: RegressionBaseline) -> Self {
        self.regression_baseline = Some(Arc::new(baseline));
        self
    }
}
