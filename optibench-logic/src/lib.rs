//! optibench Logic - Result Classification Engine
//!
//! Turns a completed solver run into a four-axis [`Verdict`]:
//! main state, strictness, interval width and regression against a baseline.
//! Everything here is pure; tallying and reporting live in `optibench-report`.

mod classify;
mod config;
mod diff;
mod verdict;

pub use classify::{classify, classify_regression, classify_strict, classify_width, main_state};
pub use config::{ClassificationConfig, ConfigError, RegressionBaseline};
pub use diff::{FloatDiff, float_diff};
pub use verdict::{AxisState, MainState, RegressionState, StrictState, Verdict, WidthState};
