//! Classifier
//!
//! Pure functions turning one completed run into a [`Verdict`]. No I/O, no
//! hidden state: the same inputs always produce the same verdict.
//!
//! Main state precedence, first match wins:
//!
//! ```text
//! interrupted by cancel                        NOT_RAN
//! launch failed / exited non-zero              CRASH
//! no result, budget exhausted                  TIMEOUT
//! no result                                    FAILED
//! result, no expected value                    UNKNOWN
//! result, expected value, budget exhausted     RAN_OUT
//! result, expected value                       RAN
//! ```
//!
//! Strict, width and regression axes are only evaluated for `RAN`/`RAN_OUT`.

use crate::config::ClassificationConfig;
use crate::diff::{FloatDiff, float_diff};
use crate::verdict::{MainState, RegressionState, StrictState, Verdict, WidthState};
use optibench_core::{ExecutionResult, Mode, ParsedBound};

/// Derive the main state of a run
pub fn main_state(
    execution: &ExecutionResult,
    result: &ParsedBound,
    expected: Option<f64>,
    config: &ClassificationConfig,
) -> MainState {
    if execution.was_interrupted() {
        return MainState::NotRan;
    }
    if execution.is_crash() {
        return MainState::Crash;
    }

    let exhausted = config.budget_exhausted(execution.elapsed_seconds);
    if !result.is_present() {
        return if exhausted {
            MainState::Timeout
        } else {
            MainState::Failed
        };
    }
    if expected.is_none() {
        return MainState::Unknown;
    }
    if exhausted {
        MainState::RanOut
    } else {
        MainState::Ran
    }
}

/// The outer bound crossed the expected optimum
fn crosses_optimum(mode: Mode, outer: f64, expected: f64) -> bool {
    match mode {
        Mode::Min => outer > expected,
        Mode::Max => outer < expected,
    }
}

/// Soundness and closeness of `outer` against `expected`
pub fn classify_strict(
    outer: f64,
    expected: f64,
    config: &ClassificationConfig,
) -> (StrictState, FloatDiff) {
    let diff = float_diff(expected, outer);
    let crossed = crosses_optimum(config.mode, outer, expected);

    let state = if crossed && config.strict_bounds {
        StrictState::Broken
    } else if diff.is_zero() {
        StrictState::Exact
    } else if diff.within(config.abs_tol, config.rel_tol) {
        if crossed {
            StrictState::BadClose
        } else {
            StrictState::Close
        }
    } else if crossed {
        StrictState::BadFar
    } else {
        StrictState::Far
    };
    (state, diff)
}

/// Tightness of a `[lower, upper]` interval
pub fn classify_width(
    lower: f64,
    upper: f64,
    config: &ClassificationConfig,
) -> (WidthState, FloatDiff) {
    let diff = float_diff(lower, upper);
    let state = if diff.is_zero() {
        WidthState::Point
    } else if diff.within(config.abs_tol, config.rel_tol) {
        WidthState::Narrow
    } else {
        WidthState::Wide
    };
    (state, diff)
}

/// Movement of the current outer bound against the baseline outer bound
pub fn classify_regression(
    baseline_outer: f64,
    current_outer: f64,
    config: &ClassificationConfig,
) -> (RegressionState, FloatDiff) {
    let diff = float_diff(baseline_outer, current_outer);
    if diff.is_zero() {
        return (RegressionState::Same, diff);
    }

    let improved = match config.mode {
        Mode::Min => current_outer < baseline_outer,
        Mode::Max => current_outer > baseline_outer,
    };
    let close = diff.within(config.abs_tol, config.rel_tol);
    let state = match (improved, close) {
        (true, true) => RegressionState::Better,
        (true, false) => RegressionState::FarBetter,
        (false, true) => RegressionState::Worse,
        (false, false) => RegressionState::FarWorse,
    };
    (state, diff)
}

/// Classify one completed run.
///
/// `result` is the adapter output (`ParsedBound::NONE` when nothing could be
/// parsed), `expected` the resolved optimum and `baseline` the prior result
/// for this benchmark, if any.
pub fn classify(
    execution: &ExecutionResult,
    result: &ParsedBound,
    expected: Option<f64>,
    baseline: Option<&ParsedBound>,
    config: &ClassificationConfig,
) -> Verdict {
    let main = main_state(execution, result, expected, config);
    let mut verdict = Verdict::terminal(main);
    if !main.has_comparable_result() {
        return verdict;
    }

    // Comparable states guarantee a present result and an expected value
    let (Some((lower, upper)), Some(outer), Some(expected)) = (
        result.sides(),
        result.outer(config.mode, config.outer_bound),
        expected,
    ) else {
        return verdict;
    };

    let (strict, expected_diff) = classify_strict(outer, expected, config);
    verdict.strict = strict;
    verdict.expected_diff = Some(expected_diff);

    let (width, width_diff) = classify_width(lower, upper, config);
    verdict.width = width;
    verdict.width_diff = Some(width_diff);

    if let Some(prior) = baseline.and_then(|b| b.outer(config.mode, config.outer_bound)) {
        let (regression, baseline_diff) = classify_regression(prior, outer, config);
        verdict.regression = regression;
        verdict.baseline_diff = Some(baseline_diff);
    }

    verdict
}
