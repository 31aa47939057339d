//! Verdict Axes
//!
//! A verdict is four independent categorical answers about one benchmark run:
//!
//! | axis       | question                                   |
//! |------------|--------------------------------------------|
//! | main       | did it run at all, and how did it end?     |
//! | strict     | is the answer sound and how close is it?   |
//! | width      | how tight is the reported interval?        |
//! | regression | did the answer move since the baseline?    |
//!
//! Later axes are `NOT_APPLICABLE` whenever the main state forbids them.

use crate::diff::FloatDiff;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Common behaviour of every verdict axis, used by tallies and reports
pub trait AxisState: Copy + Eq + Ord + fmt::Debug + fmt::Display + Send + 'static {
    /// Axis title as printed in summaries
    const AXIS: &'static str;
    /// Every state, in report order
    const ALL: &'static [Self];

    fn as_str(self) -> &'static str;

    /// Whether this state alone makes the run unhealthy
    fn is_failure(self) -> bool {
        false
    }
}

macro_rules! axis_display {
    ($ty:ty) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

/// Axis A: outcome status, also the terminal state of a test case
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MainState {
    /// Never ran, or interrupted by cancellation
    NotRan,
    /// Non-zero exit or launch failure
    Crash,
    /// No result and the time budget was exhausted
    Timeout,
    /// No parseable result within the time budget
    Failed,
    /// A result, but nothing to compare it against
    Unknown,
    /// A result produced after the time budget was exhausted
    RanOut,
    /// A result and an expected value
    Ran,
}

impl MainState {
    /// States for which the answer is compared and measured
    pub fn has_comparable_result(self) -> bool {
        matches!(self, MainState::Ran | MainState::RanOut)
    }
}

impl AxisState for MainState {
    const AXIS: &'static str = "MAIN_STATE";
    const ALL: &'static [Self] = &[
        MainState::NotRan,
        MainState::Crash,
        MainState::Timeout,
        MainState::Failed,
        MainState::Unknown,
        MainState::RanOut,
        MainState::Ran,
    ];

    fn as_str(self) -> &'static str {
        match self {
            MainState::NotRan => "NOT_RAN",
            MainState::Crash => "CRASH",
            MainState::Timeout => "TIMEOUT",
            MainState::Failed => "FAILED",
            MainState::Unknown => "UNKNOWN",
            MainState::RanOut => "RAN_OUT",
            MainState::Ran => "RAN",
        }
    }

    fn is_failure(self) -> bool {
        matches!(self, MainState::Crash | MainState::Failed)
    }
}

axis_display!(MainState);

/// Axis B: soundness and closeness of the outer bound to the expected value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StrictState {
    NotApplicable,
    /// Outer bound crossed the true optimum under the strict policy
    Broken,
    /// Outside tolerance and crossed the optimum (lenient policy)
    BadFar,
    Far,
    /// Within tolerance but crossed the optimum (lenient policy)
    BadClose,
    Close,
    Exact,
}

impl AxisState for StrictState {
    const AXIS: &'static str = "STRICT_STATE";
    const ALL: &'static [Self] = &[
        StrictState::NotApplicable,
        StrictState::Broken,
        StrictState::BadFar,
        StrictState::Far,
        StrictState::BadClose,
        StrictState::Close,
        StrictState::Exact,
    ];

    fn as_str(self) -> &'static str {
        match self {
            StrictState::NotApplicable => "NOT_APPLICABLE",
            StrictState::Broken => "BROKEN",
            StrictState::BadFar => "BAD_FAR",
            StrictState::Far => "FAR",
            StrictState::BadClose => "BAD_CLOSE",
            StrictState::Close => "CLOSE",
            StrictState::Exact => "EXACT",
        }
    }

    fn is_failure(self) -> bool {
        self == StrictState::Broken
    }
}

axis_display!(StrictState);

/// Axis C: tightness of the reported interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WidthState {
    NotApplicable,
    Wide,
    Narrow,
    Point,
}

impl AxisState for WidthState {
    const AXIS: &'static str = "WIDTH_STATE";
    const ALL: &'static [Self] = &[
        WidthState::NotApplicable,
        WidthState::Wide,
        WidthState::Narrow,
        WidthState::Point,
    ];

    fn as_str(self) -> &'static str {
        match self {
            WidthState::NotApplicable => "NOT_APPLICABLE",
            WidthState::Wide => "WIDE",
            WidthState::Narrow => "NARROW",
            WidthState::Point => "POINT",
        }
    }
}

axis_display!(WidthState);

/// Axis D: movement of the outer bound against the regression baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegressionState {
    NotApplicable,
    FarWorse,
    Worse,
    Same,
    Better,
    FarBetter,
}

impl AxisState for RegressionState {
    const AXIS: &'static str = "REGRESSION_STATE";
    const ALL: &'static [Self] = &[
        RegressionState::NotApplicable,
        RegressionState::FarWorse,
        RegressionState::Worse,
        RegressionState::Same,
        RegressionState::Better,
        RegressionState::FarBetter,
    ];

    fn as_str(self) -> &'static str {
        match self {
            RegressionState::NotApplicable => "NOT_APPLICABLE",
            RegressionState::FarWorse => "FAR_WORSE",
            RegressionState::Worse => "WORSE",
            RegressionState::Same => "SAME",
            RegressionState::Better => "BETTER",
            RegressionState::FarBetter => "FAR_BETTER",
        }
    }

    fn is_failure(self) -> bool {
        self == RegressionState::FarWorse
    }
}

axis_display!(RegressionState);

/// Classifier output for one completed test case. Never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub main: MainState,
    pub strict: StrictState,
    pub width: WidthState,
    pub regression: RegressionState,
    /// Outer bound against the expected value, when compared
    pub expected_diff: Option<FloatDiff>,
    /// Upper minus lower bound, when measured
    pub width_diff: Option<FloatDiff>,
    /// Outer bound against the baseline outer bound, when compared
    pub baseline_diff: Option<FloatDiff>,
}

impl Verdict {
    /// Verdict with only a main state; every other axis is not applicable
    pub fn terminal(main: MainState) -> Self {
        Self {
            main,
            strict: StrictState::NotApplicable,
            width: WidthState::NotApplicable,
            regression: RegressionState::NotApplicable,
            expected_diff: None,
            width_diff: None,
            baseline_diff: None,
        }
    }

    /// Initial state of a test case that has not run
    pub fn not_ran() -> Self {
        Self::terminal(MainState::NotRan)
    }

    /// Any axis reports a state that fails the run
    pub fn is_failure(&self) -> bool {
        self.main.is_failure() || self.strict.is_failure() || self.regression.is_failure()
    }
}
