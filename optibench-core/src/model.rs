//! Benchmark Data Model
//!
//! Plain value types shared by every stage of a regression run: the
//! optimization direction, the normalized solver answer and the benchmark
//! problem itself.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Optimization direction a benchmark is evaluated under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    /// Find the global minimum
    #[serde(alias = "min", alias = "minimize")]
    Min,
    /// Find the global maximum
    #[default]
    #[serde(alias = "max", alias = "maximize")]
    Max,
}

impl Mode {
    /// Upper-case name used in baseline headers and reports
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Min => "MIN",
            Mode::Max => "MAX",
        }
    }

    /// Lower-case name used when expanding command templates
    pub fn flag(self) -> &'static str {
        match self {
            Mode::Min => "min",
            Mode::Max => "max",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "min" | "minimize" | "minimum" => Ok(Mode::Min),
            "max" | "maximize" | "maximum" => Ok(Mode::Max),
            other => Err(format!("Unknown optimization mode: {}", other)),
        }
    }
}

/// Which end of a reported interval must never cross the true optimum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OuterBound {
    /// Lower bound for MIN, upper bound for MAX
    #[default]
    Auto,
    /// Always the lower bound
    Lower,
    /// Always the upper bound
    Upper,
}

impl FromStr for OuterBound {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(OuterBound::Auto),
            "lower" => Ok(OuterBound::Lower),
            "upper" => Ok(OuterBound::Upper),
            other => Err(format!("Unknown outer bound side: {}", other)),
        }
    }
}

/// Normalized solver answer: an optional lower and upper bound.
///
/// Both sides absent means the tool produced no result. Equal sides are a
/// point answer. NaN is never stored; constructors map it to absent.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ParsedBound {
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

impl ParsedBound {
    /// No result at all
    pub const NONE: ParsedBound = ParsedBound {
        lower: None,
        upper: None,
    };

    /// Build a bound from optional sides, discarding NaN
    pub fn new(lower: Option<f64>, upper: Option<f64>) -> Self {
        Self {
            lower: lower.filter(|v| !v.is_nan()),
            upper: upper.filter(|v| !v.is_nan()),
        }
    }

    /// Interval with both sides present
    pub fn interval(lower: f64, upper: f64) -> Self {
        Self::new(Some(lower), Some(upper))
    }

    /// Point answer
    pub fn point(value: f64) -> Self {
        Self::new(Some(value), Some(value))
    }

    /// Whether the tool produced anything at all
    pub fn is_present(&self) -> bool {
        self.lower.is_some() || self.upper.is_some()
    }

    /// Both sides, with a missing side treated as unbounded.
    ///
    /// Returns `None` only when neither side is present.
    pub fn sides(&self) -> Option<(f64, f64)> {
        if !self.is_present() {
            return None;
        }
        Some((
            self.lower.unwrap_or(f64::NEG_INFINITY),
            self.upper.unwrap_or(f64::INFINITY),
        ))
    }

    /// The bound on the side a sound tool must never cross
    pub fn outer(&self, mode: Mode, side: OuterBound) -> Option<f64> {
        let (lower, upper) = self.sides()?;
        let use_lower = match side {
            OuterBound::Auto => mode == Mode::Min,
            OuterBound::Lower => true,
            OuterBound::Upper => false,
        };
        Some(if use_lower { lower } else { upper })
    }

    /// Lower bound strictly greater than upper bound
    pub fn is_upside_down(&self) -> bool {
        matches!(self.sides(), Some((lower, upper)) if lower > upper)
    }
}

/// One benchmark problem file.
///
/// Identity is the path as given on the command line or recorded in a
/// baseline file; `name` is its final component for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkProblem {
    pub path: PathBuf,
    pub name: String,
    pub mode: Mode,
    /// Expected optimum for `mode`; `None` means unknown/unchecked
    pub expected: Option<f64>,
}

impl BenchmarkProblem {
    pub fn new(path: impl Into<PathBuf>, mode: Mode, expected: Option<f64>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            path,
            name,
            mode,
            expected: expected.filter(|v| !v.is_nan()),
        }
    }

    /// Key used to match this problem against a regression baseline
    pub fn key(&self) -> String {
        self.path.display().to_string()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
