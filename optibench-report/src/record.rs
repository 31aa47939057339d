//! Per-case record handed from the scheduler to the tally and renderers.

use optibench_core::ParsedBound;
use optibench_logic::Verdict;
use serde::{Deserialize, Serialize};

/// Everything reported about one finished test case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseRecord {
    /// Benchmark path, also the baseline key
    pub path: String,
    /// File name for display
    pub name: String,
    pub command: String,
    pub expected: Option<f64>,
    pub result: ParsedBound,
    pub elapsed_seconds: f64,
    pub exit_code: Option<i32>,
    pub verdict: Verdict,
    /// Launch failure or adapter message, when there was one
    pub note: Option<String>,
}

impl CaseRecord {
    pub fn is_failure(&self) -> bool {
        self.verdict.is_failure()
    }
}

/// Render an optional float the way baseline files and tables do
pub fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) => format_float(v),
        None => "None".to_string(),
    }
}

/// Shortest round-tripping text for a float, with `inf`/`-inf` spelled out
pub fn format_float(value: f64) -> String {
    if value == f64::INFINITY {
        "inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        format!("{:?}", value)
    }
}
