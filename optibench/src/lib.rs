//! # optibench
//!
//! Regression harness for global optimization solvers.
//!
//! optibench runs a solver over a directory of benchmark problems and judges
//! every answer on four independent axes:
//! - **Main state**: did the tool run, crash, time out or print nothing usable
//! - **Strictness**: is the reported outer bound sound and close to the known optimum
//! - **Width**: how tight the reported interval is
//! - **Regression**: did the answer improve or degrade against a recorded baseline
//!
//! Benchmarks run on a bounded worker pool; completions are tallied by a
//! single consumer and the process exit status reflects run health.
//!
//! ## Quick Start
//!
//! ```text
//! optibench benchmarks/ --exe gelpia -j 8 -o baseline.tsv
//! optibench -r baseline.tsv --exe ./gelpia-dev
//! ```
//!
//! ## Library use
//!
//! ```ignore
//! use optibench::{ClassificationConfig, ExecutionResult, ParsedBound, classify};
//!
//! let verdict = classify(&execution, &ParsedBound::point(1.0), Some(1.0), None, &config);
//! assert!(!verdict.is_failure());
//! ```

// Re-export core types
pub use optibench_core::{
    AdapterError, BenchmarkProblem, CancelToken, Execution, ExecutionResult, Mode, OuterBound,
    ParsedBound, ProcessExecution, Termination, ToolOutputAdapter, resolve_expected,
    resolve_expected_file,
};

// Re-export classification
pub use optibench_logic::{
    AxisState, ClassificationConfig, FloatDiff, MainState, RegressionState, StrictState,
    Verdict, WidthState, classify, float_diff,
};

// Re-export reporting
pub use optibench_report::{
    Baseline, BaselineHeader, CaseRecord, OutputFormat, RunHealth, RunReport, Tally,
};

// Re-export the runner
pub use optibench_cli::{
    Cli, HarnessError, OptiConfig, RunStatus, ScheduleSummary, Scheduler, TestCase,
    run_with_cli,
};

/// Run the optibench CLI harness with the process arguments.
///
/// ```ignore
/// fn main() -> std::process::ExitCode {
///     optibench::run().map(|s| s.exit_code()).unwrap_or(std::process::ExitCode::from(2))
/// }
/// ```
pub use optibench_cli::run;
