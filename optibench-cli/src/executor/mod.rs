//! Benchmark Executor
//!
//! Turns a planned benchmark into a finished [`CaseRecord`](optibench_report::CaseRecord).
//!
//! ```text
//! BenchmarkProblem + command
//!       │
//!       ▼
//! ┌─────────────┐
//! │  TestCase   │  Execution ─► ToolOutputAdapter ─► classify
//! └──────┬──────┘
//!        │
//!        ▼
//!   CaseRecord ──► Scheduler callback ──► Tally / rows
//! ```
//!
//! ## Modules
//!
//! - [`test_case`] - Per-benchmark state machine
//! - [`metadata`] - Run metadata for JSON reports

mod metadata;
mod test_case;

pub use metadata::{build_report_meta, default_jobs, num_cpus};
pub use test_case::TestCase;
