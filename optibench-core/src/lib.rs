//! optibench Core - Problems, Execution and Output Adapters
//!
//! The leaf collaborators of a regression run:
//! - `BenchmarkProblem`, `ParsedBound` and `Mode` value types
//! - `Execution` capability with a process-group aware subprocess runner
//! - Benchmark annotation resolver (`# minimum:` / `# maximum:` / `# answer:`)
//! - `ToolOutputAdapter` turning raw solver output into a `ParsedBound`

mod adapter;
mod annotations;
mod execution;
mod literal;
mod model;

pub use adapter::{AdapterError, ToolOutputAdapter};
pub use annotations::{
    AnnotationError, UNKNOWN_SENTINEL, resolve_expected, resolve_expected_file,
};
pub use execution::{
    CancelToken, Execution, ExecutionError, ExecutionResult, ProcessExecution, ProcessGuard,
    Termination, format_command,
};
pub use literal::{Literal, LiteralError, MAX_DEPTH, parse_literal};
pub use model::{BenchmarkProblem, Mode, OuterBound, ParsedBound};
