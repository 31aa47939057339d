//! Test Case
//!
//! The unit of work: one benchmark problem, its argument vector, the execution
//! capability, the output adapter and the run-wide classification config.
//!
//! ## State machine
//!
//! ```text
//! NOT_RAN ──run()──► CRASH | TIMEOUT | FAILED | UNKNOWN | RAN_OUT | RAN
//!    │
//!    └── interrupted by cancel ──► NOT_RAN (terminal)
//! ```
//!
//! A finished case never runs again; calling [`TestCase::run`] a second time
//! returns the recorded outcome.

use optibench_core::{
    BenchmarkProblem, CancelToken, Execution, ParsedBound, Termination, ToolOutputAdapter,
    format_command,
};
use optibench_logic::{ClassificationConfig, MainState, classify};
use optibench_report::CaseRecord;
use std::sync::Arc;

pub struct TestCase {
    problem: BenchmarkProblem,
    argv: Vec<String>,
    /// Display form of `argv` for logs and reports
    command: String,
    execution: Arc<dyn Execution>,
    adapter: ToolOutputAdapter,
    config: Arc<ClassificationConfig>,
    outcome: Option<CaseRecord>,
}

impl TestCase {
    pub fn new(
        problem: BenchmarkProblem,
        argv: Vec<String>,
        execution: Arc<dyn Execution>,
        adapter: ToolOutputAdapter,
        config: Arc<ClassificationConfig>,
    ) -> Self {
        Self {
            problem,
            command: format_command(&argv),
            argv,
            execution,
            adapter,
            config,
            outcome: None,
        }
    }

    pub fn problem(&self) -> &BenchmarkProblem {
        &self.problem
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// Current main state; `NOT_RAN` until the case has finished
    pub fn state(&self) -> MainState {
        self.outcome
            .as_ref()
            .map(|r| r.verdict.main)
            .unwrap_or(MainState::NotRan)
    }

    /// Run once: execute, parse, classify
    pub fn run(&mut self, cancel: &CancelToken) -> CaseRecord {
        if let Some(record) = &self.outcome {
            return record.clone();
        }

        let key = self.problem.key();
        tracing::debug!(benchmark = %key, command = %self.command, "dispatching");

        let execution = self
            .execution
            .run(&self.argv, self.config.timeout(), cancel);

        let mut note = match &execution.termination {
            Termination::LaunchFailed { message } => Some(message.clone()),
            Termination::Interrupted => Some("interrupted".to_string()),
            _ => None,
        };

        let result = if execution.was_interrupted() {
            ParsedBound::NONE
        } else {
            match self
                .adapter
                .parse(&execution.combined_output(), self.config.mode)
            {
                Ok(bound) => bound,
                Err(e) => {
                    tracing::debug!(benchmark = %key, error = %e, "no usable result");
                    note.get_or_insert_with(|| e.to_string());
                    ParsedBound::NONE
                }
            }
        };

        let baseline = self.config.baseline_for(&key);
        if self.config.regression_baseline.is_some() && baseline.is_none() {
            tracing::warn!(benchmark = %key, "no baseline row for benchmark");
        }

        let verdict = classify(
            &execution,
            &result,
            self.problem.expected,
            baseline,
            &self.config,
        );

        let record = CaseRecord {
            path: key,
            name: self.problem.name.clone(),
            command: self.command.clone(),
            expected: self.problem.expected,
            result,
            elapsed_seconds: execution.elapsed_seconds,
            exit_code: execution.exit_code,
            verdict,
            note,
        };
        self.outcome = Some(record.clone());
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use optibench_core::{ExecutionResult, Mode};
    use optibench_logic::{RegressionBaseline, RegressionState, StrictState};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Canned execution that counts invocations and keeps the last argv
    struct Canned {
        stdout: String,
        exit_code: Option<i32>,
        termination: Termination,
        calls: AtomicUsize,
        seen: Mutex<Vec<String>>,
    }

    impl Canned {
        fn ok(stdout: &str) -> Arc<Self> {
            Arc::new(Self {
                stdout: stdout.to_string(),
                exit_code: Some(0),
                termination: Termination::Exited,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl Execution for Canned {
        fn run(&self, argv: &[String], _: Option<Duration>, _: &CancelToken) -> ExecutionResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.seen.lock().unwrap() = argv.to_vec();
            ExecutionResult {
                command: format_command(argv),
                stdout: self.stdout.clone(),
                stderr: String::new(),
                exit_code: self.exit_code,
                elapsed_seconds: 0.5,
                termination: self.termination.clone(),
            }
        }
    }

    fn case(exec: Arc<Canned>, expected: Option<f64>, config: ClassificationConfig) -> TestCase {
        TestCase::new(
            BenchmarkProblem::new("bench/a.dop", Mode::Max, expected),
            vec!["solver".to_string(), "@bench/a.dop".to_string()],
            exec,
            ToolOutputAdapter::LabeledBounds,
            Arc::new(config),
        )
    }

    #[test]
    fn test_run_classifies_and_records() {
        let exec = Canned::ok("Maximum lower bound 9.5\nMaximum upper bound 10\n");
        let mut tc = case(exec, Some(10.0), ClassificationConfig::default());
        assert_eq!(tc.state(), MainState::NotRan);

        let record = tc.run(&CancelToken::new());
        assert_eq!(record.verdict.main, MainState::Ran);
        assert_eq!(record.verdict.strict, StrictState::Exact);
        assert_eq!(record.result, ParsedBound::interval(9.5, 10.0));
        assert_eq!(record.path, "bench/a.dop");
        assert_eq!(record.name, "a.dop");
        assert_eq!(tc.state(), MainState::Ran);
    }

    #[test]
    fn test_spaced_path_reaches_execution_as_one_argument() {
        let exec = Canned::ok("Maximum upper bound 1\n");
        let argv = vec!["solver".to_string(), "@bench dir/a b.dop".to_string()];
        let mut tc = TestCase::new(
            BenchmarkProblem::new("bench dir/a b.dop", Mode::Max, Some(1.0)),
            argv.clone(),
            exec.clone(),
            ToolOutputAdapter::LabeledBounds,
            Arc::new(ClassificationConfig::default()),
        );
        let record = tc.run(&CancelToken::new());
        assert_eq!(*exec.seen.lock().unwrap(), argv);
        assert_eq!(record.command, "solver '@bench dir/a b.dop'");
        assert_eq!(record.verdict.main, MainState::Ran);
    }

    #[test]
    fn test_finished_case_never_reruns() {
        let exec = Canned::ok("Maximum upper bound 1\n");
        let mut tc = case(exec.clone(), Some(1.0), ClassificationConfig::default());
        let first = tc.run(&CancelToken::new());
        let second = tc.run(&CancelToken::new());
        assert_eq!(exec.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.verdict, second.verdict);
    }

    #[test]
    fn test_unparseable_output_is_failed_with_note() {
        let exec = Canned::ok("Traceback: solver blew up\n");
        let mut tc = case(exec, Some(1.0), ClassificationConfig::default());
        let record = tc.run(&CancelToken::new());
        assert_eq!(record.verdict.main, MainState::Failed);
        assert_eq!(record.note.as_deref(), Some("No result found in tool output"));
    }

    #[test]
    fn test_interrupted_case_stays_not_ran() {
        let exec = Arc::new(Canned {
            stdout: "Maximum upper bound 1\n".to_string(),
            exit_code: None,
            termination: Termination::Interrupted,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        });
        let mut tc = case(exec, Some(1.0), ClassificationConfig::default());
        let record = tc.run(&CancelToken::new());
        assert_eq!(record.verdict.main, MainState::NotRan);
        assert!(!record.result.is_present());
    }

    #[test]
    fn test_baseline_entry_drives_regression() {
        let mut baseline = RegressionBaseline::new();
        baseline.insert("bench/a.dop".to_string(), ParsedBound::point(2.0));
        let config = ClassificationConfig::default().with_baseline(baseline);

        let exec = Canned::ok("Maximum upper bound 1\n");
        let mut tc = case(exec, Some(1.0), config);
        let record = tc.run(&CancelToken::new());
        assert_eq!(record.verdict.regression, RegressionState::FarWorse);
    }
}
