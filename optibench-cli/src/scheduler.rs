//! Scheduler
//!
//! Runs test cases on a bounded worker pool and funnels every completion
//! through one channel, so the completion callback is never invoked
//! concurrently with itself even though cases run in parallel.
//!
//! ```text
//! feeder ──spawn_fifo──► rayon pool (min(cases, concurrency) threads)
//!                              │  TestCase::run
//!                              ▼
//!                       crossbeam channel ──► caller thread ──► on_complete
//! ```
//!
//! Cancellation: queued cases that have not started are skipped, in-flight
//! cases observe the token through their `Execution` and finish as NOT_RAN.
//! The scheduler always joins the pool before returning.

use crate::executor::TestCase;
use crossbeam_channel::unbounded;
use optibench_core::CancelToken;
use optibench_report::CaseRecord;
use rayon::ThreadPoolBuilder;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Failed to build worker pool: {0}")]
    PoolBuild(String),

    #[error("A worker panicked while running a benchmark")]
    WorkerPanicked,
}

/// Counts reported by [`Scheduler::run_all`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScheduleSummary {
    /// Cases handed to the scheduler
    pub submitted: usize,
    /// Cases that started executing
    pub dispatched: usize,
    /// Completions delivered to the callback
    pub completed: usize,
    /// The cancel token was set when the run ended
    pub cancelled: bool,
}

/// Bounded-concurrency runner for test cases
#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    concurrency: usize,
}

impl Scheduler {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Run every case, calling `on_complete` once per finished case.
    ///
    /// Blocks until all dispatched cases have completed. Completion order is
    /// first-finished-first-reported.
    pub fn run_all<F>(
        &self,
        cases: Vec<TestCase>,
        cancel: &CancelToken,
        mut on_complete: F,
    ) -> Result<ScheduleSummary, SchedulerError>
    where
        F: FnMut(CaseRecord),
    {
        let submitted = cases.len();
        if submitted == 0 {
            return Ok(ScheduleSummary {
                cancelled: cancel.is_cancelled(),
                ..ScheduleSummary::default()
            });
        }

        let workers = self.concurrency.min(submitted);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("optibench-worker-{}", i))
            .build()
            .map_err(|e| SchedulerError::PoolBuild(e.to_string()))?;
        tracing::debug!(cases = submitted, workers, "starting scheduler");

        let dispatched = AtomicUsize::new(0);
        let mut completed = 0usize;
        let (tx, rx) = unbounded::<CaseRecord>();

        let joined = thread::scope(|scope| {
            let pool = &pool;
            let dispatched = &dispatched;

            let feeder = scope.spawn(move || {
                pool.scope_fifo(|s| {
                    for mut case in cases {
                        let tx = tx.clone();
                        s.spawn_fifo(move |_| {
                            if cancel.is_cancelled() {
                                return;
                            }
                            dispatched.fetch_add(1, Ordering::SeqCst);
                            let record = case.run(cancel);
                            // Receiver lives until every sender is gone
                            let _ = tx.send(record);
                        });
                    }
                });
                drop(tx);
            });

            // Single consumer: completions are serialized here
            for record in rx.iter() {
                completed += 1;
                on_complete(record);
            }

            feeder.join()
        });

        if joined.is_err() {
            return Err(SchedulerError::WorkerPanicked);
        }

        let summary = ScheduleSummary {
            submitted,
            dispatched: dispatched.load(Ordering::SeqCst),
            completed,
            cancelled: cancel.is_cancelled(),
        };
        tracing::debug!(
            dispatched = summary.dispatched,
            completed = summary.completed,
            cancelled = summary.cancelled,
            "scheduler finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use optibench_core::{
        BenchmarkProblem, Execution, ExecutionResult, Mode, ProcessExecution, Termination,
        ToolOutputAdapter, format_command,
    };
    use optibench_logic::{ClassificationConfig, MainState};
    use std::sync::Arc;
    use std::time::Duration;

    /// Sleeps per call and records the peak number of overlapping calls
    #[derive(Default)]
    struct Sleepy {
        running: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    impl Execution for Sleepy {
        fn run(&self, argv: &[String], _: Option<Duration>, _: &CancelToken) -> ExecutionResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            self.running.fetch_sub(1, Ordering::SeqCst);
            ExecutionResult {
                command: format_command(argv),
                stdout: "Maximum upper bound 1\n".to_string(),
                stderr: String::new(),
                exit_code: Some(0),
                elapsed_seconds: 0.02,
                termination: Termination::Exited,
            }
        }
    }

    /// Cancels the run from inside the first execution
    struct Tripwire;

    impl Execution for Tripwire {
        fn run(&self, argv: &[String], _: Option<Duration>, cancel: &CancelToken) -> ExecutionResult {
            cancel.cancel();
            ExecutionResult {
                command: format_command(argv),
                stdout: String::new(),
                stderr: String::new(),
                exit_code: None,
                elapsed_seconds: 0.0,
                termination: Termination::Interrupted,
            }
        }
    }

    fn cases(n: usize, exec: Arc<dyn Execution>) -> Vec<TestCase> {
        let config = Arc::new(ClassificationConfig::default());
        (0..n)
            .map(|i| {
                let path = format!("bench/b{}.dop", i);
                TestCase::new(
                    BenchmarkProblem::new(&path, Mode::Max, Some(1.0)),
                    vec!["solver".to_string(), format!("@{}", path)],
                    exec.clone(),
                    ToolOutputAdapter::LabeledBounds,
                    config.clone(),
                )
            })
            .collect()
    }

    #[test]
    fn test_runs_all_within_bound() {
        let exec = Arc::new(Sleepy::default());
        let mut seen = Vec::new();
        let summary = Scheduler::new(3)
            .run_all(cases(8, exec.clone()), &CancelToken::new(), |r| {
                seen.push(r.path)
            })
            .unwrap();

        assert_eq!(summary.submitted, 8);
        assert_eq!(summary.dispatched, 8);
        assert_eq!(summary.completed, 8);
        assert!(!summary.cancelled);
        assert!(exec.peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(exec.calls.load(Ordering::SeqCst), 8);

        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 8);
    }

    #[test]
    fn test_single_worker_is_sequential() {
        let exec = Arc::new(Sleepy::default());
        let summary = Scheduler::new(1)
            .run_all(cases(4, exec.clone()), &CancelToken::new(), |_| {})
            .unwrap();
        assert_eq!(summary.completed, 4);
        assert_eq!(exec.peak.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_empty_backlog() {
        let mut calls = 0;
        let summary = Scheduler::new(4)
            .run_all(Vec::new(), &CancelToken::new(), |_| calls += 1)
            .unwrap();
        assert_eq!(summary, ScheduleSummary::default());
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_cancelled_before_start_dispatches_nothing() {
        let exec = Arc::new(Sleepy::default());
        let cancel = CancelToken::new();
        cancel.cancel();
        let summary = Scheduler::new(2)
            .run_all(cases(5, exec.clone()), &cancel, |_| {})
            .unwrap();
        assert_eq!(summary.dispatched, 0);
        assert_eq!(summary.completed, 0);
        assert!(summary.cancelled);
        assert_eq!(exec.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cancel_mid_run_reports_partial_counts() {
        let cancel = CancelToken::new();
        let mut states = Vec::new();
        let summary = Scheduler::new(1)
            .run_all(cases(5, Arc::new(Tripwire)), &cancel, |r| {
                states.push(r.verdict.main)
            })
            .unwrap();

        assert!(summary.cancelled);
        assert!(summary.dispatched < 5);
        assert_eq!(summary.dispatched, summary.completed);
        assert!(states.iter().all(|s| *s == MainState::NotRan));
    }

    #[test]
    fn test_cancel_kills_real_solver_processes() {
        let dir = tempfile::tempdir().unwrap();
        let exec: Arc<dyn Execution> = Arc::new(ProcessExecution::new(Duration::from_millis(200)));
        let config = Arc::new(ClassificationConfig::default());
        let pid_files: Vec<_> = (0..4).map(|i| dir.path().join(format!("pid{}", i))).collect();
        let cases: Vec<TestCase> = pid_files
            .iter()
            .enumerate()
            .map(|(i, pid_file)| {
                let script = format!("echo $$ > '{}'; exec sleep 30", pid_file.display());
                TestCase::new(
                    BenchmarkProblem::new(format!("bench/s{}.dop", i), Mode::Max, Some(1.0)),
                    vec!["sh".to_string(), "-c".to_string(), script],
                    exec.clone(),
                    ToolOutputAdapter::LabeledBounds,
                    config.clone(),
                )
            })
            .collect();

        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        let watched = pid_files.clone();
        let canceller = thread::spawn(move || {
            // Wait for every solver to report its pid, then cancel
            let deadline = std::time::Instant::now() + Duration::from_secs(5);
            while !watched.iter().all(|p| p.exists()) && std::time::Instant::now() < deadline {
                thread::sleep(Duration::from_millis(20));
            }
            thread::sleep(Duration::from_millis(100));
            trigger.cancel();
        });

        let start = std::time::Instant::now();
        let mut states = Vec::new();
        let summary = Scheduler::new(4)
            .run_all(cases, &cancel, |r| states.push(r.verdict.main))
            .unwrap();
        canceller.join().unwrap();

        assert!(start.elapsed() < Duration::from_secs(10));
        assert!(summary.cancelled);
        assert_eq!(summary.dispatched, summary.completed);
        assert_eq!(summary.completed, 4);
        assert_eq!(states.len(), 4);
        assert!(states.iter().all(|s| *s == MainState::NotRan));

        for pid_file in &pid_files {
            let pid: libc::pid_t = std::fs::read_to_string(pid_file)
                .unwrap()
                .trim()
                .parse()
                .unwrap();
            // SAFETY: signal 0 only checks that the process or group exists
            assert_eq!(unsafe { libc::kill(pid, 0) }, -1, "pid {} still alive", pid);
            // SAFETY: as above, for the whole process group
            assert_eq!(unsafe { libc::kill(-pid, 0) }, -1, "group {} still alive", pid);
        }
    }
}
