//! Subprocess Execution
//!
//! Runs one solver argument vector as a child process and captures everything
//! the classifier needs: stdout, stderr, exit code and wall-clock time. No
//! shell is involved, so an argument containing spaces reaches the solver as
//! one argument.
//!
//! Launch failures are values, not errors. A command that cannot be started
//! yields an [`ExecutionResult`] with [`Termination::LaunchFailed`] so the
//! failure surfaces later as a `CRASH` classification instead of escaping into
//! the scheduler.
//!
//! ## Termination
//!
//! ```text
//! spawn ──► poll try_wait every 10ms ──► exited ───────────► Exited
//!                 │
//!                 ├── cancel token set ──► SIGTERM/SIGKILL ─► Interrupted
//!                 │
//!                 └── deadline passed ───► SIGTERM/SIGKILL ─► KilledAtDeadline
//! ```
//!
//! Each child runs in its own process group, so the signals also reach any
//! grandchildren a wrapper script started. The group is always signalled
//! before its leader is reaped: an unreaped leader keeps the group id from
//! being reused. A [`ProcessGuard`] kills and reaps the group on drop; no
//! child outlives the call that spawned it.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::io::Read;
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use thiserror::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Errors raised while driving a child process
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Empty command line")]
    EmptyCommand,

    #[error("Failed to spawn '{program}': {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to wait for child: {0}")]
    Wait(#[from] std::io::Error),
}

/// How a run attempt ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The process exited (or died from a signal it was not sent by us)
    Exited,
    /// The harness killed the process after its timeout plus grace period
    KilledAtDeadline,
    /// The harness killed the process because the run was cancelled
    Interrupted,
    /// The process never started
    LaunchFailed { message: String },
}

/// Outcome of one run attempt. Immutable once returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub command: String,
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was killed by a signal or never started
    pub exit_code: Option<i32>,
    pub elapsed_seconds: f64,
    pub termination: Termination,
}

impl ExecutionResult {
    /// Result for a command that could not be started
    pub fn launch_failed(command: &str, message: String, elapsed: Duration) -> Self {
        Self {
            command: command.to_string(),
            stdout: String::new(),
            stderr: String::new(),
            exit_code: None,
            elapsed_seconds: elapsed.as_secs_f64(),
            termination: Termination::LaunchFailed { message },
        }
    }

    /// The process was started and reaped
    pub fn completed(&self) -> bool {
        !matches!(self.termination, Termination::LaunchFailed { .. })
    }

    /// Exited on its own with a non-zero (or signal) status, or never started
    pub fn is_crash(&self) -> bool {
        match self.termination {
            Termination::Exited => self.exit_code != Some(0),
            Termination::LaunchFailed { .. } => true,
            Termination::KilledAtDeadline | Termination::Interrupted => false,
        }
    }

    pub fn was_interrupted(&self) -> bool {
        self.termination == Termination::Interrupted
    }

    /// Stdout followed by stderr, the text adapters parse
    pub fn combined_output(&self) -> String {
        let mut text = String::with_capacity(self.stdout.len() + self.stderr.len() + 1);
        text.push_str(&self.stdout);
        if !self.stderr.is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&self.stderr);
        }
        text
    }
}

/// Cooperative cancellation flag shared between the signal handler, the
/// scheduler and every running execution.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Render an argument vector as one display line.
///
/// Arguments containing whitespace, quotes or backslashes are single-quoted
/// so the line reads back unambiguously in reports and logs.
pub fn format_command(argv: &[String]) -> String {
    argv.iter()
        .map(|arg| quote_arg(arg))
        .collect::<Vec<_>>()
        .join(" ")
}

fn quote_arg(arg: &str) -> Cow<'_, str> {
    let plain = !arg.is_empty()
        && !arg
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '\'' | '"' | '\\'));
    if plain {
        Cow::Borrowed(arg)
    } else {
        Cow::Owned(format!("'{}'", arg.replace('\'', r"'\''")))
    }
}

/// Capability to run a program to completion.
///
/// Implementations must be callable from many worker threads at once; each
/// call is independent.
pub trait Execution: Send + Sync {
    /// Run `argv` (program first), enforcing `timeout` when given, and
    /// observe `cancel`.
    fn run(&self, argv: &[String], timeout: Option<Duration>, cancel: &CancelToken)
    -> ExecutionResult;
}

/// Real subprocess execution
#[derive(Debug, Clone)]
pub struct ProcessExecution {
    /// Extra time granted past the timeout before SIGTERM, and between
    /// SIGTERM and SIGKILL
    kill_grace: Duration,
}

impl ProcessExecution {
    pub fn new(kill_grace: Duration) -> Self {
        Self { kill_grace }
    }

    fn spawn(&self, argv: &[String]) -> Result<Child, ExecutionError> {
        let (program, args) = argv.split_first().ok_or(ExecutionError::EmptyCommand)?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0);

        cmd.spawn().map_err(|source| ExecutionError::SpawnFailed {
            program: program.to_string(),
            source,
        })
    }

    fn wait(
        &self,
        guard: &mut ProcessGuard,
        start: Instant,
        timeout: Option<Duration>,
        cancel: &CancelToken,
    ) -> Result<(Option<ExitStatus>, Termination), ExecutionError> {
        let deadline = timeout.map(|t| start + t + self.kill_grace);
        loop {
            if let Some(status) = guard.try_wait()? {
                return Ok((Some(status), Termination::Exited));
            }
            if cancel.is_cancelled() {
                let status = guard.terminate(self.kill_grace)?;
                return Ok((status, Termination::Interrupted));
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                let status = guard.terminate(self.kill_grace)?;
                return Ok((status, Termination::KilledAtDeadline));
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Default for ProcessExecution {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

impl Execution for ProcessExecution {
    fn run(
        &self,
        argv: &[String],
        timeout: Option<Duration>,
        cancel: &CancelToken,
    ) -> ExecutionResult {
        let start = Instant::now();
        let command = format_command(argv);
        let command = command.as_str();

        let mut child = match self.spawn(argv) {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!(command, error = %e, "unable to launch solver");
                return ExecutionResult::launch_failed(command, e.to_string(), start.elapsed());
            }
        };

        let stdout = child.stdout.take().map(spawn_reader);
        let stderr = child.stderr.take().map(spawn_reader);
        let mut guard = ProcessGuard::new(child);

        let (status, termination) = match self.wait(&mut guard, start, timeout, cancel) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(command, error = %e, "lost track of solver process");
                let _ = guard.terminate(self.kill_grace);
                (None, Termination::Exited)
            }
        };
        let elapsed = start.elapsed();

        let stdout = join_reader(stdout);
        let stderr = join_reader(stderr);
        let exit_code = status.and_then(|s| s.code());

        if termination == Termination::Exited && exit_code != Some(0) {
            tracing::debug!(command, ?exit_code, stderr = %stderr.trim(), "solver exited abnormally");
        }

        ExecutionResult {
            command: command.to_string(),
            stdout,
            stderr,
            exit_code,
            elapsed_seconds: elapsed.as_secs_f64(),
            termination,
        }
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<String> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn join_reader(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

/// Send `signal` to the whole process group led by `pid`.
///
/// Callers only pass the pid of a child they have not reaped yet, so the
/// group id still names that child's group.
fn signal_group(pid: u32, signal: libc::c_int) -> Result<(), std::io::Error> {
    // SAFETY: kill(2) takes plain integers and touches no memory of ours
    let ret = unsafe { libc::kill(-(pid as libc::pid_t), signal) };
    if ret == -1 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// Whether the child `pid` has exited, leaving it unreaped
fn leader_exited(pid: u32) -> Result<bool, std::io::Error> {
    // SAFETY: siginfo_t is a plain C struct for which all zeroes is valid
    let mut info: libc::siginfo_t = unsafe { std::mem::zeroed() };
    // SAFETY: `info` is a live, writable siginfo_t for the whole call.
    // WNOWAIT leaves the child waitable, so `Child` still owns reaping it.
    let ret = unsafe {
        libc::waitid(
            libc::P_PID,
            pid as libc::id_t,
            &mut info,
            libc::WEXITED | libc::WNOHANG | libc::WNOWAIT,
        )
    };
    if ret == -1 {
        return Err(std::io::Error::last_os_error());
    }
    // Untouched (all zero) when WNOHANG found nothing to report
    Ok(info.si_signo != 0)
}

/// RAII owner of a child process group.
///
/// Dropping a guard whose child was never reaped kills and reaps the group.
pub struct ProcessGuard {
    child: Child,
    pid: u32,
    reaped: bool,
}

impl ProcessGuard {
    pub fn new(child: Child) -> Self {
        let pid = child.id();
        Self {
            child,
            pid,
            reaped: false,
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Non-blocking exit check.
    ///
    /// Once the leader has exited, stragglers left in its group are killed
    /// before the leader is reaped; they would otherwise hold our pipes open.
    pub fn try_wait(&mut self) -> Result<Option<ExitStatus>, std::io::Error> {
        if self.reaped || !leader_exited(self.pid)? {
            return Ok(None);
        }
        let _ = signal_group(self.pid, libc::SIGKILL);
        let status = self.child.wait()?;
        self.reaped = true;
        Ok(Some(status))
    }

    /// SIGTERM the group, wait up to `grace`, then SIGKILL and reap.
    pub fn terminate(&mut self, grace: Duration) -> Result<Option<ExitStatus>, std::io::Error> {
        if self.reaped {
            return Ok(None);
        }
        // Ignore delivery errors: the group may already be gone
        let _ = signal_group(self.pid, libc::SIGTERM);

        let grace_deadline = Instant::now() + grace;
        while Instant::now() < grace_deadline {
            if let Some(status) = self.try_wait()? {
                return Ok(Some(status));
            }
            std::thread::sleep(POLL_INTERVAL);
        }

        let _ = signal_group(self.pid, libc::SIGKILL);
        let _ = self.child.kill();
        let status = self.child.wait()?;
        self.reaped = true;
        Ok(Some(status))
    }
}

impl Drop for ProcessGuard {
    fn drop(&mut self) {
        if !self.reaped {
            tracing::debug!(pid = self.pid, "reaping orphaned solver process");
            let _ = signal_group(self.pid, libc::SIGKILL);
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
