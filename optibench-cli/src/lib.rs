//! optibench CLI Library
//!
//! Command line front end for solver regression runs: resolves settings from
//! built-in defaults, `optibench.toml`, CLI flags and (with `-r`) the header of
//! a recorded baseline, plans the benchmarks, runs them on the scheduler and
//! renders the report.
//!
//! # Example
//!
//! ```ignore
//! fn main() -> std::process::ExitCode {
//!     match optibench_cli::run() {
//!         Ok(status) => status.exit_code(),
//!         Err(e) => {
//!             eprintln!("Error: {:#}", e);
//!             std::process::ExitCode::from(2)
//!         }
//!     }
//! }
//! ```

mod config;
mod executor;
mod planner;
mod scheduler;

pub use config::*;
pub use executor::{TestCase, build_report_meta, default_jobs, num_cpus};
pub use planner::{
    CommandContext, ExecutionPlan, build_plan, discover_benchmarks, render_command,
};
pub use scheduler::{ScheduleSummary, Scheduler, SchedulerError};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use optibench_core::{
    CancelToken, Execution, Mode, OuterBound, ProcessExecution, ToolOutputAdapter,
    format_command,
};
use optibench_logic::{ClassificationConfig, ConfigError};
use optibench_report::{
    Baseline, BaselineHeader, CaseRecord, ColorChoice, ConsistencyError, OutputFormat,
    RunHealth, RunReport, RunSettings, Style, SummaryOptions, Tally, format_case,
    format_header, format_row, format_summary, generate_json_report,
};
use regex::Regex;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// optibench CLI arguments
#[derive(Parser, Debug)]
#[command(name = "optibench")]
#[command(
    author,
    version,
    about = "optibench - regression harness for global optimization solvers"
)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Optional subcommand (Run, List, Init); defaults to Run
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub args: RunArgs,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run benchmarks (default)
    Run(RunArgs),
    /// Print the execution plan without running anything
    List(RunArgs),
    /// Print a default optibench.toml
    Init,
}

/// Options shared by `run` and `list`
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Directory walked recursively for benchmark files
    #[arg(value_name = "BENCHMARK_DIR")]
    pub benchmark_dir: Option<PathBuf>,

    /// Solver executable
    #[arg(long)]
    pub exe: Option<String>,

    /// Output adapter: labeled, bracket, list
    #[arg(long)]
    pub adapter: Option<String>,

    /// Extra flags passed to the solver
    #[arg(long, allow_hyphen_values = true)]
    pub flags: Option<String>,

    /// Number of benchmarks run concurrently
    #[arg(short = 'j', long = "procs")]
    pub procs: Option<usize>,

    /// Per-benchmark time budget in seconds (0 = none)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Minimize instead of maximize
    #[arg(long)]
    pub min: bool,

    /// Absolute tolerance for CLOSE / NARROW / BETTER / WORSE
    #[arg(long)]
    pub abs_tol: Option<f64>,

    /// Relative tolerance for CLOSE / NARROW / BETTER / WORSE
    #[arg(long)]
    pub rel_tol: Option<f64>,

    /// Report a crossed outer bound as BAD_CLOSE / BAD_FAR instead of BROKEN
    #[arg(long)]
    pub lenient: bool,

    /// Bound that must never cross the optimum: auto, lower, upper
    #[arg(long)]
    pub outer_bound: Option<String>,

    /// Benchmark file extension
    #[arg(long)]
    pub ext: Option<String>,

    /// Only run benchmarks whose path matches this regex
    #[arg(long)]
    pub filter: Option<String>,

    /// Re-run the benchmarks of a recorded baseline and compare against it
    #[arg(short = 'r', long = "regression", value_name = "BASELINE")]
    pub regression: Option<PathBuf>,

    /// Write a new regression baseline after a complete run
    #[arg(short = 'o', long = "save-baseline", value_name = "NEW_BASELINE")]
    pub save_baseline: Option<PathBuf>,

    /// Output format: human, tsv, csv, json
    #[arg(long)]
    pub format: Option<String>,

    /// Also write the final report to this file
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Colorize output: auto, always, never
    #[arg(long)]
    pub color: Option<String>,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,

    /// Configuration file (skips optibench.toml discovery)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Harness-level failures; per-benchmark failures are verdicts, not errors
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error(
        "Consistency error: {dispatched} benchmark(s) dispatched but {tallied} tallied"
    )]
    Consistency { dispatched: usize, tallied: usize },

    #[error(
        "Consistency error: {submitted} benchmark(s) submitted but only {dispatched} dispatched"
    )]
    Incomplete { submitted: usize, dispatched: usize },

    #[error("A benchmark directory is required unless a regression baseline is given")]
    MissingBenchmarkDir,

    #[error("Invalid filter regex: {0}")]
    InvalidFilter(#[from] regex::Error),

    #[error("Invalid value for --{option}: {message}")]
    InvalidOption {
        option: &'static str,
        message: String,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

impl From<ConsistencyError> for HarnessError {
    fn from(e: ConsistencyError) -> Self {
        HarnessError::Consistency {
            dispatched: e.dispatched,
            tallied: e.tallied,
        }
    }
}

/// How a completed invocation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Nothing failed (also used by `list` and `init`)
    Healthy,
    /// At least one CRASH, FAILED, BROKEN or FAR_WORSE
    Unhealthy { failures: usize },
    /// The operator interrupted the run; the report is partial
    Cancelled,
}

impl RunStatus {
    pub fn code(self) -> u8 {
        match self {
            RunStatus::Healthy => 0,
            RunStatus::Unhealthy { .. } => 1,
            RunStatus::Cancelled => 130,
        }
    }

    pub fn exit_code(self) -> ExitCode {
        ExitCode::from(self.code())
    }
}

/// Run the optibench CLI with the process arguments.
pub fn run() -> anyhow::Result<RunStatus> {
    let cli = Cli::parse();
    run_with_cli(cli)
}

/// Run the optibench CLI with pre-parsed arguments.
pub fn run_with_cli(cli: Cli) -> anyhow::Result<RunStatus> {
    let (command, args) = match cli.command {
        Some(Commands::Init) => {
            print!("{}", OptiConfig::default_toml());
            return Ok(RunStatus::Healthy);
        }
        Some(Commands::List(args)) => (Action::List, args),
        Some(Commands::Run(args)) => (Action::Run, args),
        None => (Action::Run, cli.args),
    };

    init_tracing(args.verbose);

    let config = match &args.config {
        Some(path) => OptiConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => OptiConfig::discover().unwrap_or_default(),
    };

    let settings = resolve_settings(&args, &config)?;
    let plan = plan_benchmarks(&args, &settings)?;

    match command {
        Action::List => {
            list_benchmarks(&plan, &settings);
            Ok(RunStatus::Healthy)
        }
        Action::Run => run_benchmarks(&args, plan, settings),
    }
}

#[derive(Debug, Clone, Copy)]
enum Action {
    Run,
    List,
}

/// Log to stderr; `-v` raises optibench targets to debug, RUST_LOG wins
fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let default_filter = format!(
        "optibench={level},optibench_cli={level},optibench_core={level},\
         optibench_logic={level},optibench_report={level}"
    );
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    // A subscriber may already be installed when embedded
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Process-wide token tripped by Ctrl-C
fn interrupt_token() -> CancelToken {
    static INTERRUPT: OnceLock<CancelToken> = OnceLock::new();
    INTERRUPT
        .get_or_init(|| {
            let token = CancelToken::new();
            let handler_token = token.clone();
            if let Err(e) = ctrlc::set_handler(move || {
                eprintln!("\nInterrupted: stopping benchmarks and reaping child processes...");
                handler_token.cancel();
            }) {
                tracing::warn!(error = %e, "failed to install interrupt handler");
            }
            token
        })
        .clone()
}

/// Fully layered settings for one invocation
#[derive(Debug, Clone)]
struct Settings {
    exe: String,
    adapter: ToolOutputAdapter,
    flags: String,
    command_template: String,
    jobs: usize,
    kill_grace: Duration,
    extension: String,
    classification: ClassificationConfig,
    format: OutputFormat,
    color: ColorChoice,
    save_baseline: Option<PathBuf>,
    regression: Option<(PathBuf, Baseline)>,
}

fn invalid(option: &'static str) -> impl FnOnce(String) -> HarnessError {
    move |message| HarnessError::InvalidOption { option, message }
}

/// Layer defaults → optibench.toml → CLI flags → baseline header
fn resolve_settings(args: &RunArgs, config: &OptiConfig) -> anyhow::Result<Settings> {
    let adapter: ToolOutputAdapter = args
        .adapter
        .as_deref()
        .unwrap_or(&config.tool.adapter)
        .parse()
        .map_err(invalid("adapter"))?;

    let mut mode: Mode = if args.min {
        Mode::Min
    } else {
        config.tool.mode.parse().map_err(invalid("mode"))?
    };

    let outer_bound: OuterBound = args
        .outer_bound
        .as_deref()
        .unwrap_or(&config.tool.outer_bound)
        .parse()
        .map_err(invalid("outer-bound"))?;

    let format: OutputFormat = args
        .format
        .as_deref()
        .unwrap_or(&config.output.format)
        .parse()
        .map_err(invalid("format"))?;

    let color: ColorChoice = args
        .color
        .as_deref()
        .unwrap_or(&config.output.color)
        .parse()
        .map_err(invalid("color"))?;

    let mut timeout_seconds = match args.timeout {
        Some(secs) => secs,
        None => OptiConfig::parse_timeout_seconds(&config.runner.timeout)
            .context("invalid [runner] timeout")?,
    };
    let kill_grace = Duration::from_nanos(
        OptiConfig::parse_duration(&config.runner.kill_grace)
            .context("invalid [runner] kill_grace")?,
    );

    let mut flags = args
        .flags
        .clone()
        .unwrap_or_else(|| config.tool.flags.clone());
    let mut abs_tol = args.abs_tol.unwrap_or(config.tolerance.abs_tol);
    let mut rel_tol = args.rel_tol.unwrap_or(config.tolerance.rel_tol);

    let regression = match &args.regression {
        Some(path) => {
            let baseline = Baseline::read(path)
                .with_context(|| format!("failed to read baseline {}", path.display()))?;
            // Re-run exactly as recorded
            let header = &baseline.header;
            flags = header.flags.clone();
            timeout_seconds = header.timeout_seconds;
            mode = header.mode;
            abs_tol = header.abs_tol;
            rel_tol = header.rel_tol;
            tracing::info!(
                path = %path.display(),
                benchmarks = baseline.entries.len(),
                "using recorded baseline settings"
            );
            Some((path.clone(), baseline))
        }
        None => None,
    };

    let mut classification = ClassificationConfig {
        mode,
        abs_tol,
        rel_tol,
        timeout_seconds,
        strict_bounds: config.tolerance.strict_bounds && !args.lenient,
        outer_bound,
        regression_baseline: None,
    };
    if let Some((_, baseline)) = &regression {
        classification = classification.with_baseline(baseline.to_map());
    }
    classification.validate().map_err(HarnessError::from)?;

    let save_baseline = args.save_baseline.clone().or_else(|| {
        config
            .output
            .save_baseline
            .then(|| config.default_baseline_path())
    });

    Ok(Settings {
        exe: args.exe.clone().unwrap_or_else(|| config.tool.exe.clone()),
        adapter,
        flags,
        command_template: config.tool.command_template.clone(),
        jobs: args.procs.or(config.runner.jobs).unwrap_or_else(default_jobs).max(1),
        kill_grace,
        extension: args
            .ext
            .clone()
            .unwrap_or_else(|| config.runner.extension.clone()),
        classification,
        format,
        color,
        save_baseline,
        regression,
    })
}

/// Benchmarks come from the baseline rows with `-r`, else from BENCHMARK_DIR
fn plan_benchmarks(args: &RunArgs, settings: &Settings) -> anyhow::Result<ExecutionPlan> {
    let filter = args
        .filter
        .as_deref()
        .map(Regex::new)
        .transpose()
        .map_err(HarnessError::from)?;

    let paths: Vec<PathBuf> = match (&settings.regression, &args.benchmark_dir) {
        (Some((_, baseline)), _) => baseline.paths().map(PathBuf::from).collect(),
        (None, Some(dir)) => discover_benchmarks(dir, &settings.extension)?,
        (None, None) => return Err(HarnessError::MissingBenchmarkDir.into()),
    };

    Ok(build_plan(
        paths,
        filter.as_ref(),
        settings.classification.mode,
    ))
}

fn command_for(settings: &Settings, file: &Path) -> Vec<String> {
    let ctx = CommandContext {
        exe: &settings.exe,
        prefix: settings.adapter.file_prefix(),
        timeout_seconds: settings.classification.timeout_seconds,
        flags: &settings.flags,
        mode: settings.classification.mode,
    };
    render_command(&settings.command_template, &ctx, file)
}

/// Every completion must be tallied, and an uncancelled run must have
/// dispatched every submitted case
fn verify_schedule(summary: &ScheduleSummary, tally: &Tally) -> Result<(), HarnessError> {
    tally.check_consistency(summary.dispatched)?;
    if !summary.cancelled && summary.dispatched != summary.submitted {
        return Err(HarnessError::Incomplete {
            submitted: summary.submitted,
            dispatched: summary.dispatched,
        });
    }
    Ok(())
}

fn list_benchmarks(plan: &ExecutionPlan, settings: &Settings) {
    println!("optibench Plan:");
    for problem in &plan.problems {
        let expected = problem
            .expected
            .map(optibench_report::format_float)
            .unwrap_or_else(|| "unknown".to_string());
        println!("├── {} (expected: {})", problem.key(), expected);
        println!(
            "│   └── {}",
            format_command(&command_for(settings, problem.path()))
        );
    }
    println!("{} benchmarks found.", plan.len());
}

fn progress_bar(len: usize, enabled: bool) -> ProgressBar {
    if !enabled || !std::io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

/// Streamed text for one finished case, `None` for formats rendered at the end
fn stream_line(record: &CaseRecord, format: OutputFormat, style: &Style) -> Option<String> {
    match format {
        OutputFormat::Human => Some(format_case(record, style)),
        OutputFormat::Tsv | OutputFormat::Csv => format
            .delimiter()
            .map(|d| format!("{}\n", format_row(record, d))),
        OutputFormat::Json => None,
    }
}

fn run_settings(settings: &Settings) -> RunSettings {
    let c = &settings.classification;
    RunSettings {
        exe: settings.exe.clone(),
        adapter: settings.adapter.as_str().to_string(),
        flags: settings.flags.clone(),
        mode: c.mode.as_str().to_string(),
        abs_tol: c.abs_tol,
        rel_tol: c.rel_tol,
        timeout_seconds: c.timeout_seconds,
        strict_bounds: c.strict_bounds,
        jobs: settings.jobs,
        baseline: settings
            .regression
            .as_ref()
            .map(|(path, _)| path.display().to_string()),
    }
}

fn run_benchmarks(
    args: &RunArgs,
    plan: ExecutionPlan,
    settings: Settings,
) -> anyhow::Result<RunStatus> {
    if plan.is_empty() {
        println!("No benchmarks found.");
        return Ok(RunStatus::Healthy);
    }

    let format = settings.format;
    let style = match format {
        OutputFormat::Human => Style::for_stdout(settings.color),
        _ => Style::plain(),
    };

    tracing::info!(
        benchmarks = plan.len(),
        jobs = settings.jobs,
        exe = %settings.exe,
        mode = %settings.classification.mode,
        "running benchmarks"
    );

    let execution: Arc<dyn Execution> = Arc::new(ProcessExecution::new(settings.kill_grace));
    let classification = Arc::new(settings.classification.clone());
    let cases: Vec<TestCase> = plan
        .problems
        .into_iter()
        .map(|problem| {
            let argv = command_for(&settings, problem.path());
            TestCase::new(
                problem,
                argv,
                execution.clone(),
                settings.adapter,
                classification.clone(),
            )
        })
        .collect();

    let pb = progress_bar(cases.len(), !args.no_progress);
    if let Some(delimiter) = format.delimiter() {
        println!("{}", format_header(delimiter));
    }

    let cancel = interrupt_token();
    let start_time = Instant::now();
    let mut tally = Tally::new();
    let mut records: Vec<CaseRecord> = Vec::with_capacity(cases.len());

    let summary = Scheduler::new(settings.jobs)
        .run_all(cases, &cancel, |record| {
            tally.record(&record.verdict);
            pb.set_message(record.name.clone());
            pb.inc(1);
            if let Some(text) = stream_line(&record, format, &style) {
                pb.suspend(|| print!("{}", text));
            }
            records.push(record);
        })
        .map_err(HarnessError::from)?;
    pb.finish_and_clear();

    let elapsed = start_time.elapsed();
    let partial = summary.cancelled;
    records.sort_by(|a, b| a.path.cmp(&b.path));

    let summary_options = SummaryOptions {
        show_regression: settings.regression.is_some(),
        partial,
        elapsed,
    };
    match format {
        OutputFormat::Human => print!("{}", format_summary(&tally, &summary_options, &style)),
        _ => eprint!("{}", format_summary(&tally, &summary_options, &Style::plain())),
    }

    let report = RunReport {
        meta: build_report_meta(),
        settings: run_settings(&settings),
        partial,
        elapsed_seconds: elapsed.as_secs_f64(),
        results: records,
        summary: tally.counts(),
    };
    if format == OutputFormat::Json {
        println!("{}", generate_json_report(&report)?);
    }
    if let Some(path) = &args.output {
        write_report_file(path, &report, &tally, &summary_options, format)?;
    }

    verify_schedule(&summary, &tally)?;

    if let Some(path) = &settings.save_baseline {
        if partial {
            tracing::warn!(
                path = %path.display(),
                "run was cancelled; baseline not written"
            );
        } else {
            let header = BaselineHeader {
                flags: settings.flags.clone(),
                timeout_seconds: settings.classification.timeout_seconds,
                mode: settings.classification.mode,
                abs_tol: settings.classification.abs_tol,
                rel_tol: settings.classification.rel_tol,
            };
            Baseline::from_records(header, &report.results)
                .write(path)
                .with_context(|| format!("failed to write baseline {}", path.display()))?;
            tracing::info!(path = %path.display(), "baseline saved");
        }
    }

    if partial {
        return Ok(RunStatus::Cancelled);
    }
    Ok(match RunHealth::evaluate(&tally) {
        RunHealth::Healthy => RunStatus::Healthy,
        RunHealth::Unhealthy { failures } => {
            eprintln!("\n{} benchmark(s) failed", failures);
            RunStatus::Unhealthy { failures }
        }
    })
}

/// Write the complete final report in `format` to `path`
fn write_report_file(
    path: &Path,
    report: &RunReport,
    tally: &Tally,
    options: &SummaryOptions,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let plain = Style::plain();
    let output = match format {
        OutputFormat::Json => generate_json_report(report)?,
        OutputFormat::Human => {
            let mut output = String::new();
            for record in &report.results {
                output.push_str(&format_case(record, &plain));
            }
            output.push_str(&format_summary(tally, options, &plain));
            output
        }
        OutputFormat::Tsv | OutputFormat::Csv => {
            let mut output = String::new();
            if let Some(delimiter) = format.delimiter() {
                output.push_str(&format_header(delimiter));
                output.push('\n');
                for record in &report.results {
                    output.push_str(&format_row(record, delimiter));
                    output.push('\n');
                }
            }
            output
        }
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, output)
        .with_context(|| format!("failed to write report {}", path.display()))?;
    tracing::info!(path = %path.display(), "report written");
    Ok(())
}
