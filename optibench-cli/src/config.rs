//! Configuration loading from optibench.toml
//!
//! optibench configuration can be specified in an `optibench.toml` file in the
//! benchmark repository. The configuration is automatically discovered by
//! walking up from the current directory. CLI flags override file values.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the discovered configuration file
pub const CONFIG_FILE_NAME: &str = "optibench.toml";

/// optibench configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OptiConfig {
    /// Runner configuration
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Solver under test
    #[serde(default)]
    pub tool: ToolConfig,
    /// Tolerance and soundness policy
    #[serde(default)]
    pub tolerance: ToleranceConfig,
    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
}

/// Runner configuration for benchmark execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Number of benchmarks run concurrently (default: half the cores)
    #[serde(default)]
    pub jobs: Option<usize>,
    /// Time budget for a single benchmark (e.g., "60s", "5m"); "0s" disables it
    #[serde(default = "default_timeout")]
    pub timeout: String,
    /// Grace period past the budget before SIGTERM, and again before SIGKILL
    #[serde(default = "default_kill_grace")]
    pub kill_grace: String,
    /// Benchmark file extension
    #[serde(default = "default_extension")]
    pub extension: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            jobs: None,
            timeout: default_timeout(),
            kill_grace: default_kill_grace(),
            extension: default_extension(),
        }
    }
}

fn default_timeout() -> String {
    "60s".to_string()
}
fn default_kill_grace() -> String {
    "5s".to_string()
}
fn default_extension() -> String {
    ".dop".to_string()
}

/// Solver under test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Solver executable
    #[serde(default = "default_exe")]
    pub exe: String,
    /// Output adapter: "labeled", "bracket" or "list"
    #[serde(default = "default_adapter")]
    pub adapter: String,
    /// Extra flags appended to every command
    #[serde(default)]
    pub flags: String,
    /// Command template; placeholders {exe} {prefix} {file} {timeout} {flags} {mode}
    #[serde(default = "default_command_template")]
    pub command_template: String,
    /// Optimization mode: "max" or "min"
    #[serde(default = "default_mode")]
    pub mode: String,
    /// Bound that must never cross the optimum: "auto", "lower" or "upper"
    #[serde(default = "default_outer_bound")]
    pub outer_bound: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            exe: default_exe(),
            adapter: default_adapter(),
            flags: String::new(),
            command_template: default_command_template(),
            mode: default_mode(),
            outer_bound: default_outer_bound(),
        }
    }
}

fn default_exe() -> String {
    "gelpia".to_string()
}
fn default_adapter() -> String {
    "labeled".to_string()
}
/// Default command line shape
pub fn default_command_template() -> String {
    "{exe} {prefix}{file} -t {timeout} {flags}".to_string()
}
fn default_mode() -> String {
    "max".to_string()
}
fn default_outer_bound() -> String {
    "auto".to_string()
}

/// Tolerance and soundness policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToleranceConfig {
    /// Absolute tolerance
    #[serde(default = "default_abs_tol")]
    pub abs_tol: f64,
    /// Relative tolerance
    #[serde(default = "default_rel_tol")]
    pub rel_tol: f64,
    /// Report an outer bound crossing the optimum as BROKEN
    #[serde(default = "default_strict_bounds")]
    pub strict_bounds: bool,
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            abs_tol: default_abs_tol(),
            rel_tol: default_rel_tol(),
            strict_bounds: default_strict_bounds(),
        }
    }
}

fn default_abs_tol() -> f64 {
    1e-12
}
fn default_rel_tol() -> f64 {
    0.01
}
fn default_strict_bounds() -> bool {
    true
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default output format: "human", "tsv", "csv", "json"
    #[serde(default = "default_format")]
    pub format: String,
    /// Output directory for saved baselines
    #[serde(default = "default_output_dir")]
    pub directory: String,
    /// Save a regression baseline after each complete run
    #[serde(default)]
    pub save_baseline: bool,
    /// Baseline file path
    #[serde(default)]
    pub baseline_path: Option<String>,
    /// Colorize terminal output: "auto", "always", "never"
    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            directory: default_output_dir(),
            save_baseline: false,
            baseline_path: None,
            color: default_color(),
        }
    }
}

fn default_format() -> String {
    "human".to_string()
}
fn default_output_dir() -> String {
    "target/optibench".to_string()
}
fn default_color() -> String {
    "auto".to_string()
}

impl OptiConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Try to discover and load configuration by walking up from current directory
    pub fn discover() -> Option<Self> {
        let mut dir = std::env::current_dir().ok()?;
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return match Self::load(&config_path) {
                    Ok(config) => {
                        tracing::debug!(path = %config_path.display(), "loaded configuration");
                        Some(config)
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %config_path.display(),
                            error = %e,
                            "ignoring unreadable configuration"
                        );
                        None
                    }
                };
            }
            if !dir.pop() {
                break;
            }
        }
        None
    }

    /// Default baseline location when saving is enabled without a path
    pub fn default_baseline_path(&self) -> std::path::PathBuf {
        match &self.output.baseline_path {
            Some(path) => std::path::PathBuf::from(path),
            None => Path::new(&self.output.directory).join("baseline.tsv"),
        }
    }

    /// Generate a default configuration as TOML string
    pub fn default_toml() -> String {
        r#"# optibench Configuration

[runner]
# Concurrent benchmarks (uncomment to override half the available cores)
# jobs = 4
# Time budget for a single benchmark; "0s" disables it
timeout = "60s"
# Grace past the budget before SIGTERM, and again before SIGKILL
kill_grace = "5s"
# Benchmark file extension
extension = ".dop"

[tool]
# Solver executable
exe = "gelpia"
# Output adapter: "labeled", "bracket" or "list"
adapter = "labeled"
# Extra flags appended to every command
flags = ""
# Placeholders: {exe} {prefix} {file} {timeout} {flags} {mode}
command_template = "{exe} {prefix}{file} -t {timeout} {flags}"
# Optimization mode: "max" or "min"
mode = "max"
# Bound that must never cross the optimum: "auto", "lower" or "upper"
outer_bound = "auto"

[tolerance]
abs_tol = 1e-12
rel_tol = 0.01
# Report a crossed outer bound as BROKEN instead of BAD_CLOSE/BAD_FAR
strict_bounds = true

[output]
# Default output format: human, tsv, csv, json
format = "human"
# Output directory for saved baselines
directory = "target/optibench"
# Save a regression baseline after each complete run
save_baseline = false
# Baseline file (uncomment to enable)
# baseline_path = "baseline.tsv"
# Colorize terminal output: auto, always, never
color = "auto"
"#
        .to_string()
    }

    /// Parse duration string (e.g., "3s", "500ms", "2m") to nanoseconds
    pub fn parse_duration(s: &str) -> anyhow::Result<u64> {
        let s = s.trim();
        if s.is_empty() {
            return Err(anyhow::anyhow!("Empty duration string"));
        }

        // Find where the number ends and unit begins
        let (num_part, unit_part) = s
            .char_indices()
            .find(|(_, c)| c.is_alphabetic())
            .map(|(i, _)| s.split_at(i))
            .unwrap_or((s, "s"));

        let value: f64 = num_part
            .trim()
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid duration number: {}", num_part))?;
        if !value.is_finite() || value < 0.0 {
            return Err(anyhow::anyhow!("Duration must be non-negative: {}", s));
        }

        let multiplier: u64 = match unit_part.to_lowercase().as_str() {
            "ns" => 1,
            "us" | "µs" => 1_000,
            "ms" => 1_000_000,
            "s" | "" => 1_000_000_000,
            "m" | "min" => 60_000_000_000,
            _ => return Err(anyhow::anyhow!("Unknown duration unit: {}", unit_part)),
        };

        Ok((value * multiplier as f64) as u64)
    }

    /// Whole-second budget for a duration string, rounding up
    pub fn parse_timeout_seconds(s: &str) -> anyhow::Result<u64> {
        Ok(Self::parse_duration(s)?.div_ceil(1_000_000_000))
    }
}
