//! Run Metadata Collection
//!
//! Collects the facts embedded in a JSON report so two runs can be compared
//! later: harness version, git state of the working directory and host.
//!
//! Linux-only data (CPU model) degrades to "Unknown" elsewhere.

use chrono::Utc;
use optibench_report::{ReportMeta, SCHEMA_VERSION, SystemInfo};
use std::process::Command;

/// Build report metadata including system info and git details
pub fn build_report_meta() -> ReportMeta {
    let git_commit = git(&["rev-parse", "HEAD"]);
    let git_branch = git(&["rev-parse", "--abbrev-ref", "HEAD"]);

    let system = SystemInfo {
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        cpu: get_cpu_model().unwrap_or_else(|| "Unknown".to_string()),
        cpu_cores: num_cpus(),
    };

    ReportMeta {
        schema_version: SCHEMA_VERSION,
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
        git_commit,
        git_branch,
        system,
    }
}

/// Trimmed stdout of a successful git invocation
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8(output.stdout).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Get CPU model name from /proc/cpuinfo (Linux only)
fn get_cpu_model() -> Option<String> {
    #[cfg(target_os = "linux")]
    {
        std::fs::read_to_string("/proc/cpuinfo")
            .ok()
            .and_then(|content| {
                content
                    .lines()
                    .find(|l| l.starts_with("model name"))
                    .and_then(|l| l.split(':').nth(1))
                    .map(|s| s.trim().to_string())
            })
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

/// Number of available CPU cores
pub fn num_cpus() -> u32 {
    std::thread::available_parallelism()
        .map(|n| n.get() as u32)
        .unwrap_or(1)
}

/// Default concurrency: half the available cores, at least one
pub fn default_jobs() -> usize {
    (num_cpus() as usize / 2).max(1)
}
