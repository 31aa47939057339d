//! JSON Output

use crate::record::CaseRecord;
use crate::tally::TallyCounts;
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const SCHEMA_VERSION: u32 = 1;

/// Complete machine-readable report of one run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub meta: ReportMeta,
    pub settings: RunSettings,
    /// The run was cancelled before every case finished
    pub partial: bool,
    pub elapsed_seconds: f64,
    pub results: Vec<CaseRecord>,
    pub summary: TallyCounts,
}

/// Report metadata
#[derive(Debug, Clone, Serialize)]
pub struct ReportMeta {
    pub schema_version: u32,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub git_commit: Option<String>,
    pub git_branch: Option<String>,
    pub system: SystemInfo,
}

/// Host the run executed on
#[derive(Debug, Clone, Serialize)]
pub struct SystemInfo {
    pub os: String,
    pub arch: String,
    pub cpu: String,
    pub cpu_cores: u32,
}

/// Settings the run was made with
#[derive(Debug, Clone, Serialize)]
pub struct RunSettings {
    pub exe: String,
    pub adapter: String,
    pub flags: String,
    pub mode: String,
    pub abs_tol: f64,
    pub rel_tol: f64,
    pub timeout_seconds: u64,
    pub strict_bounds: bool,
    pub jobs: usize,
    pub baseline: Option<String>,
}

/// Generate a prettified JSON report.
pub fn generate_json_report(report: &RunReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}
