//! optibench Report - Tally, Baselines and Output Formats
//!
//! Aggregates verdicts and renders them:
//! - Human-readable per-case blocks and summary (terminal)
//! - TSV / CSV rows (spreadsheets, diffing runs)
//! - JSON with run metadata (machine-readable)
//! - Regression baseline files read by `-r` and written by `-o`

mod baseline;
mod delimited;
mod human;
mod json;
mod record;
mod style;
mod summary;
mod tally;

pub use baseline::{Baseline, BaselineEntry, BaselineError, BaselineHeader};
pub use delimited::{Delimiter, format_header, format_row};
pub use human::format_case;
pub use json::{
    ReportMeta, RunReport, RunSettings, SCHEMA_VERSION, SystemInfo, generate_json_report,
};
pub use record::{CaseRecord, format_float, format_value};
pub use style::{ColorChoice, Style};
pub use summary::{RunHealth, SummaryOptions, format_summary};
pub use tally::{AxisCounts, ConsistencyError, Tally, TallyCounts};

/// Output format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable terminal output
    #[default]
    Human,
    /// Tab-separated rows
    Tsv,
    /// Comma-separated rows
    Csv,
    /// JSON with full metadata
    Json,
}

impl OutputFormat {
    /// Delimiter for row-oriented formats
    pub fn delimiter(self) -> Option<Delimiter> {
        match self {
            OutputFormat::Tsv => Some(Delimiter::Tab),
            OutputFormat::Csv => Some(Delimiter::Comma),
            OutputFormat::Human | OutputFormat::Json => None,
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" | "text" => Ok(OutputFormat::Human),
            "tsv" => Ok(OutputFormat::Tsv),
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}
