//! Regression Baseline Files
//!
//! A baseline records the settings and per-benchmark result of one run so a
//! later run can be compared against it:
//!
//! ```text
//! flags: --seed 0
//! timeout: 60
//! mode: MAX
//! abs_tol: 1e-12
//! rel_tol: 0.01
//!
//! File	AnswerLow	AnswerHigh	Elapsed
//! benchmarks/a.dop	1.5	1.5000001	0.25
//! benchmarks/b.dop	None	None	60.01
//! ```
//!
//! `None` marks a missing value. Columns are tab separated.

use crate::record::{CaseRecord, format_float, format_value};
use optibench_core::{Mode, ParsedBound};
use optibench_logic::RegressionBaseline;
use std::path::{Path, PathBuf};
use thiserror::Error;

const TABLE_HEADER: &str = "File\tAnswerLow\tAnswerHigh\tElapsed";

#[derive(Debug, Error)]
pub enum BaselineError {
    #[error("Failed to read baseline {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write baseline {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Baseline line {line}: {message}")]
    Malformed { line: usize, message: String },

    #[error("Baseline is missing the '{0}' header")]
    MissingHeader(&'static str),
}

/// Settings the baseline run was made with
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineHeader {
    pub flags: String,
    pub timeout_seconds: u64,
    pub mode: Mode,
    pub abs_tol: f64,
    pub rel_tol: f64,
}

/// One recorded benchmark result
#[derive(Debug, Clone, PartialEq)]
pub struct BaselineEntry {
    pub path: String,
    pub bound: ParsedBound,
    pub elapsed_seconds: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Baseline {
    pub header: BaselineHeader,
    pub entries: Vec<BaselineEntry>,
}

impl Baseline {
    /// Baseline for the records of a finished run, sorted by path
    pub fn from_records(header: BaselineHeader, records: &[CaseRecord]) -> Self {
        let mut entries: Vec<BaselineEntry> = records
            .iter()
            .map(|r| BaselineEntry {
                path: r.path.clone(),
                bound: r.result,
                elapsed_seconds: Some(r.elapsed_seconds),
            })
            .collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Self { header, entries }
    }

    /// Path → prior bound lookup used by the classifier
    pub fn to_map(&self) -> RegressionBaseline {
        self.entries
            .iter()
            .map(|e| (e.path.clone(), e.bound))
            .collect()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.path.as_str())
    }

    pub fn parse(text: &str) -> Result<Self, BaselineError> {
        let mut lines = text.lines().enumerate().map(|(i, l)| (i + 1, l));

        let mut flags = None;
        let mut timeout = None;
        let mut mode = None;
        let mut abs_tol = None;
        let mut rel_tol = None;

        for (line, raw) in lines.by_ref() {
            if raw.trim().is_empty() {
                break;
            }
            let Some((key, value)) = raw.split_once(':') else {
                return Err(malformed(line, format!("expected 'key: value', got '{raw}'")));
            };
            let value = value.trim();
            match key.trim() {
                "flags" => flags = Some(value.to_string()),
                "timeout" => timeout = Some(parse_timeout(value, line)?),
                "mode" => {
                    mode = Some(value.parse::<Mode>().map_err(|e| malformed(line, e))?);
                }
                "abs_tol" => abs_tol = Some(parse_float(value, line)?),
                "rel_tol" => rel_tol = Some(parse_float(value, line)?),
                other => tracing::warn!(key = other, line, "ignoring unknown baseline header"),
            }
        }

        let header = BaselineHeader {
            flags: flags.ok_or(BaselineError::MissingHeader("flags"))?,
            timeout_seconds: timeout.ok_or(BaselineError::MissingHeader("timeout"))?,
            mode: mode.ok_or(BaselineError::MissingHeader("mode"))?,
            abs_tol: abs_tol.ok_or(BaselineError::MissingHeader("abs_tol"))?,
            rel_tol: rel_tol.ok_or(BaselineError::MissingHeader("rel_tol"))?,
        };

        let mut entries = Vec::new();
        let mut seen_table_header = false;
        for (line, raw) in lines {
            if raw.trim().is_empty() {
                continue;
            }
            if !seen_table_header {
                if !raw.starts_with("File\t") {
                    return Err(malformed(line, format!("expected table header, got '{raw}'")));
                }
                seen_table_header = true;
                continue;
            }

            let fields: Vec<&str> = raw.split('\t').collect();
            if fields.len() < 3 {
                return Err(malformed(
                    line,
                    format!("expected at least 3 tab-separated fields, got {}", fields.len()),
                ));
            }
            entries.push(BaselineEntry {
                path: fields[0].to_string(),
                bound: ParsedBound::new(
                    parse_optional(fields[1], line)?,
                    parse_optional(fields[2], line)?,
                ),
                elapsed_seconds: match fields.get(3) {
                    Some(raw) => parse_optional(raw, line)?,
                    None => None,
                },
            });
        }

        Ok(Self { header, entries })
    }

    pub fn render(&self) -> String {
        let h = &self.header;
        let mut output = String::new();
        output.push_str(&format!("flags: {}\n", h.flags));
        output.push_str(&format!("timeout: {}\n", h.timeout_seconds));
        output.push_str(&format!("mode: {}\n", h.mode));
        output.push_str(&format!("abs_tol: {}\n", format_float(h.abs_tol)));
        output.push_str(&format!("rel_tol: {}\n", format_float(h.rel_tol)));
        output.push('\n');
        output.push_str(TABLE_HEADER);
        output.push('\n');
        for entry in &self.entries {
            output.push_str(&format!(
                "{}\t{}\t{}\t{}\n",
                entry.path,
                format_value(entry.bound.lower),
                format_value(entry.bound.upper),
                format_value(entry.elapsed_seconds),
            ));
        }
        output
    }

    pub fn read(path: &Path) -> Result<Self, BaselineError> {
        let text = std::fs::read_to_string(path).map_err(|source| BaselineError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn write(&self, path: &Path) -> Result<(), BaselineError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| BaselineError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, self.render()).map_err(|source| BaselineError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn malformed(line: usize, message: impl Into<String>) -> BaselineError {
    BaselineError::Malformed {
        line,
        message: message.into(),
    }
}

fn parse_float(raw: &str, line: usize) -> Result<f64, BaselineError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| malformed(line, format!("invalid number '{raw}'")))
}

fn parse_optional(raw: &str, line: usize) -> Result<Option<f64>, BaselineError> {
    match raw.trim() {
        "None" | "" => Ok(None),
        other => parse_float(other, line).map(Some),
    }
}

/// Whole seconds; older files may carry a fractional value
fn parse_timeout(raw: &str, line: usize) -> Result<u64, BaselineError> {
    if let Ok(secs) = raw.parse::<u64>() {
        return Ok(secs);
    }
    let secs = parse_float(raw, line)?;
    if secs.is_finite() && secs >= 0.0 {
        Ok(secs.ceil() as u64)
    } else {
        Err(malformed(line, format!("invalid timeout '{raw}'")))
    }
}
