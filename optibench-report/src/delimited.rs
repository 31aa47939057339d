//! TSV/CSV rows, one per finished case, for spreadsheets and diffing runs.

use crate::record::{CaseRecord, format_value};

const COLUMNS: [&str; 13] = [
    "File",
    "MainState",
    "StrictState",
    "WidthState",
    "RegressionState",
    "Expected",
    "AnswerLow",
    "AnswerHigh",
    "AbsDiff",
    "RelDiff",
    "BaselineRelDiff",
    "Elapsed",
    "Command",
];

/// Field separator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Tab,
    Comma,
}

impl Delimiter {
    fn as_char(self) -> char {
        match self {
            Delimiter::Tab => '\t',
            Delimiter::Comma => ',',
        }
    }

    fn escape(self, field: &str) -> String {
        match self {
            Delimiter::Tab => field.replace(['\t', '\n'], " "),
            Delimiter::Comma => {
                if field.contains([',', '"', '\n']) {
                    format!("\"{}\"", field.replace('"', "\"\""))
                } else {
                    field.to_string()
                }
            }
        }
    }

    fn join(self, fields: &[String]) -> String {
        let sep = self.as_char().to_string();
        fields
            .iter()
            .map(|f| self.escape(f))
            .collect::<Vec<_>>()
            .join(&sep)
    }
}

/// Header row, without trailing newline
pub fn format_header(delimiter: Delimiter) -> String {
    let columns: Vec<String> = COLUMNS.iter().map(|c| c.to_string()).collect();
    delimiter.join(&columns)
}

/// Data row for one case, without trailing newline
pub fn format_row(record: &CaseRecord, delimiter: Delimiter) -> String {
    let v = &record.verdict;
    let fields = vec![
        record.path.clone(),
        v.main.to_string(),
        v.strict.to_string(),
        v.width.to_string(),
        v.regression.to_string(),
        format_value(record.expected),
        format_value(record.result.lower),
        format_value(record.result.upper),
        format_value(v.expected_diff.map(|d| d.abs_diff)),
        format_value(v.expected_diff.map(|d| d.rel_diff)),
        format_value(v.baseline_diff.map(|d| d.rel_diff)),
        format!("{:.3}", record.elapsed_seconds),
        record.command.clone(),
    ];
    delimiter.join(&fields)
}
