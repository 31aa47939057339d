//! Human-readable per-case blocks for terminal output.

use crate::record::{CaseRecord, format_value};
use crate::style::Style;
use optibench_core::ParsedBound;
use optibench_logic::FloatDiff;

fn format_bound(bound: &ParsedBound) -> String {
    if !bound.is_present() {
        return "none".to_string();
    }
    if bound.lower.is_some() && bound.lower == bound.upper {
        return format_value(bound.lower);
    }
    format!(
        "[{}, {}]",
        format_value(bound.lower),
        format_value(bound.upper)
    )
}

fn format_diff(diff: &FloatDiff) -> String {
    format!("abs {:+.6e}  rel {:+.6e}", diff.abs_diff, diff.rel_diff)
}

/// One block per finished case
pub fn format_case(record: &CaseRecord, style: &Style) -> String {
    let v = &record.verdict;
    let mut output = String::new();

    output.push_str(&format!(
        "{}  {}  {}  {}  {}\n",
        style.bold(&record.name),
        style.main(v.main),
        style.strict(v.strict),
        style.width(v.width),
        style.regression(v.regression),
    ));
    output.push_str(&format!("    command:  {}\n", record.command));
    output.push_str(&format!(
        "    expected: {}\n",
        record
            .expected
            .map(|e| format_value(Some(e)))
            .unwrap_or_else(|| "unknown".to_string())
    ));
    output.push_str(&format!("    result:   {}\n", format_bound(&record.result)));

    if let Some(diff) = &v.expected_diff {
        output.push_str(&format!("    diff:     {}\n", format_diff(diff)));
    }
    if let Some(diff) = &v.width_diff {
        output.push_str(&format!("    width:    {}\n", format_diff(diff)));
    }
    if let Some(diff) = &v.baseline_diff {
        output.push_str(&format!("    baseline: {}\n", format_diff(diff)));
    }
    if let Some(code) = record.exit_code.filter(|c| *c != 0) {
        output.push_str(&format!("    exit:     {}\n", code));
    }
    if let Some(note) = &record.note {
        output.push_str(&format!("    note:     {}\n", note));
    }
    output.push_str(&format!("    elapsed:  {:.3}s\n", record.elapsed_seconds));
    output
}
