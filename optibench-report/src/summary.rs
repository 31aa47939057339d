//! Run Summary and Health
//!
//! The summary lists non-zero counts per axis followed by the grand total.
//! The regression axis is only shown when the run compared against a
//! baseline. A cancelled run is labeled `PARTIAL`.

use crate::style::Style;
use crate::tally::{AxisCounts, Tally};
use optibench_logic::AxisState;
use std::time::Duration;

const LABEL_WIDTH: usize = 16;

/// Aggregate health of a finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunHealth {
    Healthy,
    /// At least one CRASH, FAILED, BROKEN or FAR_WORSE
    Unhealthy { failures: usize },
}

impl RunHealth {
    pub fn evaluate(tally: &Tally) -> Self {
        match tally.failures() {
            0 => RunHealth::Healthy,
            failures => RunHealth::Unhealthy { failures },
        }
    }

    pub fn is_healthy(self) -> bool {
        self == RunHealth::Healthy
    }
}

/// Options controlling the summary block
#[derive(Debug, Clone, Copy)]
pub struct SummaryOptions {
    pub show_regression: bool,
    pub partial: bool,
    pub elapsed: Duration,
}

fn push_axis<S: AxisState>(output: &mut String, counts: &AxisCounts<S>, style: &Style) {
    output.push_str(&format!("{}\n", style.bold(S::AXIS)));
    for (state, count) in counts.nonzero() {
        output.push_str(&format!(
            "  {:<width$}{:>6}\n",
            state.as_str(),
            count,
            width = LABEL_WIDTH
        ));
    }
}

pub fn format_summary(tally: &Tally, options: &SummaryOptions, style: &Style) -> String {
    let mut output = String::new();

    output.push('\n');
    if options.partial {
        output.push_str(&style.bold("Summary (PARTIAL: run was cancelled)"));
    } else {
        output.push_str(&style.bold("Summary"));
    }
    output.push('\n');
    output.push_str(&"=".repeat(60));
    output.push('\n');

    push_axis(&mut output, &tally.main, style);
    push_axis(&mut output, &tally.strict, style);
    push_axis(&mut output, &tally.width, style);
    if options.show_regression {
        push_axis(&mut output, &tally.regression, style);
    }

    output.push_str(&"-".repeat(60));
    output.push('\n');
    output.push_str(&format!(
        "{:<width$}{:>6}\n",
        "TOTAL",
        tally.total(),
        width = LABEL_WIDTH + 2
    ));
    output.push_str(&format!(
        "Elapsed: {:.2}s\n",
        options.elapsed.as_secs_f64()
    ));
    output
}
