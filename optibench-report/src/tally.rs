//! Tally
//!
//! Per-axis category counts for a run. A `Tally` is a plain value with no
//! interior synchronization: the scheduler funnels every completion through a
//! single consumer, which is the only writer.

use optibench_logic::{AxisState, MainState, RegressionState, StrictState, Verdict, WidthState};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Dispatched and tallied counts disagree at the end of a run
#[derive(Debug, Error, PartialEq, Eq)]
#[error(
    "Consistency error: {dispatched} test case(s) dispatched but {tallied} tallied; \
     results are incomplete and must not be used for regression comparison"
)]
pub struct ConsistencyError {
    pub dispatched: usize,
    pub tallied: usize,
}

/// Counts for one verdict axis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisCounts<S: AxisState> {
    counts: BTreeMap<S, usize>,
}

impl<S: AxisState> Default for AxisCounts<S> {
    fn default() -> Self {
        Self {
            counts: BTreeMap::new(),
        }
    }
}

impl<S: AxisState> AxisCounts<S> {
    fn add(&mut self, state: S) {
        *self.counts.entry(state).or_insert(0) += 1;
    }

    pub fn get(&self, state: S) -> usize {
        self.counts.get(&state).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    /// Non-zero counts in report order
    pub fn nonzero(&self) -> impl Iterator<Item = (S, usize)> + '_ {
        S::ALL
            .iter()
            .map(|s| (*s, self.get(*s)))
            .filter(|(_, n)| *n > 0)
    }

    /// Total count of states that fail the run
    pub fn failures(&self) -> usize {
        self.counts
            .iter()
            .filter(|(s, _)| s.is_failure())
            .map(|(_, n)| n)
            .sum()
    }

    fn to_labels(&self) -> BTreeMap<&'static str, usize> {
        self.nonzero().map(|(s, n)| (s.as_str(), n)).collect()
    }
}

/// Category counts across all four axes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    pub main: AxisCounts<MainState>,
    pub strict: AxisCounts<StrictState>,
    pub width: AxisCounts<WidthState>,
    pub regression: AxisCounts<RegressionState>,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one verdict on every axis
    pub fn record(&mut self, verdict: &Verdict) {
        self.main.add(verdict.main);
        self.strict.add(verdict.strict);
        self.width.add(verdict.width);
        self.regression.add(verdict.regression);
    }

    /// Number of verdicts recorded
    pub fn total(&self) -> usize {
        self.main.total()
    }

    /// Fail loudly when the tally does not account for every dispatched case
    pub fn check_consistency(&self, dispatched: usize) -> Result<(), ConsistencyError> {
        let tallied = self.total();
        if tallied == dispatched {
            Ok(())
        } else {
            Err(ConsistencyError {
                dispatched,
                tallied,
            })
        }
    }

    /// Count of failing states across all axes
    pub fn failures(&self) -> usize {
        self.main.failures() + self.strict.failures() + self.regression.failures()
    }

    /// Serializable label → count view
    pub fn counts(&self) -> TallyCounts {
        TallyCounts {
            main: self.main.to_labels(),
            strict: self.strict.to_labels(),
            width: self.width.to_labels(),
            regression: self.regression.to_labels(),
            total: self.total(),
        }
    }
}

/// Label → count snapshot of a [`Tally`] for machine-readable reports
#[derive(Debug, Clone, Serialize)]
pub struct TallyCounts {
    pub main: BTreeMap<&'static str, usize>,
    pub strict: BTreeMap<&'static str, usize>,
    pub width: BTreeMap<&'static str, usize>,
    pub regression: BTreeMap<&'static str, usize>,
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ran(strict: StrictState, width: WidthState) -> Verdict {
        Verdict {
            strict,
            width,
            ..Verdict::terminal(MainState::Ran)
        }
    }

    #[test]
    fn test_records_every_axis() {
        let mut tally = Tally::new();
        tally.record(&ran(StrictState::Exact, WidthState::Point));
        tally.record(&ran(StrictState::Close, WidthState::Narrow));
        tally.record(&Verdict::terminal(MainState::Crash));

        assert_eq!(tally.total(), 3);
        assert_eq!(tally.main.get(MainState::Ran), 2);
        assert_eq!(tally.main.get(MainState::Crash), 1);
        assert_eq!(tally.strict.get(StrictState::NotApplicable), 1);
        assert_eq!(tally.width.total(), 3);
        assert_eq!(tally.failures(), 1);
    }

    #[test]
    fn test_nonzero_follows_report_order() {
        let mut tally = Tally::new();
        tally.record(&Verdict::terminal(MainState::Ran));
        tally.record(&Verdict::terminal(MainState::Crash));
        tally.record(&Verdict::terminal(MainState::Crash));
        let order: Vec<_> = tally.main.nonzero().collect();
        assert_eq!(order, vec![(MainState::Crash, 2), (MainState::Ran, 1)]);
    }

    #[test]
    fn test_consistency_check() {
        let mut tally = Tally::new();
        tally.record(&Verdict::terminal(MainState::Failed));
        assert!(tally.check_consistency(1).is_ok());
        let err = tally.check_consistency(2).unwrap_err();
        assert_eq!(
            err,
            ConsistencyError {
                dispatched: 2,
                tallied: 1
            }
        );
        assert!(err.to_string().contains("2 test case(s) dispatched but 1 tallied"));
    }

    #[test]
    fn test_counts_snapshot_uses_labels() {
        let mut tally = Tally::new();
        tally.record(&Verdict::terminal(MainState::Timeout));
        let counts = tally.counts();
        assert_eq!(counts.main.get("TIMEOUT"), Some(&1));
        assert_eq!(counts.regression.get("NOT_APPLICABLE"), Some(&1));
        assert_eq!(counts.total, 1);
    }
}
