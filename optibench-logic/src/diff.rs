//! Float Differences
//!
//! Signed absolute and relative differences with the edge cases pinned down:
//! matching infinities compare equal, a zero reference yields an infinite
//! relative difference carrying the sign of the change, and NaN never leaks
//! out.

use serde::{Deserialize, Serialize};

/// Signed difference of `value` against `reference`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FloatDiff {
    /// `value - reference`
    pub abs_diff: f64,
    /// `abs_diff / |reference|`
    pub rel_diff: f64,
}

impl FloatDiff {
    pub const ZERO: FloatDiff = FloatDiff {
        abs_diff: 0.0,
        rel_diff: 0.0,
    };

    pub fn is_zero(&self) -> bool {
        self.abs_diff == 0.0
    }

    /// `|abs_diff| < abs_tol` or `|rel_diff| < rel_tol`
    pub fn within(&self, abs_tol: f64, rel_tol: f64) -> bool {
        self.abs_diff.abs() < abs_tol || self.rel_diff.abs() < rel_tol
    }
}

fn signed_infinity(sign_of: f64) -> f64 {
    if sign_of.is_sign_negative() {
        f64::NEG_INFINITY
    } else {
        f64::INFINITY
    }
}

/// Difference of `value` relative to `reference`
pub fn float_diff(reference: f64, value: f64) -> FloatDiff {
    if reference.is_infinite()
        && value.is_infinite()
        && reference.is_sign_negative() == value.is_sign_negative()
    {
        return FloatDiff::ZERO;
    }

    let abs_diff = value - reference;
    if abs_diff == 0.0 {
        return FloatDiff::ZERO;
    }
    if reference == 0.0 {
        return FloatDiff {
            abs_diff,
            rel_diff: signed_infinity(abs_diff),
        };
    }

    let mut rel_diff = abs_diff / reference.abs();
    if rel_diff.is_nan() {
        // Finite against infinite reference: the change is unbounded
        rel_diff = signed_infinity(abs_diff);
    }
    FloatDiff { abs_diff, rel_diff }
}
