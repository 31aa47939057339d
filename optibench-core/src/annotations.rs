//! Benchmark Annotations
//!
//! Benchmark files carry their known optimum in comment directives:
//!
//! ```text
//! # minimum: -1.0
//! # maximum: 3.25
//! # answer: ?
//! ```
//!
//! The directive for the active mode wins; `answer:` is the fallback for files
//! that state a single target. `?` (or no directive at all) means the optimum
//! is unknown and the benchmark is only checked for running cleanly.

use crate::model::Mode;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

/// Token that marks a directive's value as unknown
pub const UNKNOWN_SENTINEL: &str = "?";

#[derive(Debug, Error)]
pub enum AnnotationError {
    #[error("Failed to read benchmark {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid '{directive}' value '{value}'")]
    InvalidValue { directive: &'static str, value: String },
}

fn directive_regex(slot: &'static OnceLock<Regex>, directive: &str) -> &'static Regex {
    // Safety: the pattern is built from a fixed directive name and always compiles
    slot.get_or_init(|| {
        Regex::new(&format!(r"#[ \t]*{}:[ \t]*([^ \t\r\n]+)", directive)).unwrap()
    })
}

fn find_directive<'a>(
    text: &'a str,
    directive: &'static str,
    slot: &'static OnceLock<Regex>,
) -> Option<&'a str> {
    directive_regex(slot, directive)
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

fn parse_value(directive: &'static str, raw: &str) -> Result<Option<f64>, AnnotationError> {
    if raw == UNKNOWN_SENTINEL {
        return Ok(None);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_nan() => Ok(None),
        Ok(v) => Ok(Some(v)),
        Err(_) => Err(AnnotationError::InvalidValue {
            directive,
            value: raw.to_string(),
        }),
    }
}

/// Extract the expected optimum for `mode` from benchmark text.
///
/// Returns `Ok(None)` when the value is unknown.
pub fn resolve_expected(text: &str, mode: Mode) -> Result<Option<f64>, AnnotationError> {
    static MINIMUM: OnceLock<Regex> = OnceLock::new();
    static MAXIMUM: OnceLock<Regex> = OnceLock::new();
    static ANSWER: OnceLock<Regex> = OnceLock::new();

    let primary = match mode {
        Mode::Min => find_directive(text, "minimum", &MINIMUM).map(|v| ("minimum", v)),
        Mode::Max => find_directive(text, "maximum", &MAXIMUM).map(|v| ("maximum", v)),
    };

    match primary.or_else(|| find_directive(text, "answer", &ANSWER).map(|v| ("answer", v))) {
        Some((directive, raw)) => parse_value(directive, raw),
        None => Ok(None),
    }
}

/// Read a benchmark file and extract its expected optimum for `mode`
pub fn resolve_expected_file(path: &Path, mode: Mode) -> Result<Option<f64>, AnnotationError> {
    let text = std::fs::read_to_string(path).map_err(|source| AnnotationError::Read {
        path: path.display().to_string(),
        source,
    })?;
    resolve_expected(&text, mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BENCH: &str = "\
# Rosenbrock in two variables
# minimum: 0
# maximum: 3.6e3
x = [-2, 2];
y = [-1, 3];
";

    #[test]
    fn test_mode_selects_directive() {
        assert_eq!(resolve_expected(BENCH, Mode::Min).unwrap(), Some(0.0));
        assert_eq!(resolve_expected(BENCH, Mode::Max).unwrap(), Some(3600.0));
    }

    #[test]
    fn test_directive_value_borrows_from_text() {
        static SLOT: OnceLock<Regex> = OnceLock::new();
        let text = String::from("# maximum:  12.5e1 \n");
        let raw = find_directive(&text, "maximum", &SLOT);
        assert_eq!(raw.map(str::trim), Some("12.5e1"));
        assert_eq!(find_directive("x = 1;", "maximum", &SLOT), None);
    }

    #[test]
    fn test_unknown_sentinel() {
        let text = "#minimum: ?\n#maximum:\t?\n";
        assert_eq!(resolve_expected(text, Mode::Min).unwrap(), None);
        assert_eq!(resolve_expected(text, Mode::Max).unwrap(), None);
    }

    #[test]
    fn test_missing_directive_is_unknown() {
        assert_eq!(resolve_expected("x = [0, 1];", Mode::Max).unwrap(), None);
    }

    #[test]
    fn test_answer_fallback() {
        let text = "# answer: -2.5\n";
        assert_eq!(resolve_expected(text, Mode::Min).unwrap(), Some(-2.5));
        let text = "# maximum: 4\n# answer: 1\n";
        assert_eq!(resolve_expected(text, Mode::Max).unwrap(), Some(4.0));
    }

    #[test]
    fn test_infinite_values() {
        let text = "# minimum: -inf\n# maximum: inf\n";
        assert_eq!(
            resolve_expected(text, Mode::Min).unwrap(),
            Some(f64::NEG_INFINITY)
        );
        assert_eq!(resolve_expected(text, Mode::Max).unwrap(), Some(f64::INFINITY));
    }

    #[test]
    fn test_malformed_value_is_error() {
        let err = resolve_expected("# maximum: twelve\n", Mode::Max).unwrap_err();
        assert!(matches!(err, AnnotationError::InvalidValue { directive: "maximum", .. }));
    }

    #[test]
    fn test_resolve_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bench.dop");
        std::fs::write(&path, BENCH).unwrap();
        assert_eq!(resolve_expected_file(&path, Mode::Min).unwrap(), Some(0.0));

        let missing = dir.path().join("missing.dop");
        assert!(matches!(
            resolve_expected_file(&missing, Mode::Min),
            Err(AnnotationError::Read { .. })
        ));
    }
}
