//! Tool Output Adapters
//!
//! Every solver prints its answer in its own ad hoc text format. An adapter is
//! chosen once at startup from the tool's identity and turns raw output into a
//! [`ParsedBound`] or an explicit [`AdapterError`].
//!
//! | adapter            | output shape                                         | file arg |
//! |--------------------|------------------------------------------------------|----------|
//! | `LabeledBounds`    | `Maximum lower bound 1.0` / `Maximum upper bound 1.5` | `@file`  |
//! | `BracketInterval`  | `min_0 = [1.0, 1.2]` per component                   | `file`   |
//! | `ListLiteral`      | `[[1.0, 1.5], {'x': [0, 1]}]`                        | `@file`  |

use crate::literal::{Literal, LiteralError, parse_literal};
use crate::model::{Mode, ParsedBound};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum AdapterError {
    #[error("No result found in tool output")]
    NoResult,

    #[error("Invalid number '{0}' in tool output")]
    InvalidNumber(String),

    #[error("Malformed result literal: {0}")]
    Literal(#[from] LiteralError),

    #[error("Result literal has unexpected shape: {0}")]
    Shape(String),
}

/// Output parser selected by tool identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ToolOutputAdapter {
    /// `<Maximum|Minimum> <lower|upper> bound <value>` lines
    #[default]
    LabeledBounds,
    /// `min_<n> = [lo, hi]` component intervals whose lower ends sum to a point answer
    BracketInterval,
    /// A list literal whose first element is the `[lo, hi]` answer
    ListLiteral,
}

impl ToolOutputAdapter {
    pub fn as_str(self) -> &'static str {
        match self {
            ToolOutputAdapter::LabeledBounds => "labeled",
            ToolOutputAdapter::BracketInterval => "bracket",
            ToolOutputAdapter::ListLiteral => "list",
        }
    }

    /// Prefix the tool expects in front of the problem file argument
    pub fn file_prefix(self) -> &'static str {
        match self {
            ToolOutputAdapter::LabeledBounds | ToolOutputAdapter::ListLiteral => "@",
            ToolOutputAdapter::BracketInterval => "",
        }
    }

    /// Parse combined tool output for `mode`
    pub fn parse(self, output: &str, mode: Mode) -> Result<ParsedBound, AdapterError> {
        let bound = match self {
            ToolOutputAdapter::LabeledBounds => parse_labeled(output, mode)?,
            ToolOutputAdapter::BracketInterval => parse_bracket(output, mode)?,
            ToolOutputAdapter::ListLiteral => parse_list(output)?,
        };
        if !bound.is_present() {
            return Err(AdapterError::NoResult);
        }
        if bound.is_upside_down() {
            tracing::warn!(
                adapter = self.as_str(),
                lower = ?bound.lower,
                upper = ?bound.upper,
                "solver reported an upside-down interval"
            );
        }
        Ok(bound)
    }
}

impl FromStr for ToolOutputAdapter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "labeled" | "labeled-bounds" | "gelpia" => Ok(ToolOutputAdapter::LabeledBounds),
            "bracket" | "bracket-interval" | "dop" => Ok(ToolOutputAdapter::BracketInterval),
            "list" | "list-literal" => Ok(ToolOutputAdapter::ListLiteral),
            other => Err(format!("Unknown output adapter: {}", other)),
        }
    }
}

fn parse_number(raw: &str) -> Result<f64, AdapterError> {
    let raw = raw.trim();
    raw.parse::<f64>()
        .map_err(|_| AdapterError::InvalidNumber(raw.to_string()))
}

fn parse_labeled(output: &str, mode: Mode) -> Result<ParsedBound, AdapterError> {
    static LABELED: OnceLock<Regex> = OnceLock::new();
    // Safety: this regex literal is guaranteed to compile
    let re = LABELED.get_or_init(|| {
        Regex::new(r"(?m)^\s*(Maximum|Minimum) (lower|upper) bound[ \t:]*(\S+)").unwrap()
    });

    let wanted = match mode {
        Mode::Min => "Minimum",
        Mode::Max => "Maximum",
    };

    let mut lower = None;
    let mut upper = None;
    for caps in re.captures_iter(output) {
        if &caps[1] != wanted {
            continue;
        }
        let slot = if &caps[2] == "lower" {
            &mut lower
        } else {
            &mut upper
        };
        // First occurrence wins
        if slot.is_none() {
            *slot = Some(parse_number(&caps[3])?);
        }
    }
    Ok(ParsedBound::new(lower, upper))
}

fn parse_bracket(output: &str, mode: Mode) -> Result<ParsedBound, AdapterError> {
    static BRACKET: OnceLock<Regex> = OnceLock::new();
    // Safety: this regex literal is guaranteed to compile
    let re = BRACKET.get_or_init(|| {
        Regex::new(r"\b(min|max)_\d+\s*=\s*\[\s*([^,\]]+?)\s*,\s*([^\]]+?)\s*\]").unwrap()
    });

    let mut total = None;
    for caps in re.captures_iter(output) {
        if &caps[1] != mode.flag() {
            continue;
        }
        let lower = parse_number(&caps[2])?;
        total = Some(total.unwrap_or(0.0) + lower);
    }
    Ok(total.map(ParsedBound::point).unwrap_or(ParsedBound::NONE))
}

fn parse_list(output: &str) -> Result<ParsedBound, AdapterError> {
    let text: String = output
        .lines()
        .filter(|line| !line.starts_with("Parsing") && !line.starts_with("Solver"))
        .collect::<Vec<_>>()
        .join(" ")
        .replace("Stopping early...", "");
    if text.trim().is_empty() {
        return Err(AdapterError::NoResult);
    }

    let literal = parse_literal(&text)?;
    let first = literal
        .as_list()
        .and_then(|items| items.first())
        .ok_or_else(|| AdapterError::Shape("expected a non-empty list".to_string()))?;

    match first {
        Literal::List(pair) if pair.len() >= 2 => {
            let lower = pair[0]
                .as_number()
                .ok_or_else(|| AdapterError::Shape("interval ends must be numbers".to_string()))?;
            let upper = pair[1]
                .as_number()
                .ok_or_else(|| AdapterError::Shape("interval ends must be numbers".to_string()))?;
            Ok(ParsedBound::interval(lower, upper))
        }
        other => Err(AdapterError::Shape(format!(
            "first element must be a [lower, upper] pair, got {:?}",
            other
        ))),
    }
}
