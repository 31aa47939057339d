//! Terminal styling for state labels.

use optibench_logic::{AxisState, MainState, RegressionState, StrictState, WidthState};
use std::io::IsTerminal;
use std::str::FromStr;

/// When to colorize output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

impl FromStr for ColorChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(ColorChoice::Auto),
            "always" => Ok(ColorChoice::Always),
            "never" => Ok(ColorChoice::Never),
            other => Err(format!("Unknown color choice: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Tone {
    Good,
    Neutral,
    Warn,
    Bad,
}

impl Tone {
    fn code(self) -> &'static str {
        match self {
            Tone::Good => "32",
            Tone::Neutral => "36",
            Tone::Warn => "33",
            Tone::Bad => "1;31",
        }
    }
}

/// ANSI painter; a disabled style returns text unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct Style {
    enabled: bool,
}

impl Style {
    pub fn plain() -> Self {
        Self { enabled: false }
    }

    /// Resolve `choice` against whether stdout is a terminal
    pub fn for_stdout(choice: ColorChoice) -> Self {
        let enabled = match choice {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => {
                std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
            }
        };
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn paint(&self, text: &str, tone: Tone) -> String {
        if self.enabled {
            format!("\x1b[{}m{}\x1b[0m", tone.code(), text)
        } else {
            text.to_string()
        }
    }

    pub fn bold(&self, text: &str) -> String {
        if self.enabled {
            format!("\x1b[1m{}\x1b[0m", text)
        } else {
            text.to_string()
        }
    }

    pub fn main(&self, state: MainState) -> String {
        let tone = match state {
            MainState::Ran => Tone::Good,
            MainState::Unknown | MainState::NotRan => Tone::Neutral,
            MainState::RanOut | MainState::Timeout => Tone::Warn,
            MainState::Crash | MainState::Failed => Tone::Bad,
        };
        self.paint(state.as_str(), tone)
    }

    pub fn strict(&self, state: StrictState) -> String {
        let tone = match state {
            StrictState::Exact | StrictState::Close => Tone::Good,
            StrictState::NotApplicable => Tone::Neutral,
            StrictState::Far | StrictState::BadClose | StrictState::BadFar => Tone::Warn,
            StrictState::Broken => Tone::Bad,
        };
        self.paint(state.as_str(), tone)
    }

    pub fn width(&self, state: WidthState) -> String {
        let tone = match state {
            WidthState::Point | WidthState::Narrow => Tone::Good,
            WidthState::NotApplicable => Tone::Neutral,
            WidthState::Wide => Tone::Warn,
        };
        self.paint(state.as_str(), tone)
    }

    pub fn regression(&self, state: RegressionState) -> String {
        let tone = match state {
            RegressionState::Same | RegressionState::Better | RegressionState::FarBetter => {
                Tone::Good
            }
            RegressionState::NotApplicable => Tone::Neutral,
            RegressionState::Worse => Tone::Warn,
            RegressionState::FarWorse => Tone::Bad,
        };
        self.paint(state.as_str(), tone)
    }
}
