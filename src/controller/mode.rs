//! # Controller modes.
//!
//! A [`Mode`] is the user's *intent* for a service; the observed lifecycle
//! position is the [`State`](crate::State). The state machine drives the state
//! toward what the mode (plus dependency readiness) asks for.
//!
//! ```text
//! NEVER      → never runs; a running service is stopped
//! ON_DEMAND  → runs while at least one dependent demands it
//! AUTOMATIC  → runs as soon as every dependency is UP
//! IMMEDIATE  → like AUTOMATIC, and demands its dependencies (pulling ON_DEMAND parents up)
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// User-declared intent for a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Do not run.
    Never,
    /// Run only while demanded by a dependent.
    OnDemand,
    /// Run whenever dependencies allow (default).
    Automatic,
    /// Run, and demand every dependency.
    Immediate,
}

impl Mode {
    /// All modes, in declaration order.
    pub const ALL: [Mode; 4] = [Mode::Never, Mode::OnDemand, Mode::Automatic, Mode::Immediate];

    /// Stable upper-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Never => "NEVER",
            Mode::OnDemand => "ON_DEMAND",
            Mode::Automatic => "AUTOMATIC",
            Mode::Immediate => "IMMEDIATE",
        }
    }
}

impl Default for Mode {
    /// Returns [`Mode::Automatic`].
    fn default() -> Self {
        Mode::Automatic
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| ParseError {
                kind: "mode",
                value: s.to_string(),
            })
    }
}
