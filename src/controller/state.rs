//! # Controller states.
//!
//! ```text
//!            should-run && deps UP            start ok
//!   DOWN ─────────────────────────► STARTING ─────────► UP
//!    ▲ ▲                               │                 │ !should-run &&
//!    │ │ retry / mode change           │ start err       │ no running dependents
//!    │ └────────────── START_FAILED ◄──┘                 ▼
//!    └──────────────────────────────────────────────  STOPPING
//!    │                 stop returns
//!    │ remove && no dependents
//!    ▼
//!  REMOVED (terminal)
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// Observed lifecycle position of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Not running (initial).
    Down,
    /// `start` submitted, outcome pending.
    Starting,
    /// Running.
    Up,
    /// `stop` submitted, completion pending.
    Stopping,
    /// Last `start` failed; see `start_error`.
    StartFailed,
    /// Unwired and dropped from the container (terminal).
    Removed,
}

impl State {
    /// All states, in declaration order.
    pub const ALL: [State; 6] = [
        State::Down,
        State::Starting,
        State::Up,
        State::Stopping,
        State::StartFailed,
        State::Removed,
    ];

    /// Stable upper-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            State::Down => "DOWN",
            State::Starting => "STARTING",
            State::Up => "UP",
            State::Stopping => "STOPPING",
            State::StartFailed => "START_FAILED",
            State::Removed => "REMOVED",
        }
    }

    /// True for `STARTING` and `UP`: the states that pin dependencies.
    pub fn is_running(&self) -> bool {
        matches!(self, State::Starting | State::Up)
    }

    /// True for the states that will not change without an external event.
    pub fn is_rest(&self) -> bool {
        matches!(
            self,
            State::Down | State::Up | State::StartFailed | State::Removed
        )
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for State {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        State::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| ParseError {
                kind: "state",
                value: s.to_string(),
            })
    }
}
