use std::fmt;

use crate::error::StartError;

/// One lifecycle transition, as delivered to listeners.
///
/// Transitions of a single controller are delivered in the order they happened.
#[derive(Debug, Clone)]
pub enum Transition {
    /// `DOWN → STARTING`.
    Starting,
    /// `STARTING → UP`.
    Started,
    /// `STARTING → START_FAILED`.
    Failed(StartError),
    /// `UP → STOPPING`.
    Stopping,
    /// `STOPPING → DOWN`.
    Stopped,
    /// `DOWN → REMOVED`.
    Removed,
}

impl Transition {
    /// Short stable label (snake_case) for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            Transition::Starting => "starting",
            Transition::Started => "started",
            Transition::Failed(_) => "failed",
            Transition::Stopping => "stopping",
            Transition::Stopped => "stopped",
            Transition::Removed => "removed",
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Failed(e) => write!(f, "failed({e})"),
            other => f.write_str(other.as_label()),
        }
    }
}
