use crate::error::RejectedError;
use crate::executor::{run_contained, Executor, Job};

/// Runs every job inline, on the thread that submits it.
///
/// Makes the whole container deterministic: when `create`, `set_mode`, or
/// `shutdown` returns, every transition those calls triggered has completed.
/// Do not block inside a service or listener waiting for another transition
/// while using this executor; nothing else will run it.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectExecutor;

impl DirectExecutor {
    /// Creates the executor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Executor for DirectExecutor {
    fn execute(&self, job: Job) -> Result<(), RejectedError> {
        run_contained(self.name(), job);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "direct"
    }
}
