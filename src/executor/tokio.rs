use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::runtime::Handle;

use crate::error::RejectedError;
use crate::executor::{run_contained, Executor, Job};

/// Dispatches jobs onto a tokio runtime's blocking pool.
///
/// Service code is synchronous and may block, so jobs go through
/// [`Handle::spawn_blocking`] rather than the async worker threads.
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use servicevisor::{ServiceContainer, TokioExecutor};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() {
///     let container = ServiceContainer::new();
///     container.set_executor(Arc::new(TokioExecutor::current().unwrap()));
/// }
/// ```
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    handle: Handle,
}

impl TokioExecutor {
    /// Uses the given runtime handle.
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Uses the runtime the caller is running on, if any.
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl Executor for TokioExecutor {
    /// Fails when the runtime is shut down: tokio then drops the task
    /// before `spawn_blocking` returns.
    fn execute(&self, job: Job) -> Result<(), RejectedError> {
        let name = self.name();
        let dropped = Arc::new(AtomicBool::new(false));
        let flag = DropFlag {
            dropped: Arc::clone(&dropped),
            armed: true,
        };
        drop(self.handle.spawn_blocking(move || {
            let mut flag = flag;
            flag.armed = false;
            run_contained(name, job)
        }));
        if dropped.load(Ordering::Acquire) {
            return Err(RejectedError::new(name, "runtime is shut down"));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "tokio"
    }
}

/// Records that a task was dropped before it started.
struct DropFlag {
    dropped: Arc<AtomicBool>,
    armed: bool,
}

impl Drop for DropFlag {
    fn drop(&mut self) {
        if self.armed {
            self.dropped.store(true, Ordering::Release);
        }
    }
}
