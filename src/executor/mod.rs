//! # Executors: where user code runs.
//!
//! Every piece of user code (service `start`/`stop`, listener callbacks) is
//! handed to an [`Executor`] as a [`Job`]. The state machine itself never runs
//! user code under a lock and makes no assumption about the parallelism level:
//! any executor that eventually runs what it accepts is correct.
//!
//! ## Stock executors
//! | Executor           | Runs jobs                                   | Use for                         |
//! |--------------------|---------------------------------------------|---------------------------------|
//! | [`WorkerExecutor`] | on one lazily spawned thread, FIFO, exits when idle | default for every container |
//! | [`DirectExecutor`] | inline on the submitting thread             | deterministic tests             |
//! | [`TokioExecutor`]  | on a tokio runtime's blocking pool          | applications already on tokio   |
//!
//! ## Replacing the executor
//! `ServiceContainer::set_executor` swaps the executor for subsequently
//! scheduled work only; jobs already accepted by the previous executor still run there.

mod direct;
mod tokio;
mod worker;

pub use self::tokio::TokioExecutor;
pub use direct::DirectExecutor;
pub use worker::WorkerExecutor;

use std::any::Any;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::RejectedError;

/// A unit of work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// "Run this eventually."
pub trait Executor: Send + Sync + 'static {
    /// Accepts `job` for execution, or refuses it.
    ///
    /// A refused start job moves the service to `START_FAILED`. So does a
    /// start job the executor accepts and later drops without running it.
    fn execute(&self, job: Job) -> Result<(), RejectedError>;

    /// Returns the executor name used in logs and rejection errors.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Shared handle to an executor.
pub type ExecutorRef = Arc<dyn Executor>;

/// The container's current executor; swapped atomically by `set_executor`.
pub(crate) struct ExecutorSlot {
    current: RwLock<ExecutorRef>,
}

impl ExecutorSlot {
    pub(crate) fn new(executor: ExecutorRef) -> Self {
        Self {
            current: RwLock::new(executor),
        }
    }

    pub(crate) fn get(&self) -> ExecutorRef {
        Arc::clone(&self.current.read())
    }

    pub(crate) fn replace(&self, executor: ExecutorRef) -> ExecutorRef {
        std::mem::replace(&mut *self.current.write(), executor)
    }
}

/// Renders a panic payload for logs.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Runs a job, containing any panic that escapes it.
pub(crate) fn run_contained(executor: &'static str, job: Job) {
    if let Err(payload) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(job)) {
        tracing::error!(
            executor,
            panic = %panic_message(payload.as_ref()),
            "job panicked"
        );
    }
}
