use std::sync::Arc;

use crate::error::StartError;
use crate::service::{StartContext, StopContext};

/// A long-lived unit with a start and a stop.
///
/// `start` and `stop` run on the container's executor. Either may finish
/// synchronously (just return) or asynchronously: call
/// [`asynchronous`](StartContext::asynchronous) on the context, keep a clone of
/// it, and call `complete` / `failed` later from any thread.
///
/// A panic in `start` is recorded as [`StartError::Panicked`]. A panic in
/// `stop` is logged and the service is treated as stopped.
///
/// # Example
/// ```rust
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use servicevisor::{Service, StartContext, StartError, StopContext};
///
/// #[derive(Default)]
/// struct Listener { bound: AtomicBool }
///
/// impl Service for Listener {
///     fn start(&self, _ctx: &StartContext) -> Result<(), StartError> {
///         self.bound.store(true, Ordering::SeqCst);
///         Ok(())
///     }
///
///     fn stop(&self, _ctx: &StopContext) {
///         self.bound.store(false, Ordering::SeqCst);
///     }
/// }
/// ```
pub trait Service: Send + Sync + 'static {
    /// Brings the service up. Returning `Err` moves it to `START_FAILED`.
    fn start(&self, ctx: &StartContext) -> Result<(), StartError>;

    /// Takes the service down. Cannot fail.
    fn stop(&self, ctx: &StopContext);
}

/// Shared handle to a service instance.
pub type ServiceRef = Arc<dyn Service>;

/// A service that does nothing; starts and stops immediately.
///
/// Used for the container root and for pure grouping nodes.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullService;

impl NullService {
    /// Returns a shared handle.
    pub fn arc() -> ServiceRef {
        Arc::new(NullService)
    }
}

impl Service for NullService {
    fn start(&self, _ctx: &StartContext) -> Result<(), StartError> {
        Ok(())
    }

    fn stop(&self, _ctx: &StopContext) {}
}
