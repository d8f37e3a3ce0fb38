//! # Closure-backed service (`ServiceFn`)
//!
//! [`ServiceFn`] wraps a start closure and a stop closure. Shared state between
//! the two goes in an `Arc` captured by both.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use servicevisor::{ServiceFn, ServiceRef};
//!
//! let open = Arc::new(AtomicBool::new(false));
//! let (o1, o2) = (open.clone(), open.clone());
//! let svc: ServiceRef = ServiceFn::arc(
//!     move |_ctx| { o1.store(true, Ordering::SeqCst); Ok(()) },
//!     move |_ctx| o2.store(false, Ordering::SeqCst),
//! );
//! # let _ = svc;
//! ```

use std::fmt;
use std::sync::Arc;

use crate::error::StartError;
use crate::service::{Service, StartContext, StopContext};

/// Function-backed service implementation.
pub struct ServiceFn<S, P> {
    start: S,
    stop: P,
}

impl<S, P> ServiceFn<S, P>
where
    S: Fn(&StartContext) -> Result<(), StartError> + Send + Sync + 'static,
    P: Fn(&StopContext) + Send + Sync + 'static,
{
    /// Creates a service from a start and a stop closure.
    pub fn new(start: S, stop: P) -> Self {
        Self { start, stop }
    }

    /// Creates the service and returns it as a shared handle.
    pub fn arc(start: S, stop: P) -> Arc<Self> {
        Arc::new(Self::new(start, stop))
    }
}

impl<S> ServiceFn<S, fn(&StopContext)>
where
    S: Fn(&StartContext) -> Result<(), StartError> + Send + Sync + 'static,
{
    /// Creates a service whose stop does nothing.
    pub fn start_only(start: S) -> Arc<Self> {
        fn noop(_: &StopContext) {}
        Arc::new(Self {
            start,
            stop: noop as fn(&StopContext),
        })
    }
}

impl<S, P> Service for ServiceFn<S, P>
where
    S: Fn(&StartContext) -> Result<(), StartError> + Send + Sync + 'static,
    P: Fn(&StopContext) + Send + Sync + 'static,
{
    fn start(&self, ctx: &StartContext) -> Result<(), StartError> {
        (self.start)(ctx)
    }

    fn stop(&self, ctx: &StopContext) {
        (self.stop)(ctx)
    }
}

impl<S, P> fmt::Debug for ServiceFn<S, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceFn").finish_non_exhaustive()
    }
}
