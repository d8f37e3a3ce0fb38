//! # Start/stop contexts.
//!
//! A context is handed to `Service::start` / `Service::stop` and is the only
//! way to report an asynchronous outcome.
//!
//! ```text
//!  SYNC ──asynchronous()──► ASYNC
//!    │                        │
//!    └── complete()/failed() ─┴──► DONE   (later calls: logged, ignored)
//! ```
//!
//! If `start` returns while the context is still `SYNC`, its return value is
//! the outcome. If it returns after `asynchronous()`, an `Err` return still
//! fails the start; `Ok` means "wait for `complete()`".

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::controller::{ControllerCore, ServiceHandle};
use crate::error::StartError;

const SYNC: u8 = 0;
const ASYNC: u8 = 1;
const DONE: u8 = 2;

#[derive(Clone)]
struct Shared {
    core: Arc<ControllerCore>,
    status: Arc<AtomicU8>,
}

impl Shared {
    fn new(core: Arc<ControllerCore>) -> Self {
        Self {
            core,
            status: Arc::new(AtomicU8::new(SYNC)),
        }
    }

    fn go_async(&self, what: &'static str) {
        if self
            .status
            .compare_exchange(SYNC, ASYNC, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!(
                service = %self.core.display_name(),
                context = what,
                "asynchronous() after completion ignored"
            );
        }
    }

    /// Claims the single completion slot.
    fn claim(&self, what: &'static str) -> bool {
        if self.status.swap(DONE, Ordering::AcqRel) == DONE {
            tracing::warn!(
                service = %self.core.display_name(),
                context = what,
                "duplicate completion ignored"
            );
            return false;
        }
        true
    }

    fn is_async(&self) -> bool {
        self.status.load(Ordering::Acquire) == ASYNC
    }

    fn is_done(&self) -> bool {
        self.status.load(Ordering::Acquire) == DONE
    }
}

/// Handed to [`Service::start`](crate::Service::start).
///
/// Cheap to clone; clones share the same completion slot.
#[derive(Clone)]
pub struct StartContext {
    shared: Shared,
}

impl StartContext {
    pub(crate) fn new(core: Arc<ControllerCore>) -> Self {
        Self {
            shared: Shared::new(core),
        }
    }

    /// Declares that the outcome will be reported later via
    /// [`complete`](Self::complete) or [`failed`](Self::failed).
    pub fn asynchronous(&self) {
        self.shared.go_async("start");
    }

    /// Reports a successful start.
    pub fn complete(&self) {
        if self.shared.claim("start") {
            self.shared.core.finish_start(Ok(()));
        }
    }

    /// Reports a failed start.
    pub fn failed(&self, error: StartError) {
        if self.shared.claim("start") {
            self.shared.core.finish_start(Err(error));
        }
    }

    /// The controller being started.
    pub fn controller(&self) -> ServiceHandle {
        ServiceHandle::new(Arc::clone(&self.shared.core))
    }

    /// Applies the value `start` returned.
    pub(crate) fn settle(&self, result: Result<(), StartError>) {
        match result {
            Err(e) if !self.shared.is_done() => self.failed(e),
            Err(e) => tracing::warn!(
                service = %self.shared.core.display_name(),
                error = %e,
                "start returned an error after completing; ignored"
            ),
            Ok(()) if self.shared.is_async() || self.shared.is_done() => {}
            Ok(()) => self.complete(),
        }
    }
}

impl fmt::Debug for StartContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StartContext")
            .field("service", &self.shared.core.display_name())
            .finish_non_exhaustive()
    }
}

/// Handed to [`Service::stop`](crate::Service::stop).
#[derive(Clone)]
pub struct StopContext {
    shared: Shared,
}

impl StopContext {
    pub(crate) fn new(core: Arc<ControllerCore>) -> Self {
        Self {
            shared: Shared::new(core),
        }
    }

    /// Declares that completion will be reported later via [`complete`](Self::complete).
    pub fn asynchronous(&self) {
        self.shared.go_async("stop");
    }

    /// Reports that the service has stopped.
    pub fn complete(&self) {
        if self.shared.claim("stop") {
            self.shared.core.finish_stop();
        }
    }

    /// The controller being stopped.
    pub fn controller(&self) -> ServiceHandle {
        ServiceHandle::new(Arc::clone(&self.shared.core))
    }

    /// Completes a synchronous stop once `stop` has returned.
    pub(crate) fn settle(&self) {
        if !self.shared.is_async() && !self.shared.is_done() {
            self.complete();
        }
    }
}

impl fmt::Debug for StopContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StopContext")
            .field("service", &self.shared.core.display_name())
            .finish_non_exhaustive()
    }
}
