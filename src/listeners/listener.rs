use std::sync::Arc;

use crate::controller::ServiceHandle;
use crate::error::StartError;
use crate::listeners::Transition;

/// Observer of one or more controllers' lifecycle transitions.
///
/// Every method has an empty default; implement the ones you care about.
///
/// ### Delivery
/// - Called on the container's executor, never under a controller lock.
/// - Per controller, calls arrive in transition order.
/// - A panic is caught and logged; other listeners still run.
/// - Calling back into the controller (including `remove_listener(self)`) is allowed.
///
/// # Example
/// ```rust
/// use servicevisor::{ServiceHandle, ServiceListener, StartError};
///
/// struct Alerts;
///
/// impl ServiceListener for Alerts {
///     fn failed(&self, controller: &ServiceHandle, error: &StartError) {
///         eprintln!("{:?} failed: {error}", controller.name());
///     }
/// }
/// ```
pub trait ServiceListener: Send + Sync + 'static {
    /// `DOWN → STARTING`.
    fn starting(&self, _controller: &ServiceHandle) {}

    /// `STARTING → UP`.
    fn started(&self, _controller: &ServiceHandle) {}

    /// `STARTING → START_FAILED`.
    fn failed(&self, _controller: &ServiceHandle, _error: &StartError) {}

    /// `UP → STOPPING`.
    fn stopping(&self, _controller: &ServiceHandle) {}

    /// `STOPPING → DOWN`.
    fn stopped(&self, _controller: &ServiceHandle) {}

    /// `DOWN → REMOVED`.
    fn removed(&self, _controller: &ServiceHandle) {}

    /// Returns the listener name used in logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Routes a transition to the matching callback.
    fn on_transition(&self, controller: &ServiceHandle, transition: &Transition) {
        match transition {
            Transition::Starting => self.starting(controller),
            Transition::Started => self.started(controller),
            Transition::Failed(e) => self.failed(controller, e),
            Transition::Stopping => self.stopping(controller),
            Transition::Stopped => self.stopped(controller),
            Transition::Removed => self.removed(controller),
        }
    }
}

/// Shared handle to a listener.
pub type ListenerRef = Arc<dyn ServiceListener>;
