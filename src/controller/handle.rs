use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use crate::controller::{ControllerCore, ControllerSnapshot, Mode, State};
use crate::error::{StartError, StateError, ValueError};
use crate::listeners::ListenerRef;
use crate::name::ServiceName;
use crate::value::ValueRef;

/// Untyped handle to an installed service.
///
/// Cheap to clone; all clones refer to the same controller. Two handles are
/// equal when they refer to the same controller.
#[derive(Clone)]
pub struct ServiceHandle {
    core: Arc<ControllerCore>,
}

impl ServiceHandle {
    pub(crate) fn new(core: Arc<ControllerCore>) -> Self {
        Self { core }
    }

    pub(crate) fn core(&self) -> &Arc<ControllerCore> {
        &self.core
    }

    /// Service name; `None` only for a container's root.
    pub fn name(&self) -> Option<&ServiceName> {
        self.core.name()
    }

    /// Service name, with the root rendered as `svc`.
    pub fn display_name(&self) -> ServiceName {
        self.core.display_name()
    }

    pub fn mode(&self) -> Mode {
        self.core.mode()
    }

    /// Changes the mode. Setting the current mode is a no-op.
    ///
    /// On a `START_FAILED` service any mode change also clears the failure and
    /// allows a new start attempt.
    pub fn set_mode(&self, mode: Mode) -> Result<(), StateError> {
        self.core.set_mode(mode)
    }

    pub fn state(&self) -> State {
        self.core.state()
    }

    /// Error recorded by the last failed start, while in `START_FAILED`.
    pub fn start_error(&self) -> Option<StartError> {
        self.core.start_error()
    }

    /// Clears a start failure so the service may start again.
    pub fn retry(&self) -> Result<(), StateError> {
        self.core.retry()
    }

    /// Stops the service if needed, then unwires it and drops it from the container.
    ///
    /// Fails with [`StateError::HasDependents`] while other services depend on it,
    /// and with [`StateError::RootRemoval`] on a container's root.
    pub fn remove(&self) -> Result<(), StateError> {
        self.core.request_removal()
    }

    /// Adds a listener; returns false if that same instance is already attached.
    pub fn add_listener(&self, listener: ListenerRef) -> bool {
        self.core.add_listener(listener)
    }

    /// Detaches a listener; returns false if it was not attached.
    pub fn remove_listener(&self, listener: &ListenerRef) -> bool {
        self.core.remove_listener(listener)
    }

    /// Blocks the calling thread until the service reaches `state` or `timeout`
    /// elapses. Returns whether the state was reached.
    pub fn await_state(&self, state: State, timeout: Duration) -> bool {
        self.core.await_state(state, timeout)
    }

    /// Names of the direct dependencies (excluding the container root).
    pub fn dependencies(&self) -> Vec<ServiceName> {
        self.core
            .dependencies()
            .iter()
            .filter_map(|c| c.name().cloned())
            .collect()
    }

    /// Names of the installed direct dependents.
    pub fn dependents(&self) -> Vec<ServiceName> {
        self.core
            .dependents()
            .iter()
            .filter_map(|c| c.name().cloned())
            .collect()
    }

    /// Point-in-time copy of the controller's counters.
    pub fn snapshot(&self) -> ControllerSnapshot {
        self.core.snapshot()
    }
}

impl PartialEq for ServiceHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.core, &other.core)
    }
}

impl Eq for ServiceHandle {}

impl fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("name", &self.core.display_name())
            .field("state", &self.core.state())
            .finish()
    }
}

/// Typed controller returned by `ServiceBuilder::create`.
///
/// Dereferences to [`ServiceHandle`] for the lifecycle API and adds access to
/// the value the service provides.
pub struct ServiceController<T> {
    handle: ServiceHandle,
    name: ServiceName,
    value: ValueRef<T>,
}

impl<T: 'static> ServiceController<T> {
    pub(crate) fn new(core: Arc<ControllerCore>, name: ServiceName, value: ValueRef<T>) -> Self {
        Self {
            handle: ServiceHandle::new(core),
            name,
            value,
        }
    }

    /// The installed name. Unlike [`ServiceHandle::name`] this is never `None`,
    /// since only the root has no name.
    pub fn service_name(&self) -> &ServiceName {
        &self.name
    }

    /// Untyped handle, for listeners and `add_dependency_on`.
    pub fn handle(&self) -> &ServiceHandle {
        &self.handle
    }

    /// The value provider this service was installed with.
    pub fn value(&self) -> ValueRef<T> {
        Arc::clone(&self.value)
    }

    /// Resolves the provided value. Meaningful while the service is `UP`.
    pub fn get_value(&self) -> Result<T, ValueError> {
        self.value.get()
    }
}

impl<T> Clone for ServiceController<T> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            name: self.name.clone(),
            value: Arc::clone(&self.value),
        }
    }
}

impl<T> Deref for ServiceController<T> {
    type Target = ServiceHandle;

    fn deref(&self) -> &ServiceHandle {
        &self.handle
    }
}

impl<T> fmt::Debug for ServiceController<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceController")
            .field("name", &self.name)
            .field("state", &self.handle.state())
            .finish()
    }
}
