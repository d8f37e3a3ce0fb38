//! # ServiceContainer: owner of one service graph.
//!
//! The container owns a root controller (no name, [`NullService`](crate::NullService),
//! mode `AUTOMATIC`) that every installed service implicitly depends on.
//! Shutting the container down is setting the root to `NEVER`: the stop request
//! cascades to every service, leaves first, and the root reaches `DOWN` last.
//!
//! ```text
//!                 root (svc)
//!               ┌────┴────┐
//!              db        cache
//!               └────┬────┘
//!                   web          shutdown(): root → NEVER
//!                                stop order: web, db | cache, root
//! ```
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use servicevisor::{DirectExecutor, NullService, ServiceContainer, ServiceName, State};
//!
//! let container = ServiceContainer::builder(Default::default())
//!     .with_executor(Arc::new(DirectExecutor))
//!     .build();
//!
//! let db = container
//!     .build_service_instance(ServiceName::of(["db"]).unwrap(), Arc::new(NullService))
//!     .create()
//!     .unwrap();
//! assert_eq!(db.state(), State::Up);
//!
//! container.shutdown();
//! container.await_termination(Duration::from_secs(1)).unwrap();
//! assert_eq!(db.state(), State::Down);
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::container::registry::Registry;
use crate::container::{shutdown, ContainerBuilder, ContainerConfig, ServiceBuilder};
use crate::controller::{Mode, ServiceHandle, State};
use crate::error::RuntimeError;
use crate::executor::{ExecutorRef, ExecutorSlot};
use crate::name::ServiceName;
use crate::service::{Service, ServiceRef};
use crate::value::{ImmediateValue, ValueRef};

pub(crate) struct ContainerInner {
    cfg: ContainerConfig,
    executor: Arc<ExecutorSlot>,
    registry: Arc<Registry>,
}

impl ContainerInner {
    pub(crate) fn new(cfg: ContainerConfig, executor: ExecutorRef) -> Arc<Self> {
        let executor = Arc::new(ExecutorSlot::new(executor));
        let registry = Registry::new(Arc::clone(&executor), cfg.forward_references);
        let inner = Arc::new(Self {
            cfg,
            executor,
            registry,
        });
        inner.registry.start_root(Mode::Automatic);
        if shutdown::register(&inner) {
            tracing::info!(container = %inner.cfg.name, "process is shutting down; container starts stopped");
            inner.shutdown();
        }
        tracing::debug!(container = %inner.cfg.name, "container created");
        inner
    }

    pub(crate) fn root(&self) -> ServiceHandle {
        ServiceHandle::new(Arc::clone(self.registry.root()))
    }

    pub(crate) fn shutdown(&self) {
        match self.registry.root().set_mode(Mode::Never) {
            Ok(()) => tracing::debug!(container = %self.cfg.name, "shutdown requested"),
            Err(e) => tracing::debug!(container = %self.cfg.name, error = %e, "shutdown skipped"),
        }
    }

    /// Names of services not at rest in `DOWN`, `START_FAILED` or `REMOVED`.
    pub(crate) fn active_services(&self) -> Vec<String> {
        self.registry
            .controllers()
            .iter()
            .filter(|c| matches!(c.state(), State::Starting | State::Up | State::Stopping))
            .map(|c| format!("{}/{}", self.cfg.name, c.display_name()))
            .collect()
    }
}

impl Drop for ContainerInner {
    fn drop(&mut self) {
        // Last handle gone: stop whatever is still running.
        if let Err(e) = self.registry.root().set_mode(Mode::Never) {
            tracing::debug!(container = %self.cfg.name, error = %e, "drop-time shutdown skipped");
        }
    }
}

/// A dependency graph of services with mode-driven lifecycles.
///
/// Cheap to clone; clones share the same graph. Dropping the last clone shuts
/// the container down.
#[derive(Clone)]
pub struct ServiceContainer {
    inner: Arc<ContainerInner>,
}

impl ServiceContainer {
    /// Creates a container with the default configuration and a [`WorkerExecutor`](crate::WorkerExecutor).
    pub fn new() -> Self {
        ContainerBuilder::new(ContainerConfig::default()).build()
    }

    /// Starts building a container with `cfg`.
    pub fn builder(cfg: ContainerConfig) -> ContainerBuilder {
        ContainerBuilder::new(cfg)
    }

    pub(crate) fn from_inner(inner: Arc<ContainerInner>) -> Self {
        Self { inner }
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.inner.cfg
    }

    /// Starts describing a service.
    ///
    /// `service` yields the instance to start; `value` is what the service
    /// provides to others (read through the returned controller or injections).
    pub fn build_service<T: 'static>(
        &self,
        name: ServiceName,
        service: ValueRef<ServiceRef>,
        value: ValueRef<T>,
    ) -> ServiceBuilder<T> {
        ServiceBuilder::new(Arc::clone(&self.inner.registry), name, service, value)
    }

    /// Starts describing a service whose instance is also the provided value.
    pub fn build_service_instance<S: Service>(
        &self,
        name: ServiceName,
        service: Arc<S>,
    ) -> ServiceBuilder<Arc<S>> {
        let instance: ServiceRef = service.clone();
        self.build_service(name, ImmediateValue::arc(instance), ImmediateValue::arc(service))
    }

    /// Installed service by name.
    pub fn service(&self, name: &ServiceName) -> Option<ServiceHandle> {
        self.inner.registry.get(name).map(ServiceHandle::new)
    }

    /// Names of all installed services, sorted.
    pub fn service_names(&self) -> Vec<ServiceName> {
        self.inner
            .registry
            .controllers()
            .iter()
            .filter_map(|c| c.name().cloned())
            .collect()
    }

    /// The container's root controller.
    pub fn root(&self) -> ServiceHandle {
        self.inner.root()
    }

    /// Replaces the executor for work scheduled from now on.
    pub fn set_executor(&self, executor: ExecutorRef) {
        let previous = self.inner.executor.replace(executor);
        tracing::debug!(
            container = %self.inner.cfg.name,
            previous = previous.name(),
            "executor replaced"
        );
    }

    /// The executor currently used for new work.
    pub fn executor(&self) -> ExecutorRef {
        self.inner.executor.get()
    }

    /// Stops every service (root → `NEVER`). Returns immediately.
    pub fn shutdown(&self) {
        self.inner.shutdown();
    }

    /// True once [`shutdown`](Self::shutdown) was requested.
    pub fn is_shutdown(&self) -> bool {
        self.inner.registry.root().mode() == Mode::Never
    }

    /// [`shutdown`](Self::shutdown), then waits up to the configured
    /// `shutdown_grace` for the root to reach `DOWN`.
    ///
    /// # Errors
    /// [`RuntimeError::GraceExceeded`] listing services that are still active.
    pub fn close(&self) -> Result<(), RuntimeError> {
        self.shutdown();
        self.await_termination(self.inner.cfg.shutdown_grace)
    }

    /// Waits up to `grace` for the root to reach `DOWN`.
    ///
    /// # Errors
    /// [`RuntimeError::GraceExceeded`] listing services that are still active.
    pub fn await_termination(&self, grace: Duration) -> Result<(), RuntimeError> {
        if self.root().await_state(State::Down, grace) {
            return Ok(());
        }
        Err(RuntimeError::GraceExceeded {
            grace,
            stuck: self.inner.active_services(),
        })
    }
}

impl Default for ServiceContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ServiceContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContainer")
            .field("name", &self.inner.cfg.name)
            .field("root", &self.inner.registry.root().state())
            .finish()
    }
}
