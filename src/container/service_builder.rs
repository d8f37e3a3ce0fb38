use std::sync::Arc;

use crate::container::registry::{InstallRequest, Registry};
use crate::controller::{ControllerCore, Mode, ServiceController, ServiceHandle};
use crate::error::InstallError;
use crate::listeners::ListenerRef;
use crate::name::ServiceName;
use crate::service::ServiceRef;
use crate::value::{Injection, InjectorRef, ValueInjection, ValueRef};

/// Collects the description of one service, then installs it with [`create`](Self::create).
///
/// Every service implicitly depends on the container root.
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use servicevisor::{
///     DirectExecutor, ImmediateValue, InjectedValue, InjectorRef, Mode, NullService,
///     ServiceContainer, ServiceName, State, ValueRef,
/// };
///
/// let container = ServiceContainer::builder(Default::default())
///     .with_executor(Arc::new(DirectExecutor))
///     .build();
///
/// let url = ServiceName::of(["config", "url"]).unwrap();
/// container
///     .build_service(url.clone(), ImmediateValue::arc(NullService::arc()), ImmediateValue::arc("pg://db".to_string()))
///     .create()
///     .unwrap();
///
/// let slot = InjectedValue::<String>::arc();
/// let client = container
///     .build_service(ServiceName::of(["client"]).unwrap(), ImmediateValue::arc(NullService::arc()), slot.clone() as ValueRef<String>)
///     .add_dependency(url)
///     .add_injection(ImmediateValue::arc("pg://db".to_string()), slot.clone() as InjectorRef<String>)
///     .set_initial_mode(Mode::Immediate)
///     .create()
///     .unwrap();
///
/// assert_eq!(client.state(), State::Up);
/// assert_eq!(client.get_value().unwrap(), "pg://db");
/// ```
pub struct ServiceBuilder<T> {
    registry: Arc<Registry>,
    name: ServiceName,
    service: ValueRef<ServiceRef>,
    value: ValueRef<T>,
    dependency_names: Vec<ServiceName>,
    dependency_handles: Vec<Arc<ControllerCore>>,
    injections: Vec<Box<dyn Injection>>,
    listeners: Vec<ListenerRef>,
    mode: Mode,
}

impl<T: 'static> ServiceBuilder<T> {
    pub(crate) fn new(
        registry: Arc<Registry>,
        name: ServiceName,
        service: ValueRef<ServiceRef>,
        value: ValueRef<T>,
    ) -> Self {
        Self {
            registry,
            name,
            service,
            value,
            dependency_names: Vec::new(),
            dependency_handles: Vec::new(),
            injections: Vec::new(),
            listeners: Vec::new(),
            mode: Mode::default(),
        }
    }

    /// Depends on the service called `name` (installed now or later).
    #[must_use]
    pub fn add_dependency(mut self, name: ServiceName) -> Self {
        self.dependency_names.push(name);
        self
    }

    #[must_use]
    pub fn add_dependencies<I>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = ServiceName>,
    {
        self.dependency_names.extend(names);
        self
    }

    /// Depends on an already installed controller of the same container.
    #[must_use]
    pub fn add_dependency_on(mut self, controller: &ServiceHandle) -> Self {
        self.dependency_handles.push(Arc::clone(controller.core()));
        self
    }

    /// Before each start, reads `source` and injects it into `target`;
    /// after each stop, uninjects `target`.
    #[must_use]
    pub fn add_injection<V: 'static>(mut self, source: ValueRef<V>, target: InjectorRef<V>) -> Self {
        self.injections.push(ValueInjection::boxed(source, target));
        self
    }

    #[must_use]
    pub fn add_listener(mut self, listener: ListenerRef) -> Self {
        self.listeners.push(listener);
        self
    }

    #[must_use]
    pub fn add_listeners<I>(mut self, listeners: I) -> Self
    where
        I: IntoIterator<Item = ListenerRef>,
    {
        self.listeners.extend(listeners);
        self
    }

    /// Mode the service is installed with; defaults to [`Mode::Automatic`].
    #[must_use]
    pub fn set_initial_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Installs the service.
    ///
    /// # Errors
    /// See [`InstallError`]; on error the container is unchanged.
    pub fn create(self) -> Result<ServiceController<T>, InstallError> {
        let name = self.name.clone();
        let core = self
            .registry
            .install(InstallRequest {
                name: self.name,
                service: self.service,
                dependency_names: self.dependency_names,
                dependency_handles: self.dependency_handles,
                injections: self.injections,
                listeners: self.listeners,
                mode: self.mode,
            })
            .map_err(|e| {
                tracing::debug!(service = %name, error = %e, label = e.as_label(), "install rejected");
                e
            })?;
        Ok(ServiceController::new(core, name, self.value))
    }
}
