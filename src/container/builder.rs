use std::sync::Arc;

use crate::container::container::ContainerInner;
use crate::container::{ContainerConfig, ServiceContainer};
use crate::executor::{ExecutorRef, WorkerExecutor};

/// Builder for a [`ServiceContainer`] with a non-default executor.
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use servicevisor::{ContainerConfig, DirectExecutor, ServiceContainer};
///
/// let container = ServiceContainer::builder(ContainerConfig::default())
///     .with_executor(Arc::new(DirectExecutor))
///     .build();
/// assert!(container.service_names().is_empty());
/// ```
pub struct ContainerBuilder {
    cfg: ContainerConfig,
    executor: Option<ExecutorRef>,
}

impl ContainerBuilder {
    /// Creates a builder with the given configuration.
    pub fn new(cfg: ContainerConfig) -> Self {
        Self {
            cfg,
            executor: None,
        }
    }

    /// Uses `executor` instead of a fresh [`WorkerExecutor`].
    #[must_use]
    pub fn with_executor(mut self, executor: ExecutorRef) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Builds the container and starts its root.
    pub fn build(self) -> ServiceContainer {
        let executor = self
            .executor
            .unwrap_or_else(|| Arc::new(WorkerExecutor::from_config(&self.cfg)));
        ServiceContainer::from_inner(ContainerInner::new(self.cfg, executor))
    }
}
