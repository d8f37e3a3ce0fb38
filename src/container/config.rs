//! # Container configuration.
//!
//! [`ContainerConfig`] holds the settings a [`ServiceContainer`](crate::ServiceContainer)
//! is built with.
//!
//! ## Sentinel values
//! - `shutdown_grace = 0s` → `ServiceContainer::close` checks once and does not wait
//! - `worker_idle_timeout = 0s` → the default worker exits as soon as its queue is empty

use std::time::Duration;

/// Settings of one service container.
///
/// ## Field semantics
/// - `name`: label used in logs and in shutdown reports
/// - `worker_thread_name`: thread name of the default [`WorkerExecutor`](crate::WorkerExecutor)
/// - `worker_idle_timeout`: how long the default worker waits for work before exiting
/// - `shutdown_grace`: how long `ServiceContainer::close` waits for the root to stop
/// - `forward_references`: whether a dependency may name a service not installed yet
#[derive(Clone, Debug)]
pub struct ContainerConfig {
    /// Container label for logs.
    pub name: String,

    /// Thread name of the default worker executor.
    pub worker_thread_name: String,

    /// Idle time after which the default worker thread exits.
    ///
    /// The next submitted job spawns a new thread.
    pub worker_idle_timeout: Duration,

    /// Wait used by [`ServiceContainer::close`](crate::ServiceContainer::close).
    pub shutdown_grace: Duration,

    /// Allow dependencies on names that are not installed yet.
    ///
    /// - `true` (default): the dependent waits (`DOWN`) until the name is installed
    ///   and `UP`.
    /// - `false`: `create` fails with `InstallError::MissingDependency`.
    pub forward_references: bool,
}

impl ContainerConfig {
    /// Returns the idle timeout, clamped to at least one millisecond.
    #[inline]
    pub fn worker_idle_timeout_clamped(&self) -> Duration {
        self.worker_idle_timeout.max(Duration::from_millis(1))
    }

    /// Sets the container label.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Enables or disables forward references.
    #[must_use]
    pub fn with_forward_references(mut self, enabled: bool) -> Self {
        self.forward_references = enabled;
        self
    }
}

impl Default for ContainerConfig {
    /// Default configuration:
    ///
    /// - `name = "container"`
    /// - `worker_thread_name = "servicevisor-worker"`
    /// - `worker_idle_timeout = 30s`
    /// - `shutdown_grace = 60s`
    /// - `forward_references = true`
    fn default() -> Self {
        Self {
            name: "container".to_string(),
            worker_thread_name: "servicevisor-worker".to_string(),
            worker_idle_timeout: Duration::from_secs(30),
            shutdown_grace: Duration::from_secs(60),
            forward_references: true,
        }
    }
}
