//! # Service containers.
//!
//! - [`ServiceContainer`]: owns the root controller and the service graph.
//! - [`ContainerBuilder`]: container with a non-default executor.
//! - [`ServiceBuilder`]: describes and installs one service.
//! - [`ContainerConfig`]: container settings.
//! - [`shutdown_all`] / [`shutdown_on_signal`]: process-wide shutdown.

mod builder;
mod config;
#[allow(clippy::module_inception)]
mod container;
mod registry;
mod service_builder;
mod shutdown;

pub use builder::ContainerBuilder;
pub use config::ContainerConfig;
pub use container::ServiceContainer;
pub(crate) use registry::Registry;
pub use service_builder::ServiceBuilder;
pub use shutdown::{is_shutting_down, shutdown_all, shutdown_on_signal};
