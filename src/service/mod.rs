//! # Services and their start/stop contexts.
//!
//! - [`Service`]: trait implemented by user services.
//! - [`ServiceFn`]: closure-backed service.
//! - [`NullService`]: does nothing; used for the container root.
//! - [`StartContext`] / [`StopContext`]: report asynchronous completion.

mod context;
#[allow(clippy::module_inception)]
mod service;
mod service_fn;

pub use context::{StartContext, StopContext};
pub use service::{NullService, Service, ServiceRef};
pub use service_fn::ServiceFn;
