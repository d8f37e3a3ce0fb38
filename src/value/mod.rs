//! # Deferred values and injection.
//!
//! A [`Value<T>`] is a late-bound producer of a `T`, evaluated when a service
//! starts (so values provided by dependencies can be read once those dependencies
//! are `UP`). An [`Injector<T>`] is the receiving end of an injection.
//!
//! ## Contents
//! - [`ImmediateValue`] wraps a constant;
//! - [`InjectedValue`] is a slot filled when a dependency starts (both a value and an injector);
//! - [`ComposedValue`] maps a source value through a function;
//! - [`SetterInjector`] turns a closure into an injector.
//!
//! ## Injection flow
//! ```text
//! STARTING ──► for each injection: target.inject(source.get()?) ──► service.start(ctx)
//!                     └─ Err ──► START_FAILED (StartError::Value)
//! STOPPING ──► service.stop(ctx) ──► for each injection: target.uninject()
//! ```

mod composed;
mod immediate;
mod injected;
mod injector;

pub use composed::ComposedValue;
pub use immediate::ImmediateValue;
pub use injected::InjectedValue;
pub use injector::{Injector, InjectorRef, SetterInjector};
pub(crate) use injector::{Injection, ValueInjection};

use std::sync::Arc;

use crate::error::ValueError;

/// Late-bound producer of a `T`.
///
/// The container only calls [`get`](Value::get) when the producing service is `UP`
/// (or, for a service's own instance, right before `start`).
pub trait Value<T>: Send + Sync + 'static {
    /// Produces the value or fails.
    fn get(&self) -> Result<T, ValueError>;
}

/// Shared handle to a value.
pub type ValueRef<T> = Arc<dyn Value<T>>;
