//! # Lifecycle listeners.
//!
//! A [`ServiceListener`] is attached to one or more controllers and is told
//! about every transition they make.
//!
//! ## Architecture
//! ```text
//! controller evaluation (under lock)
//!     └─ push Transition ─► per-controller queue
//!                              │ (one drainer at a time)
//!                              ▼
//!                      executor job ─► ListenerSet::deliver
//!                                          ├──► LogListener   (feature = "logging")
//!                                          └──► user listeners
//! ```
//!
//! ## Implementing a listener
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use servicevisor::{ServiceHandle, ServiceListener};
//!
//! #[derive(Default)]
//! struct Uptime { up: AtomicUsize }
//!
//! impl ServiceListener for Uptime {
//!     fn started(&self, _: &ServiceHandle) { self.up.fetch_add(1, Ordering::Relaxed); }
//!     fn stopped(&self, _: &ServiceHandle) { self.up.fetch_sub(1, Ordering::Relaxed); }
//! }
//! ```

mod listener;
mod set;
mod transition;

#[cfg(feature = "logging")]
mod log;

pub use listener::{ListenerRef, ServiceListener};
pub use set::ListenerSet;
pub use transition::Transition;

#[cfg(feature = "logging")]
pub use log::LogListener;
