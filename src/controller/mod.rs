//! # Service controllers.
//!
//! One controller per installed service (plus one root per container). A
//! controller owns the mode, the state, the listeners and the dependency
//! counters of its service, and drives the state toward what the mode asks.
//!
//! - [`Mode`]: user intent.
//! - [`State`]: observed lifecycle position.
//! - [`ServiceHandle`]: untyped, cloneable handle.
//! - [`ServiceController`]: typed handle returned at install, with the provided value.
//! - [`ControllerSnapshot`]: counters for diagnostics.
//!
//! ## Invariants
//! ```text
//! UP or STARTING  ⇒ every dependency is UP
//! a dependency leaves UP only after every dependent is DOWN or START_FAILED
//! listener calls for one controller arrive in transition order
//! ```

mod core;
mod handle;
mod mode;
mod state;

pub(crate) use self::core::{ControllerCore, Definition};
pub use self::core::ControllerSnapshot;
pub use handle::{ServiceController, ServiceHandle};
pub use mode::Mode;
pub use state::State;
