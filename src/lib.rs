//! # servicevisor
//!
//! **Servicevisor** is a dependency-aware service container for Rust.
//!
//! Long-lived services (connection pools, listeners, caches, ...) are installed
//! into a [`ServiceContainer`] together with the names of the services they depend
//! on. Each service has a user-declared [`Mode`] (intent) and an observed
//! [`State`]; the container starts a service once everything it depends on is
//! `UP`, and stops dependents before the services they depend on.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   ServiceBuilder ─ create() ─► Registry (name index, cycle check, wiring)
//!                                   │
//!                                   ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  ServiceContainer                                                 │
//! │                                                                   │
//! │                       root (NullService)                          │
//! │                   ┌──────────┼──────────┐                         │
//! │             ControllerCore  ...   ControllerCore                  │
//! │              (db, mode,            (cache, mode,                  │
//! │               state, counters)      state, counters)              │
//! │                   └──────────┬──────────┘                         │
//! │                        ControllerCore (web)                       │
//! └──────────────────────────────┬────────────────────────────────────┘
//!                                │ start / stop / listener jobs
//!                                ▼
//!                   Executor (WorkerExecutor by default)
//!                      ├─► Service::start(ctx) / Service::stop(ctx)
//!                      └─► ServiceListener callbacks
//! ```
//!
//! ### Lifecycle
//! ```text
//!            should run && deps UP           start ok
//!   DOWN ─────────────────────────► STARTING ─────────► UP
//!    ▲                                  │                │ !should run &&
//!    │                        start err ▼                │ no running dependents
//!    ├──── retry / mode ──── START_FAILED                ▼
//!    └─────────────── stop completes ─────────────── STOPPING
//!
//!   DOWN ── removal requested && no dependents ──► REMOVED
//! ```
//!
//! ### Modes
//! | Mode        | Runs when                                 | Demands dependencies |
//! |-------------|-------------------------------------------|----------------------|
//! | `NEVER`     | never                                     | no                   |
//! | `ON_DEMAND` | at least one dependent demands it         | while demanded       |
//! | `AUTOMATIC` | always (once dependencies are `UP`)       | no                   |
//! | `IMMEDIATE` | always (once dependencies are `UP`)       | yes                  |
//!
//! ## Features
//! | Area            | Description                                               | Key types / traits                                 |
//! |-----------------|-----------------------------------------------------------|----------------------------------------------------|
//! | **Container**   | Install services, look them up, shut down.                | [`ServiceContainer`], [`ServiceBuilder`]           |
//! | **Controllers** | Per-service mode, state, retry, removal, waiting.         | [`ServiceController`], [`ServiceHandle`]           |
//! | **Services**    | Sync or async start/stop with completion contexts.        | [`Service`], [`ServiceFn`], [`StartContext`]       |
//! | **Values**      | Late-bound values and injection between services.         | [`Value`], [`InjectedValue`], [`Injector`]         |
//! | **Listeners**   | Ordered lifecycle notifications.                          | [`ServiceListener`], [`Transition`]                |
//! | **Executors**   | Where user code runs.                                     | [`Executor`], [`WorkerExecutor`], [`TokioExecutor`]|
//! | **Names**       | Hierarchical, structurally compared identifiers.          | [`ServiceName`]                                    |
//! | **Errors**      | Typed install, start, state and shutdown errors.          | [`InstallError`], [`StartError`], [`RuntimeError`] |
//!
//! ## Optional features
//! - `logging`: exports [`LogListener`], which mirrors transitions into `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use servicevisor::{Mode, ServiceContainer, ServiceFn, ServiceName, State};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let container = ServiceContainer::new();
//!
//!     let db = ServiceName::of(["app", "db"])?;
//!     let web = ServiceName::of(["app", "web"])?;
//!
//!     container
//!         .build_service_instance(db.clone(), ServiceFn::start_only(|_ctx| Ok(())))
//!         .create()?;
//!     let web_ctl = container
//!         .build_service_instance(web, ServiceFn::start_only(|_ctx| Ok(())))
//!         .add_dependency(db)
//!         .create()?;
//!
//!     assert!(web_ctl.await_state(State::Up, Duration::from_secs(5)));
//!
//!     web_ctl.set_mode(Mode::Never)?;
//!     assert!(web_ctl.await_state(State::Down, Duration::from_secs(5)));
//!
//!     container.shutdown();
//!     container.await_termination(Duration::from_secs(5))?;
//!     Ok(())
//! }
//! ```
mod container;
mod controller;
mod error;
mod executor;
mod listeners;
mod name;
mod service;
mod value;

// ---- Public re-exports ----

pub use container::{
    is_shutting_down, shutdown_all, shutdown_on_signal, ContainerBuilder, ContainerConfig,
    ServiceBuilder, ServiceContainer,
};
pub use controller::{ControllerSnapshot, Mode, ServiceController, ServiceHandle, State};
pub use error::{
    InstallError, NameError, ParseError, RejectedError, RuntimeError, StartError, StateError,
    ValueError,
};
pub use executor::{DirectExecutor, Executor, ExecutorRef, Job, TokioExecutor, WorkerExecutor};
pub use listeners::{ListenerRef, ListenerSet, ServiceListener, Transition};
pub use name::ServiceName;
pub use service::{NullService, Service, ServiceFn, ServiceRef, StartContext, StopContext};
pub use value::{
    ComposedValue, ImmediateValue, InjectedValue, Injector, InjectorRef, SetterInjector, Value,
    ValueRef,
};

// Optional: built-in listener that logs every transition.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use listeners::LogListener;
