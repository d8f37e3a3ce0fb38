//! Error types used by the service container.
//!
//! This module defines the error enums surfaced to callers:
//!
//! - [`StartError`]: a service failed to start (recorded, never propagated).
//! - [`InstallError`]: a service could not be installed into a container.
//! - [`StateError`]: an operation is not permitted in the current state.
//! - [`ValueError`]: a deferred value could not be produced or injected.
//! - [`NameError`]: a service name could not be constructed.
//! - [`RejectedError`]: an executor refused a unit of work.
//! - [`ParseError`]: unknown mode or state name.
//! - [`RuntimeError`]: process-wide shutdown did not finish in time.
//!
//! The error enums provide `as_label` for logs/metrics.

use std::time::Duration;

use thiserror::Error;

use crate::name::ServiceName;

/// # Errors produced while starting a service.
///
/// A start error moves the controller into `START_FAILED`; it is stored on the
/// controller and handed to listeners, never returned through state-machine calls.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum StartError {
    /// The service reported a failure from `start` or through its context.
    #[error("start failed: {message}")]
    Failed {
        /// Human-readable failure message.
        message: String,
    },

    /// A value required at start time (service instance or injection source) failed.
    #[error("value resolution failed: {0}")]
    Value(#[from] ValueError),

    /// The service panicked inside `start`.
    #[error("start panicked: {info}")]
    Panicked {
        /// Panic payload rendered as text.
        info: String,
    },

    /// The executor refused to run the start job.
    #[error("start job rejected by executor: {0}")]
    Rejected(#[from] RejectedError),
}

impl StartError {
    /// Convenience constructor for [`StartError::Failed`].
    ///
    /// # Example
    /// ```
    /// use servicevisor::StartError;
    ///
    /// let err = StartError::failed("port 8080 in use");
    /// assert_eq!(err.as_label(), "start_failed");
    /// assert!(err.to_string().contains("port 8080"));
    /// ```
    pub fn failed(message: impl Into<String>) -> Self {
        StartError::Failed {
            message: message.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            StartError::Failed { .. } => "start_failed",
            StartError::Value(_) => "start_value_failed",
            StartError::Panicked { .. } => "start_panicked",
            StartError::Rejected(_) => "start_rejected",
        }
    }
}

/// # Errors produced while installing a service.
///
/// Install failures are reported synchronously by `ServiceBuilder::create` and
/// leave the container unmodified.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstallError {
    /// A service with the same name is already installed.
    #[error("duplicate service: {name}")]
    DuplicateService {
        /// The conflicting name.
        name: ServiceName,
    },

    /// The new edges would close a dependency cycle.
    #[error("circular dependency: {}", render_path(.path))]
    CircularDependency {
        /// The cycle, starting and ending at the service being installed.
        path: Vec<ServiceName>,
    },

    /// A named dependency is not installed (forward references disabled),
    /// or it is being removed.
    #[error("missing dependency {dependency} of {name}")]
    MissingDependency {
        /// Service being installed.
        name: ServiceName,
        /// The unresolved dependency.
        dependency: ServiceName,
    },

    /// A dependency controller belongs to a different container.
    #[error("dependency {dependency} belongs to another container")]
    ForeignController {
        /// Name of the foreign controller.
        dependency: ServiceName,
    },
}

impl InstallError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            InstallError::DuplicateService { .. } => "install_duplicate",
            InstallError::CircularDependency { .. } => "install_cycle",
            InstallError::MissingDependency { .. } => "install_missing_dependency",
            InstallError::ForeignController { .. } => "install_foreign_controller",
        }
    }
}

fn render_path(path: &[ServiceName]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// # Operations not permitted in the controller's current state.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// Removal requested while other services still depend on this one.
    #[error("service {name} still has {dependents} dependent(s)")]
    HasDependents {
        /// Service that was asked to be removed.
        name: ServiceName,
        /// Number of installed dependents.
        dependents: usize,
    },

    /// Retry requested for a service that is not in `START_FAILED`.
    #[error("service {name} has not failed")]
    NotFailed {
        /// Service that was asked to retry.
        name: ServiceName,
    },

    /// The service has already been removed.
    #[error("service {name} was removed")]
    Removed {
        /// The removed service.
        name: ServiceName,
    },

    /// Removal requested for a container's root; use `shutdown` instead.
    #[error("the container root cannot be removed")]
    RootRemoval,
}

impl StateError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            StateError::HasDependents { .. } => "state_has_dependents",
            StateError::NotFailed { .. } => "state_not_failed",
            StateError::Removed { .. } => "state_removed",
            StateError::RootRemoval => "state_root_removal",
        }
    }
}

/// # Errors produced by deferred values and injectors.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// An injection slot was read before anything was injected into it.
    #[error("value not injected yet")]
    Uninjected,

    /// A producer or setter failed.
    #[error("{0}")]
    Failed(String),
}

impl ValueError {
    /// Convenience constructor for [`ValueError::Failed`].
    pub fn failed(message: impl Into<String>) -> Self {
        ValueError::Failed(message.into())
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ValueError::Uninjected => "value_uninjected",
            ValueError::Failed(_) => "value_failed",
        }
    }
}

/// # Errors produced while building a [`ServiceName`].
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    /// No segments were supplied.
    #[error("at least one name segment is required")]
    NoSegments,

    /// A segment was the empty string.
    #[error("name segments must not be empty")]
    EmptySegment,
}

/// Returned when parsing a [`Mode`](crate::Mode) or [`State`](crate::State) from text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind}: {value:?}")]
pub struct ParseError {
    /// What was being parsed (`"mode"` or `"state"`).
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

/// Returned by an [`Executor`](crate::Executor) that refuses a job.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("executor {executor} rejected job: {reason}")]
pub struct RejectedError {
    /// Executor name.
    pub executor: &'static str,
    /// Why the job was refused.
    pub reason: String,
}

impl RejectedError {
    /// Creates a rejection for the given executor.
    pub fn new(executor: &'static str, reason: impl Into<String>) -> Self {
        Self {
            executor,
            reason: reason.into(),
        }
    }
}

/// # Errors produced by container-wide shutdown.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Grace period elapsed while some root controllers were still not `DOWN`.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Names of services that had not reached `DOWN` in time.
        stuck: Vec<String>,
    },

    /// Installing the OS signal handlers failed.
    #[error("signal handler setup failed: {0}")]
    Signal(#[from] std::io::Error),

    /// The blocking shutdown task died before reporting.
    #[error("shutdown task aborted: {reason}")]
    Aborted {
        /// Join failure rendered as text.
        reason: String,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use servicevisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::Signal(_) => "runtime_signal_failed",
            RuntimeError::Aborted { .. } => "runtime_aborted",
        }
    }
}
