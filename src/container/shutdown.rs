//! # Process-wide shutdown.
//!
//! Every container registers itself in a process-wide list when built.
//! [`shutdown_all`] flips that list to "down", sets every root to `NEVER`, and
//! waits for the roots to reach `DOWN`. Containers built afterwards start with
//! their root in `NEVER`, so nothing new comes up.
//!
//! ```text
//! shutdown_on_signal ── SIGINT / SIGTERM / SIGQUIT / Ctrl-C ──► shutdown_all(grace)
//!                                                                  ├─ down = true
//!                                                                  ├─ root.set_mode(NEVER) for each container
//!                                                                  └─ await root DOWN (shared deadline)
//!                                                                        ├─ all DOWN → Ok
//!                                                                        └─ else → RuntimeError::GraceExceeded { stuck }
//! ```

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::container::container::ContainerInner;
use crate::controller::State;
use crate::error::RuntimeError;

struct ProcessState {
    down: bool,
    containers: Vec<Weak<ContainerInner>>,
}

static PROCESS: Mutex<ProcessState> = parking_lot::const_mutex(ProcessState {
    down: false,
    containers: Vec::new(),
});

/// Adds a container to the process list. Returns true if the process is already down.
pub(crate) fn register(container: &Arc<ContainerInner>) -> bool {
    let mut process = PROCESS.lock();
    if process.down {
        return true;
    }
    process.containers.retain(|c| c.strong_count() > 0);
    process.containers.push(Arc::downgrade(container));
    false
}

/// True once [`shutdown_all`] has been called in this process.
pub fn is_shutting_down() -> bool {
    PROCESS.lock().down
}

/// Shuts down every live container and waits up to `grace` for all of them.
///
/// Blocks the calling thread. Idempotent: later calls find no registered
/// containers and return `Ok(())`.
///
/// # Errors
/// [`RuntimeError::GraceExceeded`] with the names of services still not `DOWN`.
pub fn shutdown_all(grace: Duration) -> Result<(), RuntimeError> {
    let containers: Vec<Arc<ContainerInner>> = {
        let mut process = PROCESS.lock();
        process.down = true;
        process.containers.drain(..).filter_map(|c| c.upgrade()).collect()
    };
    tracing::info!(containers = containers.len(), grace = ?grace, "process shutdown requested");

    for container in &containers {
        container.shutdown();
    }

    let deadline = Instant::now().checked_add(grace);
    let mut stuck = Vec::new();
    for container in &containers {
        let remaining = deadline.map_or(grace, |d| d.saturating_duration_since(Instant::now()));
        if !container.root().await_state(State::Down, remaining) {
            stuck.extend(container.active_services());
        }
    }

    if stuck.is_empty() {
        tracing::info!("all containers stopped within grace");
        Ok(())
    } else {
        tracing::warn!(stuck = ?stuck, "shutdown grace exceeded");
        Err(RuntimeError::GraceExceeded { grace, stuck })
    }
}

/// Waits for a termination signal, then runs [`shutdown_all`] on the blocking pool.
///
/// Returns `Ok(false)` if `cancel` fires first, `Ok(true)` after a completed shutdown.
///
/// # Example
/// ```no_run
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<(), servicevisor::RuntimeError> {
///     let container = servicevisor::ServiceContainer::new();
///     // ... install services ...
///     servicevisor::shutdown_on_signal(Duration::from_secs(30), CancellationToken::new()).await?;
///     drop(container);
///     Ok(())
/// }
/// ```
pub async fn shutdown_on_signal(
    grace: Duration,
    cancel: CancellationToken,
) -> Result<bool, RuntimeError> {
    tokio::select! {
        signal = wait_for_shutdown_signal() => signal?,
        _ = cancel.cancelled() => return Ok(false),
    }
    tracing::info!("shutdown signal received");
    match tokio::task::spawn_blocking(move || shutdown_all(grace)).await {
        Ok(result) => result.map(|()| true),
        Err(e) => Err(RuntimeError::Aborted {
            reason: e.to_string(),
        }),
    }
}

/// Completes on SIGINT, SIGTERM, SIGQUIT or Ctrl-C.
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

/// Completes on Ctrl-C.
#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
