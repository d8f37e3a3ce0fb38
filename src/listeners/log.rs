//! # LogListener: mirror transitions into `tracing`.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO servicevisor: transition service=app.db transition=starting
//! INFO servicevisor: transition service=app.db transition=started
//! WARN servicevisor: transition service=app.web transition=failed error="start failed: port in use"
//! ```

use crate::controller::ServiceHandle;
use crate::error::StartError;
use crate::listeners::ServiceListener;

/// Logs every transition it observes; failures at `warn`, the rest at `info`.
///
/// Enabled via the `logging` feature.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogListener;

impl ServiceListener for LogListener {
    fn starting(&self, c: &ServiceHandle) {
        tracing::info!(service = %c.display_name(), transition = "starting", "transition");
    }

    fn started(&self, c: &ServiceHandle) {
        tracing::info!(service = %c.display_name(), transition = "started", "transition");
    }

    fn failed(&self, c: &ServiceHandle, error: &StartError) {
        tracing::warn!(
            service = %c.display_name(),
            transition = "failed",
            error = %error,
            label = error.as_label(),
            "transition"
        );
    }

    fn stopping(&self, c: &ServiceHandle) {
        tracing::info!(service = %c.display_name(), transition = "stopping", "transition");
    }

    fn stopped(&self, c: &ServiceHandle) {
        tracing::info!(service = %c.display_name(), transition = "stopped", "transition");
    }

    fn removed(&self, c: &ServiceHandle) {
        tracing::info!(service = %c.display_name(), transition = "removed", "transition");
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
