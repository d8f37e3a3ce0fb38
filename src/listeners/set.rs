//! # ListenerSet: identity-deduplicated listener registry.
//!
//! Each controller owns one [`ListenerSet`]. Delivery works on a snapshot taken
//! when the notification is dispatched, so listeners may add or remove
//! themselves from inside a callback.
//!
//! ```text
//! transition ─► queue (under controller lock)
//!                   │
//!            drainer job on executor
//!                   │  snapshot()
//!                   ├──► L1::on_transition  (panic caught)
//!                   ├──► L2::on_transition
//!                   └──► LN::on_transition
//! ```

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::controller::ServiceHandle;
use crate::executor::panic_message;
use crate::listeners::{ListenerRef, Transition};

/// Listeners of one controller, deduplicated by pointer identity.
#[derive(Default, Clone)]
pub struct ListenerSet {
    listeners: Vec<ListenerRef>,
}

impl ListenerSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `listener`; returns false if that same instance is already present.
    pub fn add(&mut self, listener: ListenerRef) -> bool {
        if self.contains(&listener) {
            return false;
        }
        self.listeners.push(listener);
        true
    }

    /// Removes `listener`; returns false if it was not present.
    pub fn remove(&mut self, listener: &ListenerRef) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| !same(l, listener));
        self.listeners.len() != before
    }

    /// True if this exact instance is registered.
    pub fn contains(&self, listener: &ListenerRef) -> bool {
        self.listeners.iter().any(|l| same(l, listener))
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Current listeners, in registration order.
    pub fn snapshot(&self) -> Vec<ListenerRef> {
        self.listeners.clone()
    }

    /// Delivers `transition` to each of `listeners`, isolating panics.
    pub(crate) fn deliver(
        listeners: &[ListenerRef],
        controller: &ServiceHandle,
        transition: &Transition,
    ) {
        for listener in listeners {
            let call = AssertUnwindSafe(|| listener.on_transition(controller, transition));
            if let Err(payload) = catch_unwind(call) {
                tracing::error!(
                    listener = listener.name(),
                    service = %controller.display_name(),
                    transition = transition.as_label(),
                    panic = %panic_message(payload.as_ref()),
                    "listener panicked"
                );
            }
        }
    }
}

/// Identity comparison that ignores vtable pointers.
fn same(a: &ListenerRef, b: &ListenerRef) -> bool {
    Arc::as_ptr(a).cast::<()>() == Arc::as_ptr(b).cast::<()>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listeners::ServiceListener;

    struct Quiet;
    impl ServiceListener for Quiet {}

    #[test]
    fn same_instance_is_added_once() {
        let l: ListenerRef = Arc::new(Quiet);
        let mut set = ListenerSet::new();
        assert!(set.add(l.clone()));
        assert!(!set.add(l.clone()));
        assert_eq!(set.len(), 1);

        let other: ListenerRef = Arc::new(Quiet);
        assert!(set.add(other.clone()));
        assert_eq!(set.len(), 2);

        assert!(set.remove(&l));
        assert!(!set.remove(&l));
        assert!(set.contains(&other));
    }

    #[test]
    fn snapshot_is_detached() {
        let mut set = ListenerSet::new();
        set.add(Arc::new(Quiet));
        let snap = set.snapshot();
        set.add(Arc::new(Quiet));
        assert_eq!(snap.len(), 1);
        assert_eq!(set.len(), 2);
    }
}
