//! Listener delivery: order, dedupe, panic isolation, re-entrancy.

mod common;

use std::sync::{Arc, OnceLock};

use common::{direct_container, install, name, Journal, TrackedService, Recorder};
use servicevisor::{ListenerRef, Mode, ServiceHandle, ServiceListener, State};

#[test]
fn test_full_lifecycle_in_order() {
    let journal = Journal::default();
    let container = direct_container();
    let recorder = Recorder::new();
    let a = TrackedService::new("a", &journal);

    let ca = container
        .build_service_instance(name("a"), Arc::clone(&a))
        .add_listener(recorder.clone() as ListenerRef)
        .create()
        .unwrap();
    ca.set_mode(Mode::Never).unwrap();
    ca.remove().unwrap();

    assert_eq!(
        recorder.of("a"),
        vec!["starting", "started", "stopping", "stopped", "removed"]
    );
    assert!(common::well_formed(&recorder.of("a")));
}

#[test]
fn test_same_listener_is_registered_once() {
    let container = direct_container();
    let recorder = Recorder::new();
    let listener: ListenerRef = recorder.clone();
    let journal = Journal::default();
    let a = TrackedService::new("a", &journal);

    let ca = container
        .build_service_instance(name("a"), Arc::clone(&a))
        .add_listeners([listener.clone(), listener.clone()])
        .set_initial_mode(Mode::Never)
        .create()
        .unwrap();
    assert!(!ca.add_listener(listener.clone()));
    assert_eq!(ca.snapshot().listeners, 1);

    ca.set_mode(Mode::Automatic).unwrap();
    assert_eq!(recorder.of("a"), vec!["starting", "started"]);

    assert!(ca.remove_listener(&listener));
    assert!(!ca.remove_listener(&listener));
    ca.set_mode(Mode::Never).unwrap();
    assert_eq!(recorder.events().len(), 2);
}

#[test]
fn test_late_listener_sees_later_transitions_only() {
    let journal = Journal::default();
    let container = direct_container();
    let a = TrackedService::new("a", &journal);
    let ca = install(&container, "a", &[], Mode::Automatic, &a);

    let recorder = Recorder::new();
    ca.add_listener(recorder.clone());
    ca.set_mode(Mode::Never).unwrap();
    assert_eq!(recorder.of("a"), vec!["stopping", "stopped"]);
}

struct Exploding;

impl ServiceListener for Exploding {
    fn started(&self, _controller: &ServiceHandle) {
        panic!("listener exploded");
    }
}

#[test]
fn test_panicking_listener_does_not_affect_others() {
    let journal = Journal::default();
    let container = direct_container();
    let recorder = Recorder::new();
    let a = TrackedService::new("a", &journal);

    let ca = container
        .build_service_instance(name("a"), Arc::clone(&a))
        .add_listener(Arc::new(Exploding))
        .add_listener(recorder.clone())
        .create()
        .unwrap();

    assert_eq!(ca.state(), State::Up);
    assert_eq!(recorder.of("a"), vec!["starting", "started"]);
    ca.set_mode(Mode::Never).unwrap();
    assert_eq!(ca.state(), State::Down);
    assert_eq!(recorder.of("a").len(), 4);
}

/// Removes itself the first time it hears about a start.
#[derive(Default)]
struct OneShot {
    me: OnceLock<ListenerRef>,
    heard: parking_lot::Mutex<Vec<&'static str>>,
}

impl ServiceListener for OneShot {
    fn starting(&self, _controller: &ServiceHandle) {
        self.heard.lock().push("starting");
    }

    fn started(&self, controller: &ServiceHandle) {
        self.heard.lock().push("started");
        if let Some(me) = self.me.get() {
            controller.remove_listener(me);
        }
    }

    fn stopping(&self, _controller: &ServiceHandle) {
        self.heard.lock().push("stopping");
    }
}

#[test]
fn test_listener_can_remove_itself() {
    let journal = Journal::default();
    let container = direct_container();
    let a = TrackedService::new("a", &journal);
    let one_shot = Arc::new(OneShot::default());
    let as_ref: ListenerRef = one_shot.clone();
    let _ = one_shot.me.set(as_ref.clone());

    let ca = container
        .build_service_instance(name("a"), Arc::clone(&a))
        .add_listener(as_ref)
        .create()
        .unwrap();
    ca.set_mode(Mode::Never).unwrap();

    assert_eq!(*one_shot.heard.lock(), vec!["starting", "started"]);
    assert_eq!(ca.snapshot().listeners, 0);
}

/// Turns the service off as soon as it comes up.
struct Bouncer;

impl ServiceListener for Bouncer {
    fn started(&self, controller: &ServiceHandle) {
        controller.set_mode(Mode::Never).unwrap();
    }
}

#[test]
fn test_listener_may_change_mode_from_callback() {
    let journal = Journal::default();
    let container = direct_container();
    let recorder = Recorder::new();
    let a = TrackedService::new("a", &journal);

    let ca = container
        .build_service_instance(name("a"), Arc::clone(&a))
        .add_listener(Arc::new(Bouncer))
        .add_listener(recorder.clone())
        .create()
        .unwrap();

    assert_eq!(ca.state(), State::Down);
    assert_eq!(ca.mode(), Mode::Never);
    assert_eq!(
        recorder.of("a"),
        vec!["starting", "started", "stopping", "stopped"]
    );
    assert_eq!(journal.entries(), vec!["start:a", "stop:a"]);
}

#[test]
fn test_failure_reaches_listener_with_error() {
    #[derive(Default)]
    struct Errors(parking_lot::Mutex<Vec<String>>);
    impl ServiceListener for Errors {
        fn failed(&self, _controller: &ServiceHandle, error: &servicevisor::StartError) {
            self.0.lock().push(error.to_string());
        }
    }

    let journal = Journal::default();
    let container = direct_container();
    let a = TrackedService::new("a", &journal);
    a.set_failing(true);
    let errors = Arc::new(Errors::default());

    container
        .build_service_instance(name("a"), Arc::clone(&a))
        .add_listener(errors.clone())
        .create()
        .unwrap();
    assert_eq!(*errors.0.lock(), vec!["start failed: a refused to start"]);
}
