//! Multi-threaded scenarios on the default worker executor.

mod common;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use common::{
    eventually, graph_invariants, init_tracing, name, well_formed, Journal, Recorder, TrackedService,
    WAIT,
};
use servicevisor::{
    ContainerConfig, ListenerRef, Mode, ServiceContainer, ServiceController, ServiceFn,
    StartContext, StartError, State, StopContext,
};

fn worker_container(label: &str) -> ServiceContainer {
    ServiceContainer::builder(ContainerConfig::default().with_name(label)).build()
}

/// Tiny deterministic generator; good enough to scatter mode flips.
struct XorShift(u64);

impl XorShift {
    fn next(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next() % n as u64) as usize
    }
}

#[test]
fn test_concurrent_mode_flips_keep_dependency_order() {
    init_tracing();
    let journal = Journal::default();
    let container = worker_container("flips");
    let recorder = Recorder::new();

    // a <- b <- c, a <- d, (c, d) <- e
    let labels = ["a", "b", "c", "d", "e"];
    let deps: [&[&str]; 5] = [&[], &["a"], &["b"], &["a"], &["c", "d"]];
    let tracked_services: Vec<Arc<TrackedService>> = labels
        .iter()
        .map(|l| TrackedService::new(l, &journal))
        .collect();
    for (i, ds) in deps.iter().enumerate() {
        for d in ds.iter() {
            let j = labels.iter().position(|l| l == d).unwrap();
            tracked_services[i].requires(&tracked_services[j]);
        }
    }
    let controllers: Vec<ServiceController<Arc<TrackedService>>> = labels
        .iter()
        .zip(deps.iter())
        .zip(tracked_services.iter())
        .map(|((l, ds), p)| {
            container
                .build_service_instance(name(l), Arc::clone(p))
                .add_dependencies(ds.iter().map(|d| name(d)))
                .add_listener(recorder.clone() as ListenerRef)
                .create()
                .unwrap()
        })
        .collect();

    let handles: Vec<_> = (0..4u64)
        .map(|t| {
            let targets: Vec<_> = controllers.iter().map(|c| c.handle().clone()).collect();
            thread::spawn(move || {
                let mut rng = XorShift(0x9E37_79B9_7F4A_7C15 ^ (t + 1));
                for _ in 0..200 {
                    let target = &targets[rng.below(targets.len())];
                    let mode = Mode::ALL[rng.below(Mode::ALL.len())];
                    target.set_mode(mode).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    for c in &controllers {
        c.set_mode(Mode::Automatic).unwrap();
    }
    for c in &controllers {
        assert!(
            c.await_state(State::Up, WAIT),
            "{} did not come up",
            c.service_name()
        );
    }
    for p in &tracked_services {
        assert_eq!(p.violations(), 0);
    }
    eventually(WAIT, || graph_invariants(&container)).unwrap();

    // Leaf off: only it goes down.
    let leaf = &controllers[4];
    leaf.set_mode(Mode::Never).unwrap();
    assert!(leaf.await_state(State::Down, WAIT));
    for c in &controllers[..4] {
        assert_eq!(c.state(), State::Up, "{}", c.service_name());
    }
    eventually(WAIT, || graph_invariants(&container)).unwrap();
    assert_eq!(controllers[2].snapshot().running_dependents, 0);
    assert_eq!(controllers[0].snapshot().running_dependents, 2);

    container.shutdown();
    container.await_termination(WAIT).unwrap();
    for c in &controllers {
        assert_eq!(c.state(), State::Down);
    }
    eventually(WAIT, || graph_invariants(&container)).unwrap();
    for l in labels {
        let seq = recorder.of(l);
        assert!(well_formed(&seq), "{l}: {seq:?}");
    }
}

#[test]
fn test_concurrent_installs_with_forward_references() {
    let container = worker_container("installs");
    let threads = 6;
    let chain = 15;

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let container = container.clone();
            thread::spawn(move || {
                // Installed leaf first, so every dependency starts out as a forward reference.
                for i in (0..chain).rev() {
                    let mut builder = container.build_service_instance(
                        name(&format!("chain{t}.s{i}")),
                        ServiceFn::start_only(|_ctx: &StartContext| Ok(())),
                    );
                    if i > 0 {
                        builder = builder.add_dependency(name(&format!("chain{t}.s{}", i - 1)));
                    }
                    builder.create().unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let names = container.service_names();
    assert_eq!(names.len(), threads * chain);
    for n in &names {
        let handle = container.service(n).unwrap();
        assert!(handle.await_state(State::Up, WAIT), "{n} did not come up");
    }
    assert_eq!(container.root().snapshot().running_dependents, threads * chain);
    eventually(WAIT, || graph_invariants(&container)).unwrap();

    container.shutdown();
    container.await_termination(WAIT).unwrap();
}

#[test]
fn test_async_completion_from_other_threads() {
    let container = worker_container("async");
    let start = |ctx: &StartContext| -> Result<(), StartError> {
        ctx.asynchronous();
        let ctx = ctx.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            ctx.complete();
        });
        Ok(())
    };
    let stop = |ctx: &StopContext| {
        ctx.asynchronous();
        let ctx = ctx.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            ctx.complete();
        });
    };

    let db = container
        .build_service_instance(name("db"), ServiceFn::arc(start, stop))
        .create()
        .unwrap();
    let web = container
        .build_service_instance(name("web"), ServiceFn::arc(start, stop))
        .add_dependency(name("db"))
        .create()
        .unwrap();

    assert!(web.await_state(State::Up, WAIT));
    assert_eq!(db.state(), State::Up);

    db.set_mode(Mode::Never).unwrap();
    assert!(db.await_state(State::Down, WAIT));
    assert_eq!(web.state(), State::Down);
    assert_eq!(web.snapshot().stop_requests, 1);

    db.set_mode(Mode::Automatic).unwrap();
    assert!(web.await_state(State::Up, WAIT));

    container.shutdown();
    container.await_termination(WAIT).unwrap();
}

#[test]
fn test_retry_races_with_mode_changes() {
    let journal = Journal::default();
    let container = worker_container("retry");
    let a = TrackedService::new("a", &journal);
    a.set_failing(true);
    let ca = container
        .build_service_instance(name("a"), Arc::clone(&a))
        .create()
        .unwrap();
    assert!(ca.await_state(State::StartFailed, WAIT));

    a.set_failing(false);
    let flipper = {
        let handle = ca.handle().clone();
        thread::spawn(move || {
            for i in 0..100 {
                let mode = if i % 2 == 0 { Mode::Never } else { Mode::Automatic };
                handle.set_mode(mode).unwrap();
            }
        })
    };
    for _ in 0..100 {
        let _ = ca.retry();
    }
    flipper.join().unwrap();

    ca.set_mode(Mode::Automatic).unwrap();
    let _ = ca.retry();
    assert!(ca.await_state(State::Up, WAIT));

    container.shutdown();
    container.await_termination(WAIT).unwrap();
}
