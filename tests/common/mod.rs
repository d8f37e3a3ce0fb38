//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use servicevisor::{
    ContainerConfig, DirectExecutor, Mode, Service, ServiceContainer, ServiceController,
    ServiceHandle, ServiceListener, ServiceName, StartContext, StartError, State, StopContext,
};

pub const WAIT: Duration = Duration::from_secs(10);

/// Dotted name helper: `name("app.db")`.
pub fn name(dotted: &str) -> ServiceName {
    ServiceName::of(dotted.split('.')).unwrap()
}

/// Container whose jobs run inline; every call returns with the graph settled.
pub fn direct_container() -> ServiceContainer {
    ServiceContainer::builder(ContainerConfig::default().with_name("test"))
        .with_executor(Arc::new(DirectExecutor))
        .build()
}

/// Shared, ordered record of service activity ("start:a", "stop:a").
#[derive(Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn push(&self, entry: String) {
        self.entries.lock().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

/// Service that journals its starts/stops and can be told to fail.
pub struct TrackedService {
    label: String,
    journal: Journal,
    fail: AtomicBool,
    running: AtomicBool,
    starts: AtomicUsize,
    stops: AtomicUsize,
    /// Dependencies that must be running whenever this service starts.
    requires: Mutex<Vec<Arc<TrackedService>>>,
    violations: AtomicUsize,
}

impl TrackedService {
    pub fn new(label: &str, journal: &Journal) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_string(),
            journal: journal.clone(),
            fail: AtomicBool::new(false),
            running: AtomicBool::new(false),
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            requires: Mutex::new(Vec::new()),
            violations: AtomicUsize::new(0),
        })
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn requires(&self, dependency: &Arc<TrackedService>) {
        self.requires.lock().push(Arc::clone(dependency));
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn violations(&self) -> usize {
        self.violations.load(Ordering::SeqCst)
    }
}

impl Service for TrackedService {
    fn start(&self, _ctx: &StartContext) -> Result<(), StartError> {
        if self.fail.load(Ordering::SeqCst) {
            self.journal.push(format!("fail:{}", self.label));
            return Err(StartError::failed(format!("{} refused to start", self.label)));
        }
        if self.requires.lock().iter().any(|d| !d.is_running()) {
            self.violations.fetch_add(1, Ordering::SeqCst);
        }
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.journal.push(format!("start:{}", self.label));
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self, _ctx: &StopContext) {
        self.running.store(false, Ordering::SeqCst);
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.journal.push(format!("stop:{}", self.label));
    }
}

/// Installs `service` as `label` with dependencies named by `deps`.
pub fn install(
    container: &ServiceContainer,
    label: &str,
    deps: &[&str],
    mode: Mode,
    service: &Arc<TrackedService>,
) -> ServiceController<Arc<TrackedService>> {
    container
        .build_service_instance(name(label), Arc::clone(service))
        .add_dependencies(deps.iter().map(|d| name(d)))
        .set_initial_mode(mode)
        .create()
        .unwrap()
}

/// Listener that records `(service, transition)` pairs and lets tests wait for them.
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<(String, String)>>,
    grew: Condvar,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn record(&self, c: &ServiceHandle, what: &str) {
        let mut events = self.events.lock();
        events.push((c.display_name().to_string(), what.to_string()));
        self.grew.notify_all();
    }

    pub fn events(&self) -> Vec<(String, String)> {
        self.events.lock().clone()
    }

    /// Transitions recorded for one service.
    pub fn of(&self, service: &str) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter(|(s, _)| s == service)
            .map(|(_, t)| t.clone())
            .collect()
    }

    /// Waits until at least `n` events were recorded.
    pub fn wait_for(&self, n: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut events = self.events.lock();
        while events.len() < n {
            if self.grew.wait_until(&mut events, deadline).timed_out() {
                return events.len() >= n;
            }
        }
        true
    }
}

impl ServiceListener for Recorder {
    fn starting(&self, c: &ServiceHandle) {
        self.record(c, "starting");
    }
    fn started(&self, c: &ServiceHandle) {
        self.record(c, "started");
    }
    fn failed(&self, c: &ServiceHandle, _error: &StartError) {
        self.record(c, "failed");
    }
    fn stopping(&self, c: &ServiceHandle) {
        self.record(c, "stopping");
    }
    fn stopped(&self, c: &ServiceHandle) {
        self.record(c, "stopped");
    }
    fn removed(&self, c: &ServiceHandle) {
        self.record(c, "removed");
    }
}

/// True if `transitions` is a legal walk of the lifecycle from `DOWN`.
pub fn well_formed(transitions: &[String]) -> bool {
    let mut state = "down";
    for t in transitions {
        state = match (state, t.as_str()) {
            ("down", "starting") => "starting",
            ("down", "removed") => "removed",
            ("starting", "started") => "up",
            ("starting", "failed") => "down",
            ("up", "stopping") => "stopping",
            ("stopping", "stopped") => "down",
            _ => return false,
        };
    }
    true
}

/// Installs a tracing subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Checks every installed service's counters against its neighbours' states,
/// and that dependency and dependent edges mirror each other.
///
/// Only meaningful while no transition is in flight.
pub fn graph_invariants(container: &ServiceContainer) -> Result<(), String> {
    let root = container.root();
    let services: Vec<ServiceHandle> = container
        .service_names()
        .iter()
        .filter_map(|n| container.service(n))
        .collect();

    for service in &services {
        let me = service.display_name();
        let snapshot = service.snapshot();

        // The root counts as a dependency; forward references are never UP.
        let mut not_up = usize::from(root.state() != State::Up);
        for dep in service.dependencies() {
            match container.service(&dep) {
                Some(parent) => {
                    if parent.state() != State::Up {
                        not_up += 1;
                    }
                    if !parent.dependents().contains(&me) {
                        return Err(format!("{dep} does not list {me} as a dependent"));
                    }
                }
                None => not_up += 1,
            }
        }
        if snapshot.unstarted_dependencies != not_up {
            return Err(format!(
                "{me}: unstarted_dependencies = {}, expected {not_up}",
                snapshot.unstarted_dependencies
            ));
        }

        let dependents = service.dependents();
        let mut running = 0;
        for child in &dependents {
            let Some(child_handle) = container.service(child) else {
                return Err(format!("{me} lists {child}, which is not installed"));
            };
            if !child_handle.dependencies().contains(&me) {
                return Err(format!("{child} does not list {me} as a dependency"));
            }
            if child_handle.state().is_running() {
                running += 1;
            }
        }
        if snapshot.running_dependents != running {
            return Err(format!(
                "{me}: running_dependents = {}, expected {running}",
                snapshot.running_dependents
            ));
        }
        if snapshot.dependents != dependents.len() {
            return Err(format!("{me}: dependents = {}", snapshot.dependents));
        }
    }

    let running = services.iter().filter(|s| s.state().is_running()).count();
    let root_snapshot = root.snapshot();
    if root_snapshot.running_dependents != running {
        return Err(format!(
            "root: running_dependents = {}, expected {running}",
            root_snapshot.running_dependents
        ));
    }
    if root_snapshot.dependents != services.len() {
        return Err(format!("root: dependents = {}", root_snapshot.dependents));
    }
    Ok(())
}

/// Retries `check` until it passes or `timeout` elapses; returns the last result.
pub fn eventually<F>(timeout: Duration, mut check: F) -> Result<(), String>
where
    F: FnMut() -> Result<(), String>,
{
    let deadline = Instant::now() + timeout;
    loop {
        let result = check();
        if result.is_ok() || Instant::now() >= deadline {
            return result;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
}
