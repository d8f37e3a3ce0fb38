//! # ControllerCore: the per-service state machine.
//!
//! Every controller re-derives its next step from its own counters whenever
//! something relevant changes ("evaluation"). Counters are kept up to date by
//! messages from neighbours:
//!
//! ```text
//!                 parent (dependency)
//!                   │  ▲
//!   down (locked):  │  │  up (no lock held):
//!   - dependency    │  │  - acquire / release running slot
//!     up / down     │  │  - demand on / off
//!   - stop request  │  │
//!     on / off      ▼  │
//!                 child (dependent)
//! ```
//!
//! ## Locking
//! - A controller may lock its children while holding its own lock; never the reverse.
//! - Upward messages are sent after the sender's lock is released and are
//!   serialized by the sender's single evaluator, so counts never go negative.
//! - User code (service start/stop, listeners, injections) never runs under a lock.
//!
//! ## Evaluation
//! `schedule()` marks the controller dirty. At most one thread evaluates a given
//! controller at a time; a schedule during evaluation makes the evaluator loop once
//! more. Follow-up evaluations of neighbours go through a per-thread worklist,
//! so propagation along long chains does not grow the stack.
//!
//! ## Wiring a new child
//! The child's `unstarted` and `stop_requests` counters start at the number of
//! dependencies. Each parent, while locked, records the child and reports its
//! current (`UP`, requesting-stop) flags; the child then discounts the parents
//! that are up and the parents that do not request a stop. Later flips are sent
//! as ±1 messages, so the counters converge regardless of interleaving.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::container::Registry;
use crate::controller::{Mode, ServiceHandle, State};
use crate::error::{RejectedError, StartError, StateError};
use crate::executor::{panic_message, ExecutorSlot, Job};
use crate::listeners::{ListenerRef, ListenerSet, Transition};
use crate::name::ServiceName;
use crate::service::{ServiceRef, StartContext, StopContext};
use crate::value::{Injection, ValueRef};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static WORKLIST: RefCell<Worklist> = RefCell::new(Worklist::default());
}

#[derive(Default)]
struct Worklist {
    draining: bool,
    queue: VecDeque<Arc<ControllerCore>>,
}

/// What a controller runs and what it needs; fixed at install.
pub(crate) struct Definition {
    pub(crate) service: ValueRef<ServiceRef>,
    /// Sorted by controller id; parents are always acquired in this order.
    pub(crate) dependencies: Vec<Arc<ControllerCore>>,
    pub(crate) injections: Vec<Box<dyn Injection>>,
}

/// Work a controller hands to its executor.
#[derive(Debug, Clone, Copy)]
enum JobKind {
    Start,
    Stop,
    Notify,
}

impl JobKind {
    fn as_str(self) -> &'static str {
        match self {
            JobKind::Start => "start",
            JobKind::Stop => "stop",
            JobKind::Notify => "notify",
        }
    }
}

// Lifecycle of a submitted job, shared between the submitter and the job.
const SUBMITTING: u8 = 0;
const ACCEPTED: u8 = 1;
const RAN: u8 = 2;
const DROPPED: u8 = 3;

/// Carried inside every submitted job.
///
/// A job dropped unrun while `execute` is still on the stack is reported by the
/// submitter; one dropped after the executor accepted it reports itself.
struct JobGuard {
    core: Arc<ControllerCore>,
    kind: JobKind,
    executor: &'static str,
    stage: Arc<AtomicU8>,
}

impl JobGuard {
    fn run(self) {
        self.stage.store(RAN, Ordering::Release);
        let core = Arc::clone(&self.core);
        match self.kind {
            JobKind::Start => core.run_start(),
            JobKind::Stop => core.run_stop(),
            JobKind::Notify => core.drain_notifications(),
        }
    }
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        let accepted = self
            .stage
            .compare_exchange(ACCEPTED, DROPPED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if accepted {
            self.core.job_lost(
                self.kind,
                RejectedError::new(self.executor, "job dropped without running"),
            );
        } else {
            let _ = self.stage.compare_exchange(
                SUBMITTING,
                DROPPED,
                Ordering::AcqRel,
                Ordering::Acquire,
            );
        }
    }
}

enum Outcome {
    Started,
    Failed(StartError),
    Stopped,
}

/// Side effects decided under the lock and carried out after it is released.
#[derive(Default)]
struct Effects {
    release_parents: bool,
    demand: Option<bool>,
    try_start: bool,
    stop: bool,
    unwire: bool,
    wake: Vec<Arc<ControllerCore>>,
}

struct Inner {
    mode: Mode,
    state: State,
    installed: bool,
    dependents: Vec<Weak<ControllerCore>>,
    listeners: ListenerSet,

    unstarted: usize,
    stop_requests: usize,
    running_dependents: usize,
    demand: usize,

    start_error: Option<StartError>,
    instance: Option<ServiceRef>,
    outcome: Option<Outcome>,
    remove_requested: bool,
    retry_requested: bool,

    requesting_stop: bool,
    demanding: bool,
    holding: bool,

    evaluating: bool,
    dirty: bool,
    notifications: VecDeque<Transition>,
    notifying: bool,
}

impl Inner {
    fn new() -> Self {
        Self {
            mode: Mode::Never,
            state: State::Down,
            installed: false,
            dependents: Vec::new(),
            listeners: ListenerSet::new(),
            unstarted: 0,
            stop_requests: 0,
            running_dependents: 0,
            demand: 0,
            start_error: None,
            instance: None,
            outcome: None,
            remove_requested: false,
            retry_requested: false,
            requesting_stop: false,
            demanding: false,
            holding: false,
            evaluating: false,
            dirty: false,
            notifications: VecDeque::new(),
            notifying: false,
        }
    }

    fn should_run(&self) -> bool {
        if !self.installed || self.remove_requested || self.stop_requests > 0 {
            return false;
        }
        match self.mode {
            Mode::Never => false,
            Mode::OnDemand => self.demand > 0,
            Mode::Automatic | Mode::Immediate => true,
        }
    }

    fn should_demand(&self) -> bool {
        if !self.installed || self.remove_requested {
            return false;
        }
        match self.mode {
            Mode::Immediate => true,
            Mode::OnDemand => self.demand > 0,
            Mode::Never | Mode::Automatic => false,
        }
    }

    fn live_dependents(&self) -> Vec<Arc<ControllerCore>> {
        self.dependents.iter().filter_map(Weak::upgrade).collect()
    }
}

/// Counters and flags of one controller at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSnapshot {
    /// Service name (`None` for the container root).
    pub name: Option<ServiceName>,
    pub mode: Mode,
    pub state: State,
    /// Dependencies not currently `UP`.
    pub unstarted_dependencies: usize,
    /// Dependencies currently asking this controller to stop.
    pub stop_requests: usize,
    /// Dependents currently `STARTING`, `UP` or `STOPPING`.
    pub running_dependents: usize,
    /// Dependents currently demanding this controller.
    pub demand: usize,
    /// Installed dependents.
    pub dependents: usize,
    pub listeners: usize,
    pub remove_requested: bool,
}

/// Shared, non-generic state of one installed service (or of the root).
pub(crate) struct ControllerCore {
    id: u64,
    name: Option<ServiceName>,
    definition: OnceLock<Definition>,
    executor: Arc<ExecutorSlot>,
    registry: Weak<Registry>,
    inner: Mutex<Inner>,
    changed: Condvar,
}

impl ControllerCore {
    pub(crate) fn new(
        name: Option<ServiceName>,
        executor: Arc<ExecutorSlot>,
        registry: Weak<Registry>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            name,
            definition: OnceLock::new(),
            executor,
            registry,
            inner: Mutex::new(Inner::new()),
            changed: Condvar::new(),
        })
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn name(&self) -> Option<&ServiceName> {
        self.name.as_ref()
    }

    /// Name for logs and errors; the root renders as `svc`.
    pub(crate) fn display_name(&self) -> ServiceName {
        self.name.clone().unwrap_or_else(ServiceName::root)
    }

    /// A placeholder stands in for a forward-referenced service not yet installed.
    pub(crate) fn is_placeholder(&self) -> bool {
        self.definition.get().is_none()
    }

    pub(crate) fn belongs_to(&self, registry: &Weak<Registry>) -> bool {
        Weak::ptr_eq(&self.registry, registry)
    }

    pub(crate) fn dependencies(&self) -> &[Arc<ControllerCore>] {
        self.definition
            .get()
            .map(|d| d.dependencies.as_slice())
            .unwrap_or(&[])
    }

    pub(crate) fn dependents(&self) -> Vec<Arc<ControllerCore>> {
        self.inner.lock().live_dependents()
    }

    pub(crate) fn mode(&self) -> Mode {
        self.inner.lock().mode
    }

    pub(crate) fn state(&self) -> State {
        self.inner.lock().state
    }

    pub(crate) fn start_error(&self) -> Option<StartError> {
        self.inner.lock().start_error.clone()
    }

    pub(crate) fn snapshot(&self) -> ControllerSnapshot {
        let inner = self.inner.lock();
        ControllerSnapshot {
            name: self.name.clone(),
            mode: inner.mode,
            state: inner.state,
            unstarted_dependencies: inner.unstarted,
            stop_requests: inner.stop_requests,
            running_dependents: inner.running_dependents,
            demand: inner.demand,
            dependents: inner.live_dependents().len(),
            listeners: inner.listeners.len(),
            remove_requested: inner.remove_requested,
        }
    }

    // ---- install ------------------------------------------------------------

    /// Resets the dependency counters before wiring `count` parents.
    pub(crate) fn prepare_wiring(&self, count: usize) {
        let mut inner = self.inner.lock();
        inner.unstarted = count;
        inner.stop_requests = count;
    }

    /// Records `child` as a dependent. Returns this controller's
    /// `(is_up, requesting_stop)` flags, or `None` if it is being removed.
    pub(crate) fn add_dependent(&self, child: &Arc<ControllerCore>) -> Option<(bool, bool)> {
        let mut inner = self.inner.lock();
        if inner.state == State::Removed || inner.remove_requested {
            return None;
        }
        inner.dependents.push(Arc::downgrade(child));
        Some((inner.state == State::Up, inner.requesting_stop))
    }

    /// Discounts one wired parent according to the flags it reported.
    pub(crate) fn dependency_wired(&self, parent_up: bool, parent_requesting_stop: bool) {
        let mut inner = self.inner.lock();
        if parent_up {
            inner.unstarted = inner.unstarted.saturating_sub(1);
        }
        if !parent_requesting_stop {
            inner.stop_requests = inner.stop_requests.saturating_sub(1);
        }
    }

    /// Drops `child` from the dependents; true if this leaves an orphaned placeholder.
    pub(crate) fn forget_dependent(&self, child: &ControllerCore) -> bool {
        let mut inner = self.inner.lock();
        inner
            .dependents
            .retain(|w| w.strong_count() > 0 && !std::ptr::eq(w.as_ptr(), child));
        self.is_placeholder() && inner.dependents.is_empty()
    }

    pub(crate) fn has_dependents(&self) -> bool {
        self.inner
            .lock()
            .dependents
            .iter()
            .any(|w| w.strong_count() > 0)
    }

    /// Fixes the definition; false if one was already set.
    pub(crate) fn define(&self, definition: Definition) -> bool {
        self.definition.set(definition).is_ok()
    }

    /// Makes the controller live with its initial mode and listeners.
    pub(crate) fn activate(&self, mode: Mode, listeners: Vec<ListenerRef>) {
        let mut inner = self.inner.lock();
        inner.mode = mode;
        inner.installed = true;
        for listener in listeners {
            inner.listeners.add(listener);
        }
    }

    // ---- user operations ----------------------------------------------------

    pub(crate) fn set_mode(self: &Arc<Self>, mode: Mode) -> Result<(), StateError> {
        {
            let mut inner = self.inner.lock();
            if inner.state == State::Removed {
                return Err(StateError::Removed {
                    name: self.display_name(),
                });
            }
            if inner.mode == mode {
                return Ok(());
            }
            tracing::debug!(
                service = %self.display_name(),
                from = %inner.mode,
                to = %mode,
                "mode changed"
            );
            inner.mode = mode;
            if inner.state == State::StartFailed {
                inner.retry_requested = true;
            }
        }
        self.schedule();
        Ok(())
    }

    pub(crate) fn retry(self: &Arc<Self>) -> Result<(), StateError> {
        {
            let mut inner = self.inner.lock();
            if inner.state != State::StartFailed {
                return Err(StateError::NotFailed {
                    name: self.display_name(),
                });
            }
            inner.retry_requested = true;
        }
        self.schedule();
        Ok(())
    }

    pub(crate) fn request_removal(self: &Arc<Self>) -> Result<(), StateError> {
        if self.name.is_none() {
            return Err(StateError::RootRemoval);
        }
        {
            let mut inner = self.inner.lock();
            if inner.state == State::Removed || inner.remove_requested {
                return Ok(());
            }
            let dependents = inner.live_dependents().len();
            if dependents > 0 {
                return Err(StateError::HasDependents {
                    name: self.display_name(),
                    dependents,
                });
            }
            inner.remove_requested = true;
        }
        self.schedule();
        Ok(())
    }

    pub(crate) fn add_listener(&self, listener: ListenerRef) -> bool {
        self.inner.lock().listeners.add(listener)
    }

    pub(crate) fn remove_listener(&self, listener: &ListenerRef) -> bool {
        self.inner.lock().listeners.remove(listener)
    }

    /// Blocks until the state equals `target` or `timeout` elapses.
    pub(crate) fn await_state(&self, target: State, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut inner = self.inner.lock();
        while inner.state != target {
            match deadline {
                Some(deadline) => {
                    if self.changed.wait_until(&mut inner, deadline).timed_out() {
                        return inner.state == target;
                    }
                }
                None => self.changed.wait(&mut inner),
            }
        }
        true
    }

    // ---- evaluation ---------------------------------------------------------

    /// Requests an evaluation of this controller.
    pub(crate) fn schedule(self: &Arc<Self>) {
        {
            let mut inner = self.inner.lock();
            inner.dirty = true;
            if inner.evaluating {
                return;
            }
            inner.evaluating = true;
        }
        let drain_here = WORKLIST.with(|wl| {
            let mut wl = wl.borrow_mut();
            wl.queue.push_back(Arc::clone(self));
            !std::mem::replace(&mut wl.draining, true)
        });
        if drain_here {
            drain_worklist();
        }
    }

    fn evaluate(self: &Arc<Self>) {
        loop {
            let mut fx = Effects::default();
            {
                let mut inner = self.inner.lock();
                if !inner.dirty {
                    inner.evaluating = false;
                    return;
                }
                inner.dirty = false;
                self.step(&mut inner, &mut fx);
            }
            self.apply(fx);
        }
    }

    fn step(&self, inner: &mut MutexGuard<'_, Inner>, fx: &mut Effects) {
        if inner.state == State::Removed {
            return;
        }

        if let Some(outcome) = inner.outcome.take() {
            self.absorb(inner, outcome, fx);
        }

        let want_stop = !inner.should_run();
        if want_stop != inner.requesting_stop {
            inner.requesting_stop = want_stop;
            for child in inner.live_dependents() {
                child.on_stop_request(want_stop);
                fx.wake.push(child);
            }
        }

        let want_demand = inner.should_demand();
        if want_demand != inner.demanding {
            inner.demanding = want_demand;
            fx.demand = Some(want_demand);
        }

        match inner.state {
            State::StartFailed => {
                if inner.retry_requested || !inner.should_run() {
                    inner.retry_requested = false;
                    inner.start_error = None;
                    self.set_state(inner, State::Down);
                    inner.dirty = true;
                }
            }
            State::Down => {
                if inner.remove_requested
                    && !inner.holding
                    && !inner.demanding
                    && inner.dependents.iter().all(|w| w.strong_count() == 0)
                {
                    self.set_state(inner, State::Removed);
                    self.notify(inner, Transition::Removed);
                    fx.unwire = true;
                } else if inner.should_run() && inner.unstarted == 0 && !inner.holding {
                    fx.try_start = true;
                }
            }
            State::Up => {
                if !inner.should_run() && inner.running_dependents == 0 {
                    self.set_state(inner, State::Stopping);
                    self.notify(inner, Transition::Stopping);
                    for child in inner.live_dependents() {
                        child.on_dependency_down();
                        fx.wake.push(child);
                    }
                    fx.stop = true;
                }
            }
            State::Starting | State::Stopping | State::Removed => {}
        }
    }

    fn absorb(&self, inner: &mut MutexGuard<'_, Inner>, outcome: Outcome, fx: &mut Effects) {
        match (inner.state, outcome) {
            (State::Starting, Outcome::Started) => {
                self.set_state(inner, State::Up);
                self.notify(inner, Transition::Started);
                for child in inner.live_dependents() {
                    child.on_dependency_up();
                    fx.wake.push(child);
                }
            }
            (State::Starting, Outcome::Failed(error)) => {
                tracing::warn!(
                    service = %self.display_name(),
                    error = %error,
                    label = error.as_label(),
                    "start failed"
                );
                self.set_state(inner, State::StartFailed);
                inner.start_error = Some(error.clone());
                self.notify(inner, Transition::Failed(error));
                inner.holding = false;
                fx.release_parents = true;
            }
            (State::Stopping, Outcome::Stopped) => {
                self.set_state(inner, State::Down);
                self.notify(inner, Transition::Stopped);
                inner.holding = false;
                fx.release_parents = true;
            }
            (state, _) => {
                tracing::warn!(
                    service = %self.display_name(),
                    state = %state,
                    "outcome does not match state; ignored"
                );
            }
        }
    }

    fn apply(self: &Arc<Self>, fx: Effects) {
        let parents = self.dependencies();
        if fx.release_parents {
            for parent in parents {
                parent.release_running();
            }
        }
        if let Some(on) = fx.demand {
            for parent in parents {
                parent.adjust_demand(on);
            }
        }
        if fx.try_start {
            self.try_start(parents);
        }
        if fx.stop {
            self.submit_stop();
        }
        if fx.unwire {
            self.unwire(parents);
        }
        for child in fx.wake {
            child.schedule();
        }
        self.kick_notifications();
    }

    fn set_state(&self, inner: &mut MutexGuard<'_, Inner>, next: State) {
        let prev = std::mem::replace(&mut inner.state, next);
        tracing::debug!(
            service = %self.display_name(),
            from = %prev,
            to = %next,
            "state changed"
        );
        self.changed.notify_all();
    }

    fn notify(&self, inner: &mut MutexGuard<'_, Inner>, transition: Transition) {
        if !inner.listeners.is_empty() {
            inner.notifications.push_back(transition);
        }
    }

    // ---- messages from parents (parent lock held) -----------------------------

    fn on_dependency_up(&self) {
        let mut inner = self.inner.lock();
        debug_assert!(inner.unstarted > 0, "dependency up without pending count");
        inner.unstarted = inner.unstarted.saturating_sub(1);
    }

    fn on_dependency_down(&self) {
        self.inner.lock().unstarted += 1;
    }

    fn on_stop_request(&self, requested: bool) {
        let mut inner = self.inner.lock();
        if requested {
            inner.stop_requests += 1;
        } else {
            debug_assert!(inner.stop_requests > 0, "stop retraction without request");
            inner.stop_requests = inner.stop_requests.saturating_sub(1);
        }
    }

    // ---- messages from children (no lock held) --------------------------------

    /// Pins this controller for a starting child; only succeeds while `UP`.
    fn acquire_running(&self) -> bool {
        let mut inner = self.inner.lock();
        if inner.state == State::Up {
            inner.running_dependents += 1;
            true
        } else {
            false
        }
    }

    fn release_running(self: &Arc<Self>) {
        {
            let mut inner = self.inner.lock();
            debug_assert!(inner.running_dependents > 0, "release without acquire");
            inner.running_dependents = inner.running_dependents.saturating_sub(1);
        }
        self.schedule();
    }

    fn adjust_demand(self: &Arc<Self>, on: bool) {
        {
            let mut inner = self.inner.lock();
            if on {
                inner.demand += 1;
            } else {
                inner.demand = inner.demand.saturating_sub(1);
            }
        }
        self.schedule();
    }

    // ---- start / stop ---------------------------------------------------------

    fn try_start(self: &Arc<Self>, parents: &[Arc<ControllerCore>]) {
        let acquired = parents
            .iter()
            .take_while(|parent| parent.acquire_running())
            .count();
        if acquired < parents.len() {
            // A parent left UP; its down message has already re-scheduled us.
            for parent in &parents[..acquired] {
                parent.release_running();
            }
            return;
        }

        let start = {
            let mut inner = self.inner.lock();
            let ready = inner.state == State::Down
                && inner.should_run()
                && inner.unstarted == 0
                && !inner.holding;
            if ready {
                inner.holding = true;
                self.set_state(&mut inner, State::Starting);
                self.notify(&mut inner, Transition::Starting);
            }
            ready
        };
        if !start {
            for parent in parents {
                parent.release_running();
            }
            return;
        }

        self.submit(JobKind::Start);
    }

    fn run_start(self: Arc<Self>) {
        let ctx = StartContext::new(Arc::clone(&self));
        let result = catch_unwind(AssertUnwindSafe(|| self.invoke_start(&ctx))).unwrap_or_else(
            |payload| {
                Err(StartError::Panicked {
                    info: panic_message(payload.as_ref()),
                })
            },
        );
        ctx.settle(result);
    }

    fn invoke_start(&self, ctx: &StartContext) -> Result<(), StartError> {
        let definition = self
            .definition
            .get()
            .ok_or_else(|| StartError::failed("service is not installed"))?;
        for injection in &definition.injections {
            injection.inject()?;
        }
        let service = definition.service.get()?;
        self.inner.lock().instance = Some(Arc::clone(&service));
        service.start(ctx)
    }

    /// Records the outcome of a start; called once per start by its context.
    pub(crate) fn finish_start(self: &Arc<Self>, result: Result<(), StartError>) {
        if !self.expects_outcome(State::Starting) {
            return;
        }
        if result.is_err() {
            self.inner.lock().instance = None;
            self.uninject_all();
        }
        self.inner.lock().outcome = Some(match result {
            Ok(()) => Outcome::Started,
            Err(error) => Outcome::Failed(error),
        });
        self.schedule();
    }

    fn submit_stop(self: &Arc<Self>) {
        self.submit(JobKind::Stop);
    }

    fn run_stop(self: Arc<Self>) {
        let ctx = StopContext::new(Arc::clone(&self));
        let instance = self.inner.lock().instance.clone();
        if let Some(service) = instance {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| service.stop(&ctx))) {
                tracing::error!(
                    service = %self.display_name(),
                    panic = %panic_message(payload.as_ref()),
                    "stop panicked; treating service as stopped"
                );
                ctx.complete();
                return;
            }
        }
        ctx.settle();
    }

    /// Records that a stop finished; called once per stop by its context.
    pub(crate) fn finish_stop(self: &Arc<Self>) {
        if !self.expects_outcome(State::Stopping) {
            return;
        }
        self.uninject_all();
        {
            let mut inner = self.inner.lock();
            inner.instance = None;
            inner.outcome = Some(Outcome::Stopped);
        }
        self.schedule();
    }

    fn expects_outcome(&self, state: State) -> bool {
        let inner = self.inner.lock();
        if inner.state != state || inner.outcome.is_some() {
            tracing::warn!(
                service = %self.display_name(),
                state = %inner.state,
                expected = %state,
                "unexpected completion ignored"
            );
            return false;
        }
        true
    }

    fn uninject_all(&self) {
        if let Some(definition) = self.definition.get() {
            for injection in &definition.injections {
                injection.uninject();
            }
        }
    }

    // ---- removal --------------------------------------------------------------

    fn unwire(self: &Arc<Self>, parents: &[Arc<ControllerCore>]) {
        for parent in parents {
            if parent.forget_dependent(self) {
                if let Some(registry) = parent.registry.upgrade() {
                    registry.drop_placeholder(parent);
                }
            }
            parent.schedule();
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.forget(self);
        }
        tracing::debug!(service = %self.display_name(), "removed");
    }

    // ---- notifications --------------------------------------------------------

    fn kick_notifications(self: &Arc<Self>) {
        {
            let mut inner = self.inner.lock();
            if inner.notifying || inner.notifications.is_empty() {
                return;
            }
            inner.notifying = true;
        }
        self.submit(JobKind::Notify);
    }

    // ---- job submission ---------------------------------------------------------

    /// Hands a job to the current executor; a refused or lost job is settled here.
    fn submit(self: &Arc<Self>, kind: JobKind) {
        let executor = self.executor.get();
        let stage = Arc::new(AtomicU8::new(SUBMITTING));
        let guard = JobGuard {
            core: Arc::clone(self),
            kind,
            executor: executor.name(),
            stage: Arc::clone(&stage),
        };
        let job: Job = Box::new(move || guard.run());
        let refused = match executor.execute(job) {
            Err(rejected) => Some(rejected),
            Ok(()) => match stage.compare_exchange(
                SUBMITTING,
                ACCEPTED,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Err(DROPPED) => Some(RejectedError::new(
                    executor.name(),
                    "job dropped without running",
                )),
                _ => None,
            },
        };
        if let Some(rejected) = refused {
            self.job_lost(kind, rejected);
        }
    }

    /// Settles a job that will never run.
    fn job_lost(self: &Arc<Self>, kind: JobKind, rejected: RejectedError) {
        tracing::error!(
            service = %self.display_name(),
            job = kind.as_str(),
            error = %rejected,
            "job rejected by executor"
        );
        match kind {
            JobKind::Start => self.finish_start(Err(StartError::Rejected(rejected))),
            // Treated as stopped.
            JobKind::Stop => self.finish_stop(),
            JobKind::Notify => {
                let dropped = {
                    let mut inner = self.inner.lock();
                    inner.notifying = false;
                    std::mem::take(&mut inner.notifications).len()
                };
                tracing::warn!(
                    service = %self.display_name(),
                    dropped,
                    "listener notifications dropped"
                );
            }
        }
    }

    fn drain_notifications(self: Arc<Self>) {
        let handle = ServiceHandle::new(Arc::clone(&self));
        loop {
            let (transition, listeners) = {
                let mut inner = self.inner.lock();
                match inner.notifications.pop_front() {
                    Some(t) => (t, inner.listeners.snapshot()),
                    None => {
                        inner.notifying = false;
                        return;
                    }
                }
            };
            ListenerSet::deliver(&listeners, &handle, &transition);
        }
    }
}

fn drain_worklist() {
    struct Reset;
    impl Drop for Reset {
        fn drop(&mut self) {
            WORKLIST.with(|wl| wl.borrow_mut().draining = false);
        }
    }
    let _reset = Reset;
    while let Some(core) = WORKLIST.with(|wl| wl.borrow_mut().queue.pop_front()) {
        core.evaluate();
    }
}

impl std::fmt::Debug for ControllerCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerCore")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
