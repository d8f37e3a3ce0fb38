//! # Single-thread worker executor.
//!
//! One background thread drains a FIFO queue. The thread is spawned on the
//! first submission and exits after [`idle_timeout`](WorkerExecutor::new) with
//! nothing to do; the next submission spawns a fresh one.
//!
//! ```text
//! execute(job) ──► queue.push_back ──► notify
//!                        │
//!                  (no worker?) spawn ──► loop { pop_front → run (unlocked) }
//!                                          └─ idle > timeout → exit
//! ```
//!
//! FIFO on one thread means listener notifications are delivered in the exact
//! order transitions were queued, across all controllers of the container.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::container::ContainerConfig;
use crate::error::RejectedError;
use crate::executor::{run_contained, Executor, Job};

/// Lazily spawned, idle-terminating single-thread executor.
///
/// Default executor of every container.
pub struct WorkerExecutor {
    shared: Arc<Shared>,
}

struct Shared {
    thread_name: String,
    idle_timeout: Duration,
    queue: Mutex<Queue>,
    available: Condvar,
}

#[derive(Default)]
struct Queue {
    jobs: VecDeque<Job>,
    worker_alive: bool,
    closed: bool,
}

impl WorkerExecutor {
    /// Creates an executor whose thread is named `thread_name` and exits after
    /// `idle_timeout` without work.
    pub fn new(thread_name: impl Into<String>, idle_timeout: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                thread_name: thread_name.into(),
                idle_timeout,
                queue: Mutex::new(Queue::default()),
                available: Condvar::new(),
            }),
        }
    }

    /// Creates an executor from the container's worker settings.
    pub fn from_config(cfg: &ContainerConfig) -> Self {
        Self::new(cfg.worker_thread_name.clone(), cfg.worker_idle_timeout_clamped())
    }

    /// Refuses further jobs. Already queued jobs still run.
    pub fn close(&self) {
        self.shared.queue.lock().closed = true;
        self.shared.available.notify_all();
    }

    /// True while the worker thread exists.
    pub fn is_worker_alive(&self) -> bool {
        self.shared.queue.lock().worker_alive
    }

    /// Number of queued jobs not yet picked up.
    pub fn pending(&self) -> usize {
        self.shared.queue.lock().jobs.len()
    }
}

impl Default for WorkerExecutor {
    fn default() -> Self {
        Self::from_config(&ContainerConfig::default())
    }
}

impl Executor for WorkerExecutor {
    fn execute(&self, job: Job) -> Result<(), RejectedError> {
        let mut queue = self.shared.queue.lock();
        if queue.closed {
            return Err(RejectedError::new(self.name(), "executor closed"));
        }
        queue.jobs.push_back(job);
        if queue.worker_alive {
            drop(queue);
            self.shared.available.notify_one();
            return Ok(());
        }

        // Spawning under the lock keeps the push and the spawn atomic; the
        // new thread blocks on the queue until we return.
        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(self.shared.thread_name.clone())
            .spawn(move || shared.run());
        match spawned {
            Ok(_) => {
                queue.worker_alive = true;
                tracing::trace!(thread = %self.shared.thread_name, "worker spawned");
                Ok(())
            }
            Err(e) => {
                queue.jobs.pop_back();
                Err(RejectedError::new(
                    self.name(),
                    format!("failed to spawn worker: {e}"),
                ))
            }
        }
    }

    fn name(&self) -> &'static str {
        "worker"
    }
}

impl Drop for WorkerExecutor {
    fn drop(&mut self) {
        self.close();
    }
}

impl Shared {
    fn run(&self) {
        let mut queue = self.queue.lock();
        loop {
            if let Some(job) = queue.jobs.pop_front() {
                MutexGuard::unlocked(&mut queue, || run_contained("worker", job));
                continue;
            }
            if queue.closed {
                break;
            }
            let idle = self.available.wait_for(&mut queue, self.idle_timeout);
            if idle.timed_out() && queue.jobs.is_empty() {
                break;
            }
        }
        queue.worker_alive = false;
        tracing::trace!(thread = %self.thread_name, "worker exiting");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Instant;

    #[test]
    fn runs_jobs_in_submission_order() {
        let exec = WorkerExecutor::new("test-worker", Duration::from_secs(5));
        let (tx, rx) = mpsc::channel();
        for i in 0..100 {
            let tx = tx.clone();
            exec.execute(Box::new(move || tx.send(i).unwrap())).unwrap();
        }
        let got: Vec<i32> = (0..100).map(|_| rx.recv().unwrap()).collect();
        assert_eq!(got, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn uses_configured_thread_name() {
        let exec = WorkerExecutor::new("named-worker", Duration::from_secs(5));
        let (tx, rx) = mpsc::channel();
        exec.execute(Box::new(move || {
            tx.send(thread::current().name().map(str::to_string)).unwrap()
        }))
        .unwrap();
        assert_eq!(rx.recv().unwrap().as_deref(), Some("named-worker"));
    }

    #[test]
    fn worker_exits_when_idle_and_respawns() {
        let exec = WorkerExecutor::new("idle-worker", Duration::from_millis(20));
        let (tx, rx) = mpsc::channel();
        let tx2 = tx.clone();
        exec.execute(Box::new(move || tx.send(1).unwrap())).unwrap();
        assert_eq!(rx.recv().unwrap(), 1);

        let deadline = Instant::now() + Duration::from_secs(5);
        while exec.is_worker_alive() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!exec.is_worker_alive());

        exec.execute(Box::new(move || tx2.send(2).unwrap())).unwrap();
        assert_eq!(rx.recv().unwrap(), 2);
    }

    #[test]
    fn panicking_job_does_not_kill_worker() {
        let exec = WorkerExecutor::new("panic-worker", Duration::from_secs(5));
        let (tx, rx) = mpsc::channel();
        exec.execute(Box::new(|| panic!("boom"))).unwrap();
        exec.execute(Box::new(move || tx.send("after").unwrap())).unwrap();
        assert_eq!(rx.recv().unwrap(), "after");
    }

    #[test]
    fn closed_executor_rejects() {
        let exec = WorkerExecutor::new("closed-worker", Duration::from_secs(5));
        exec.close();
        let err = exec.execute(Box::new(|| {})).unwrap_err();
        assert_eq!(err.executor, "worker");
        assert_eq!(exec.pending(), 0);
    }
}
