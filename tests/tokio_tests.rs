//! Running on a tokio runtime.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{name, Journal, TrackedService, WAIT};
use servicevisor::{
    shutdown_on_signal, ContainerConfig, Mode, ServiceContainer, State, TokioExecutor,
};
use tokio_util::sync::CancellationToken;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_services_run_on_blocking_pool() {
    let journal = Journal::default();
    let executor = TokioExecutor::current().expect("inside a runtime");
    let container = ServiceContainer::builder(ContainerConfig::default().with_name("tokio"))
        .with_executor(Arc::new(executor))
        .build();
    assert_eq!(container.executor().name(), "tokio");

    let a = TrackedService::new("a", &journal);
    let b = TrackedService::new("b", &journal);
    b.requires(&a);
    container
        .build_service_instance(name("a"), Arc::clone(&a))
        .create()
        .unwrap();
    let cb = container
        .build_service_instance(name("b"), Arc::clone(&b))
        .add_dependency(name("a"))
        .create()
        .unwrap();

    let handle = cb.handle().clone();
    let up = tokio::task::spawn_blocking(move || handle.await_state(State::Up, WAIT))
        .await
        .unwrap();
    assert!(up);
    assert_eq!(b.violations(), 0);

    cb.set_mode(Mode::Never).unwrap();
    container.shutdown();
    let waiter = container.clone();
    tokio::task::spawn_blocking(move || waiter.await_termination(WAIT))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(journal.entries(), vec!["start:a", "start:b", "stop:b", "stop:a"]);
}

#[test]
fn test_current_is_none_outside_runtime() {
    assert!(TokioExecutor::current().is_none());
}

#[tokio::test]
async fn test_signal_wait_returns_false_when_cancelled() {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let shut_down = shutdown_on_signal(Duration::from_secs(1), cancel)
        .await
        .unwrap();
    assert!(!shut_down);
    assert!(!servicevisor::is_shutting_down());
}

#[test]
fn test_shut_down_runtime_rejects_start() {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let handle = runtime.handle().clone();
    drop(runtime);

    let container = common::direct_container();
    container.set_executor(Arc::new(TokioExecutor::new(handle)));

    let ctl = container
        .build_service_instance(name("a"), Arc::new(servicevisor::NullService))
        .create()
        .unwrap();
    assert_eq!(ctl.state(), State::StartFailed);
    let err = ctl.start_error().unwrap();
    assert_eq!(err.as_label(), "start_rejected");
    assert!(err.to_string().contains("tokio"));

    // Stop jobs are refused too and count as stopped, so shutdown settles.
    container.shutdown();
    container.await_termination(WAIT).unwrap();
    assert_eq!(container.root().state(), State::Down);
}
