//! Launcher preconditions and readiness probing over the scripted backend.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use super::test_helpers::{Behavior, ScriptedBackend};
use fog_supervisor::models::record::{ProcessRecord, ProcessState};
use fog_supervisor::models::service::ServiceSpec;
use fog_supervisor::orchestrator::launcher::launch;
use fog_supervisor::orchestrator::prober::{await_ready, Readiness};
use fog_supervisor::orchestrator::session::Session;
use fog_supervisor::AppError;

fn spec(role: &str, deps: &[&str]) -> ServiceSpec {
    ServiceSpec {
        role: role.into(),
        program: "fake-svc".into(),
        args: vec!["--node-id".into(), role.into()],
        log_path: format!("logs/{role}.log").into(),
        foreground: false,
        required_before: deps.iter().map(|d| (*d).to_owned()).collect(),
        grace_period: Duration::from_millis(20),
        env: Default::default(),
        working_dir: None,
    }
}

#[test]
fn launch_returns_starting_record() {
    let mut backend = ScriptedBackend::new(&[]);
    let session = Session::new();

    let record = launch(&mut backend, &session, &spec("controller", &[])).expect("launch");

    assert_eq!(record.role, "controller");
    assert_eq!(record.state, ProcessState::Starting);
    assert!(record.pid.is_some());
    assert!(session.records().is_empty(), "caller appends the record");
}

#[test]
fn launch_refuses_when_dependency_not_running() {
    let mut backend = ScriptedBackend::new(&[]);
    let mut session = Session::new();
    session
        .push(ProcessRecord::new("controller".into(), None, false))
        .expect("push");

    let err = launch(&mut backend, &session, &spec("fog1", &["controller"]))
        .expect_err("controller still starting");

    assert!(matches!(err, AppError::Ordering(_)));
    assert!(backend.spawned().is_empty());
}

#[test]
fn launch_proceeds_once_dependency_runs() {
    let mut backend = ScriptedBackend::new(&[]);
    let mut session = Session::new();
    let mut controller = ProcessRecord::new("controller".into(), None, false);
    controller.transition(ProcessState::Running);
    session.push(controller).expect("push");

    launch(&mut backend, &session, &spec("fog1", &["controller"])).expect("launch");
    assert_eq!(backend.spawned(), vec!["fog1"]);
}

#[test]
fn spawn_errors_become_launch_failed() {
    let mut backend = ScriptedBackend::new(&[("controller", Behavior::SpawnFails)]);
    let session = Session::new();

    let err = launch(&mut backend, &session, &spec("controller", &[])).expect_err("fails");

    match err {
        AppError::LaunchFailed { role, cause } => {
            assert_eq!(role, "controller");
            assert!(cause.contains("fake-svc"));
        }
        other => panic!("expected LaunchFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn live_process_becomes_running_after_grace() {
    let mut backend = ScriptedBackend::new(&[]);
    let session = Session::new();
    let svc = spec("controller", &[]);
    let mut record = launch(&mut backend, &session, &svc).expect("launch");

    let started = Instant::now();
    let readiness = await_ready(&mut backend, &mut record, svc.grace_period, &CancellationToken::new())
        .await
        .expect("probe");

    assert_eq!(readiness, Readiness::Ready);
    assert_eq!(record.state, ProcessState::Running);
    assert!(started.elapsed() >= Duration::from_millis(15));
}

#[tokio::test]
async fn exited_process_is_dead_and_failed() {
    let mut backend = ScriptedBackend::new(&[("controller", Behavior::DiesDuringGrace(2))]);
    let session = Session::new();
    let svc = spec("controller", &[]);
    let mut record = launch(&mut backend, &session, &svc).expect("launch");

    let readiness = await_ready(&mut backend, &mut record, svc.grace_period, &CancellationToken::new())
        .await
        .expect("probe");

    match readiness {
        Readiness::Dead(Some(status)) => assert_eq!(status.code, Some(2)),
        other => panic!("expected Dead, got {other:?}"),
    }
    assert_eq!(record.state, ProcessState::Failed);
    assert_eq!(record.exit_status.and_then(|s| s.code), Some(2));
}

#[tokio::test]
async fn cancelled_probe_is_interrupted() {
    let mut backend = ScriptedBackend::new(&[]);
    let session = Session::new();
    let svc = spec("controller", &[]);
    let mut record = launch(&mut backend, &session, &svc).expect("launch");
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = await_ready(&mut backend, &mut record, Duration::from_secs(60), &cancel)
        .await
        .expect_err("cancelled");

    assert!(matches!(err, AppError::Interrupted));
    assert_eq!(record.state, ProcessState::Starting);
}
