//! Shared helpers for integration tests: a scripted process backend and
//! session configs.

use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tempfile::TempDir;

use fog_supervisor::config::SessionConfig;
use fog_supervisor::models::record::ExitSummary;
use fog_supervisor::models::service::ServiceSpec;
use fog_supervisor::orchestrator::backend::{ProcessBackend, TerminateOutcome};
use fog_supervisor::{AppError, Result};

/// Program name every scripted service uses.
pub const FAKE_PROGRAM: &str = "fake-svc";

/// How a scripted role behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Spawn succeeds and the process stays up until terminated.
    StaysUp,
    /// Spawn fails outright.
    SpawnFails,
    /// Spawn succeeds but the process has exited by the readiness check.
    DiesDuringGrace(i32),
    /// Foreground only: exits immediately with the given code.
    ExitsWith(i32),
    /// Foreground only: never exits on its own.
    Blocks,
    /// Stays up, and termination requests fail.
    RefusesTermination,
}

/// Observable backend calls, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Spawn(String),
    Probe(String),
    Wait(String),
    Terminate(String),
    Settle,
}

/// [`ProcessBackend`] whose processes follow a per-role script.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    behaviors: HashMap<String, Behavior>,
    alive: HashSet<String>,
    next_pid: u32,
    pub events: Vec<Event>,
}

impl ScriptedBackend {
    pub fn new(behaviors: &[(&str, Behavior)]) -> Self {
        Self {
            behaviors: behaviors
                .iter()
                .map(|(role, b)| ((*role).to_owned(), *b))
                .collect(),
            next_pid: 1000,
            ..Self::default()
        }
    }

    fn behavior(&self, role: &str) -> Behavior {
        self.behaviors.get(role).copied().unwrap_or(Behavior::StaysUp)
    }

    pub fn spawned(&self) -> Vec<&str> {
        self.roles_for(|e| matches!(e, Event::Spawn(_)))
    }

    pub fn terminated(&self) -> Vec<&str> {
        self.roles_for(|e| matches!(e, Event::Terminate(_)))
    }

    pub fn position(&self, event: &Event) -> Option<usize> {
        self.events.iter().position(|e| e == event)
    }

    fn roles_for(&self, pred: impl Fn(&Event) -> bool) -> Vec<&str> {
        self.events
            .iter()
            .filter(|e| pred(e))
            .filter_map(|e| match e {
                Event::Spawn(r) | Event::Probe(r) | Event::Wait(r) | Event::Terminate(r) => {
                    Some(r.as_str())
                }
                Event::Settle => None,
            })
            .collect()
    }
}

impl ProcessBackend for ScriptedBackend {
    fn spawn(&mut self, spec: &ServiceSpec) -> Result<Option<u32>> {
        self.events.push(Event::Spawn(spec.role.clone()));
        match self.behavior(&spec.role) {
            Behavior::SpawnFails => {
                return Err(AppError::Io(format!(
                    "failed to spawn {}: No such file or directory",
                    spec.program
                )));
            }
            Behavior::DiesDuringGrace(_) | Behavior::ExitsWith(_) => {}
            Behavior::StaysUp | Behavior::Blocks | Behavior::RefusesTermination => {
                self.alive.insert(spec.role.clone());
            }
        }
        self.next_pid += 1;
        Ok(Some(self.next_pid))
    }

    fn try_wait(&mut self, role: &str) -> Result<Option<ExitSummary>> {
        self.events.push(Event::Probe(role.to_owned()));
        if self.alive.contains(role) {
            return Ok(None);
        }
        match self.behavior(role) {
            Behavior::DiesDuringGrace(code) | Behavior::ExitsWith(code) => {
                Ok(Some(ExitSummary::from_code(code)))
            }
            _ => Ok(Some(ExitSummary::from_signal(15))),
        }
    }

    fn wait<'a>(
        &'a mut self,
        role: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<ExitSummary>> + 'a>> {
        self.events.push(Event::Wait(role.to_owned()));
        if let Behavior::ExitsWith(code) = self.behavior(role) {
            self.alive.remove(role);
            return Box::pin(async move { Ok(ExitSummary::from_code(code)) });
        }
        Box::pin(std::future::pending::<Result<ExitSummary>>())
    }

    fn terminate(&mut self, role: &str) -> Result<TerminateOutcome> {
        self.events.push(Event::Terminate(role.to_owned()));
        if self.behavior(role) == Behavior::RefusesTermination {
            return Err(AppError::Io("Operation not permitted".into()));
        }
        if self.alive.remove(role) {
            Ok(TerminateOutcome::Signalled)
        } else {
            Ok(TerminateOutcome::AlreadyExited(None))
        }
    }

    fn settle(&mut self, _timeout: Duration) -> Pin<Box<dyn Future<Output = ()> + '_>> {
        self.events.push(Event::Settle);
        Box::pin(async {})
    }
}

/// A temp directory containing an executable named [`FAKE_PROGRAM`], and a
/// search path pointing at it.
pub fn fake_search_path() -> (TempDir, OsString) {
    let dir = tempfile::tempdir().expect("tempdir");
    let exe = dir.path().join(FAKE_PROGRAM);
    std::fs::write(&exe, "#!/bin/sh\nexit 0\n").expect("write fake program");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755))
            .expect("chmod fake program");
    }

    let search = std::env::join_paths([dir.path()]).expect("join paths");
    (dir, search)
}

/// The four-role session: controller, two workers, and a foreground driver.
pub fn scenario_config(grace_ms: u64) -> SessionConfig {
    SessionConfig::from_toml_str(&format!(
        r#"
log_dir = "logs"
stop_timeout_seconds = 0

[[service]]
role = "controller"
program = "{FAKE_PROGRAM}"
grace_period_ms = {grace_ms}

[[service]]
role = "worker1"
program = "{FAKE_PROGRAM}"
required_before = ["controller"]
grace_period_ms = {grace_ms}

[[service]]
role = "worker2"
program = "{FAKE_PROGRAM}"
required_before = ["controller"]
grace_period_ms = {grace_ms}

[[service]]
role = "driver"
program = "{FAKE_PROGRAM}"
required_before = ["worker1", "worker2"]
foreground = true
"#
    ))
    .expect("scenario config parses")
}
