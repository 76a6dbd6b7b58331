//! Session runner.
//!
//! [`Orchestrator`] drives one session end to end: pre-flight check, each
//! background service launched and probed in declared order, the
//! foreground driver launched and awaited, then teardown. Every exit path
//! (driver exit, interrupt, fatal startup error) funnels into a single
//! [`teardown`](Orchestrator::teardown) call guarded by the session latch.

use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};

use super::backend::ProcessBackend;
use super::launcher::launch;
use super::lifecycle::{teardown, TeardownReport};
use super::prereq::check_prerequisites;
use super::prober::{await_ready, Readiness};
use super::session::Session;
use crate::config::SessionConfig;
use crate::models::record::{ExitSummary, ProcessState};
use crate::models::service::ServiceSpec;
use crate::{AppError, Result};

/// Outcome of a completed session.
#[derive(Debug)]
pub struct SessionReport {
    /// Process exit code to report.
    pub exit_code: u8,
    /// Exit status of the foreground driver, when it exited on its own.
    pub driver_status: Option<ExitSummary>,
    /// The fatal condition that ended the session early, if any.
    pub error: Option<AppError>,
    /// Teardown summary; `None` only if teardown had already run.
    pub teardown: Option<TeardownReport>,
}

/// Runs one supervised session over a [`ProcessBackend`].
pub struct Orchestrator<B: ProcessBackend> {
    backend: B,
    specs: Vec<ServiceSpec>,
    required_executables: Vec<String>,
    search_path: Option<OsString>,
    stop_timeout: Duration,
    session: Session,
    cancel: CancellationToken,
}

impl<B: ProcessBackend> Orchestrator<B> {
    /// Build an orchestrator for `config`, resolving executables on `PATH`.
    ///
    /// `cancel` is the session's cancellation source; firing it interrupts
    /// startup or the foreground wait and routes into teardown.
    #[must_use]
    pub fn new(backend: B, config: &SessionConfig, cancel: CancellationToken) -> Self {
        Self {
            backend,
            specs: config.service_specs(),
            required_executables: config.required_executables(),
            search_path: env::var_os("PATH"),
            stop_timeout: config.stop_timeout(),
            session: Session::new(),
            cancel,
        }
    }

    /// Resolve executables against `search_path` instead of `PATH`.
    #[must_use]
    pub fn with_search_path(mut self, search_path: Option<OsString>) -> Self {
        self.search_path = search_path;
        self
    }

    /// The session's state.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The process backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// A handle to the session's cancellation token.
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run only the prerequisite check.
    ///
    /// # Errors
    ///
    /// Returns `AppError::MissingDependency` naming every unresolved executable.
    pub fn preflight(&self) -> Result<Vec<PathBuf>> {
        check_prerequisites(&self.required_executables, self.search_path.as_deref())
    }

    /// Run the session to completion, including teardown.
    pub async fn run(&mut self) -> SessionReport {
        let span = info_span!("session", session_id = self.session.id());

        let outcome = self.start_and_drive().instrument(span.clone()).await;

        let (exit_code, driver_status, error) = match outcome {
            Ok(status) => {
                if status.success() {
                    info!(parent: &span, "foreground driver exited normally");
                } else {
                    warn!(parent: &span, status = %status.describe(), "foreground driver exited abnormally");
                }
                (status.shell_code(), Some(status), None)
            }
            Err(err) => {
                error!(
                    parent: &span,
                    role = err.role().unwrap_or("-"),
                    %err,
                    "session aborted"
                );
                (err.exit_code(), None, Some(err))
            }
        };

        self.session.set_exit_code(exit_code);
        let teardown = self.teardown().instrument(span).await;

        SessionReport {
            exit_code,
            driver_status,
            error,
            teardown,
        }
    }

    /// Tear the session down; a no-op after the first call.
    pub async fn teardown(&mut self) -> Option<TeardownReport> {
        teardown(&mut self.backend, &mut self.session, self.stop_timeout).await
    }

    async fn start_and_drive(&mut self) -> Result<ExitSummary> {
        self.preflight()?;

        let specs = self.specs.clone();
        for spec in &specs {
            if self.cancel.is_cancelled() {
                return Err(AppError::Interrupted);
            }

            if spec.foreground {
                return self.drive_foreground(spec).await;
            }
            self.start_background(spec).await?;
        }

        Err(AppError::Config("no foreground service configured".into()))
    }

    async fn start_background(&mut self, spec: &ServiceSpec) -> Result<()> {
        let record = launch(&mut self.backend, &self.session, spec)?;
        self.session.push(record)?;

        let record = self
            .session
            .record_mut(&spec.role)
            .ok_or_else(|| AppError::Ordering(format!("record for {} vanished", spec.role)))?;

        match await_ready(&mut self.backend, record, spec.grace_period, &self.cancel).await? {
            Readiness::Ready => Ok(()),
            Readiness::Dead(status) => Err(AppError::Dead {
                role: spec.role.clone(),
                status: status.map_or_else(|| "status unknown".to_owned(), |s| s.describe()),
            }),
        }
    }

    async fn drive_foreground(&mut self, spec: &ServiceSpec) -> Result<ExitSummary> {
        let mut record = launch(&mut self.backend, &self.session, spec)?;
        record.transition(ProcessState::Running);
        self.session.push(record)?;

        let status = tokio::select! {
            biased;
            () = self.cancel.cancelled() => {
                info!(role = spec.role, "interrupted while waiting on foreground driver");
                return Err(AppError::Interrupted);
            }
            status = self.backend.wait(&spec.role) => status?,
        };

        if let Some(record) = self.session.record_mut(&spec.role) {
            record.exit_status = Some(status);
            record.transition(ProcessState::Stopped);
        }

        Ok(status)
    }
}
