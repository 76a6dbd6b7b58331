//! Operating-system process backend built on `tokio::process`.
//!
//! Children are tracked by role and spawned with `kill_on_drop(true)`, so a
//! supervisor that unwinds without running teardown still takes its
//! children down with it. Background children are placed in their own
//! process group: a terminal interrupt reaches the supervisor, which then
//! tears them down in order. Termination targets that whole group, so
//! helpers a service forks without `exec` go down with it.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File, OpenOptions};
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::time::Instant;
use tracing::{debug, warn};

use super::backend::{ProcessBackend, TerminateOutcome};
use crate::models::record::ExitSummary;
use crate::models::service::ServiceSpec;
use crate::{AppError, Result};

/// [`ProcessBackend`] that spawns real child processes.
#[derive(Debug, Default)]
pub struct OsProcessBackend {
    children: HashMap<String, Child>,
    /// Roles whose child leads its own process group (pgid == pid).
    group_leaders: HashSet<String>,
    signalled: Vec<String>,
}

impl OsProcessBackend {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn child_mut(&mut self, role: &str) -> Result<&mut Child> {
        self.children
            .get_mut(role)
            .ok_or_else(|| AppError::Io(format!("no process tracked for role {role}")))
    }
}

/// Send `signal` to the child's process group when it leads one, else to
/// the child alone. Returns `Ok(false)` if nothing was left to signal.
#[cfg(unix)]
fn send_signal(
    pid: u32,
    whole_group: bool,
    signal: nix::sys::signal::Signal,
) -> std::result::Result<bool, nix::errno::Errno> {
    use nix::errno::Errno;
    use nix::sys::signal::{kill, killpg};
    use nix::unistd::Pid;

    let pid = Pid::from_raw(i32::try_from(pid).map_err(|_| Errno::EINVAL)?);
    let sent = if whole_group {
        killpg(pid, signal)
    } else {
        kill(pid, signal)
    };

    match sent {
        Ok(()) => Ok(true),
        Err(Errno::ESRCH) => Ok(false),
        Err(err) => Err(err),
    }
}

/// Open (creating parents if needed) a log sink in append mode.
fn open_log(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| {
            AppError::Io(format!("cannot create log directory {}: {err}", parent.display()))
        })?;
    }

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| AppError::Io(format!("cannot open log {}: {err}", path.display())))
}

impl ProcessBackend for OsProcessBackend {
    fn spawn(&mut self, spec: &ServiceSpec) -> Result<Option<u32>> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args).envs(&spec.env).kill_on_drop(true);

        if let Some(ref dir) = spec.working_dir {
            cmd.current_dir(dir);
        }

        if spec.foreground {
            cmd.stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit());
        } else {
            let stdout = open_log(&spec.log_path)?;
            let stderr = stdout.try_clone()?;
            cmd.stdin(Stdio::null())
                .stdout(Stdio::from(stdout))
                .stderr(Stdio::from(stderr));

            #[cfg(unix)]
            {
                cmd.process_group(0);
            }
        }

        let child = cmd
            .spawn()
            .map_err(|err| AppError::Io(format!("failed to spawn {}: {err}", spec.program)))?;

        let pid = child.id();
        debug!(
            role = spec.role,
            pid = pid.unwrap_or(0),
            command = spec.command_line(),
            "process spawned"
        );

        if cfg!(unix) && !spec.foreground {
            self.group_leaders.insert(spec.role.clone());
        } else {
            self.group_leaders.remove(&spec.role);
        }
        self.children.insert(spec.role.clone(), child);
        Ok(pid)
    }

    fn try_wait(&mut self, role: &str) -> Result<Option<ExitSummary>> {
        let status = self.child_mut(role)?.try_wait()?;
        Ok(status.map(ExitSummary::from))
    }

    fn wait<'a>(
        &'a mut self,
        role: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<ExitSummary>> + 'a>> {
        Box::pin(async move {
            let status = self.child_mut(role)?.wait().await?;
            Ok(ExitSummary::from(status))
        })
    }

    fn terminate(&mut self, role: &str) -> Result<TerminateOutcome> {
        let whole_group = self.group_leaders.contains(role);
        let Some(child) = self.children.get_mut(role) else {
            return Ok(TerminateOutcome::AlreadyExited(None));
        };

        // The pid is only readable before the child is reaped.
        let pid = child.id();

        if let Some(status) = child.try_wait()? {
            // The leader is gone but the group may not be.
            #[cfg(unix)]
            {
                if let Some(pid) = pid.filter(|_| whole_group) {
                    if send_signal(pid, true, nix::sys::signal::Signal::SIGTERM) == Ok(true) {
                        debug!(role, pid, "terminated leftover process group members");
                    }
                }
            }
            return Ok(TerminateOutcome::AlreadyExited(Some(status.into())));
        }

        #[cfg(unix)]
        {
            let Some(pid) = pid else {
                return Ok(TerminateOutcome::AlreadyExited(None));
            };

            match send_signal(pid, whole_group, nix::sys::signal::Signal::SIGTERM) {
                Ok(true) => {}
                Ok(false) => return Ok(TerminateOutcome::AlreadyExited(None)),
                Err(err) => {
                    return Err(AppError::Io(format!("failed to signal {role}: {err}")));
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = (pid, whole_group);
            child.start_kill()?;
        }

        debug!(role, whole_group, "termination requested");
        self.signalled.push(role.to_owned());
        Ok(TerminateOutcome::Signalled)
    }

    fn settle(&mut self, timeout: Duration) -> Pin<Box<dyn Future<Output = ()> + '_>> {
        Box::pin(async move {
            let started = Instant::now();

            for role in std::mem::take(&mut self.signalled) {
                let whole_group = self.group_leaders.contains(&role);
                let Some(child) = self.children.get_mut(&role) else {
                    continue;
                };
                let pid = child.id();
                let remaining = timeout.saturating_sub(started.elapsed());

                match tokio::time::timeout(remaining, child.wait()).await {
                    Ok(Ok(status)) => {
                        debug!(
                            role,
                            status = %ExitSummary::from(status).describe(),
                            "process exited after termination request"
                        );
                    }
                    Ok(Err(err)) => {
                        warn!(role, %err, "error waiting for terminated process");
                    }
                    Err(_) => {
                        warn!(role, "process did not exit within stop timeout, forcing kill");
                        #[cfg(unix)]
                        {
                            if let Some(pid) = pid.filter(|_| whole_group) {
                                if let Err(err) =
                                    send_signal(pid, true, nix::sys::signal::Signal::SIGKILL)
                                {
                                    warn!(role, %err, "failed to force-kill process group");
                                }
                            }
                        }
                        #[cfg(not(unix))]
                        let _ = (pid, whole_group);
                        if let Err(err) = child.start_kill() {
                            warn!(role, %err, "failed to force-kill process");
                        }
                    }
                }
            }
        })
    }
}
