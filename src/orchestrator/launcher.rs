//! Service launcher.
//!
//! Starts one service through the [`ProcessBackend`] and returns its new
//! [`ProcessRecord`] in `Starting` state. Launching never waits on the
//! child's own startup; readiness is the prober's job.

use tracing::{error, info, info_span};

use super::backend::ProcessBackend;
use super::session::Session;
use crate::models::record::ProcessRecord;
use crate::models::service::ServiceSpec;
use crate::{AppError, Result};

/// Launch `spec` and return its record.
///
/// The caller appends the record to the session; nothing is recorded when
/// this returns an error.
///
/// # Errors
///
/// Returns `AppError::Ordering` if a role in `spec.required_before` is not
/// yet running, or `AppError::LaunchFailed` if the process cannot be
/// started.
pub fn launch<B: ProcessBackend + ?Sized>(
    backend: &mut B,
    session: &Session,
    spec: &ServiceSpec,
) -> Result<ProcessRecord> {
    let _span = info_span!("launch", role = spec.role, foreground = spec.foreground).entered();

    if let Some(dep) = spec
        .required_before
        .iter()
        .find(|dep| !session.is_running(dep))
    {
        return Err(AppError::Ordering(format!(
            "{} launched before its dependency {dep} is running",
            spec.role
        )));
    }

    let pid = backend.spawn(spec).map_err(|err| {
        error!(role = spec.role, %err, "service failed to launch");
        AppError::LaunchFailed {
            role: spec.role.clone(),
            cause: err.to_string(),
        }
    })?;

    if spec.foreground {
        info!(role = spec.role, pid = pid.unwrap_or(0), "foreground driver started");
    } else {
        info!(
            role = spec.role,
            pid = pid.unwrap_or(0),
            log = %spec.log_path.display(),
            "background service started"
        );
    }

    Ok(ProcessRecord::new(spec.role.clone(), pid, spec.foreground))
}
