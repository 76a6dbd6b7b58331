//! Termination signal handling.
//!
//! Signals are turned into cancellation of the session's
//! [`CancellationToken`]. Handlers are registered when
//! [`spawn_signal_listener`] is called, so call it before launching any
//! service. Further signals after the first are logged and absorbed.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::Result;

fn deliver(cancel: &CancellationToken, signal: &str) {
    if cancel.is_cancelled() {
        warn!(signal, "signal received during shutdown; teardown already in progress");
    } else {
        info!(signal, "shutdown signal received");
        cancel.cancel();
    }
}

/// Register SIGINT/SIGTERM handlers and cancel `cancel` when one arrives.
///
/// # Errors
///
/// Returns `AppError::Io` if a handler cannot be registered.
#[cfg(unix)]
pub fn spawn_signal_listener(cancel: CancellationToken) -> Result<JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    Ok(tokio::spawn(async move {
        loop {
            let name = tokio::select! {
                Some(()) = interrupt.recv() => "SIGINT",
                Some(()) = terminate.recv() => "SIGTERM",
                else => break,
            };
            deliver(&cancel, name);
        }
    }))
}

/// Register a ctrl-c handler and cancel `cancel` when it fires.
///
/// # Errors
///
/// Never fails on this platform; the signature matches the unix variant.
#[cfg(not(unix))]
pub fn spawn_signal_listener(cancel: CancellationToken) -> Result<JoinHandle<()>> {
    Ok(tokio::spawn(async move {
        loop {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(%err, "ctrl-c signal handler failed");
                break;
            }
            deliver(&cancel, "ctrl-c");
        }
    }))
}
