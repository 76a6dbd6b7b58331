//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Exit code reported when the session is interrupted by SIGINT/SIGTERM.
pub const EXIT_INTERRUPTED: u8 = 130;

/// Application error enumeration covering all session failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// File-system or I/O operation failure.
    Io(String),
    /// A service was launched before one of its dependencies was running.
    Ordering(String),
    /// One or more required executables could not be resolved.
    MissingDependency(Vec<String>),
    /// The spawn attempt for a service failed outright.
    LaunchFailed {
        /// Role of the service that failed to start.
        role: String,
        /// Underlying spawn error.
        cause: String,
    },
    /// A service was no longer alive when its grace period elapsed.
    Dead {
        /// Role of the service that died.
        role: String,
        /// Human-readable exit status, if one could be collected.
        status: String,
    },
    /// The session was cancelled by an interrupt or termination request.
    Interrupted,
}

impl AppError {
    /// Process exit code reported for this failure.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Io(_) => 1,
            Self::Config(_) | Self::Ordering(_) => 2,
            Self::MissingDependency(_) => 3,
            Self::LaunchFailed { .. } => 4,
            Self::Dead { .. } => 5,
            Self::Interrupted => EXIT_INTERRUPTED,
        }
    }

    /// Role name the failure is attributed to, if any.
    #[must_use]
    pub fn role(&self) -> Option<&str> {
        match self {
            Self::LaunchFailed { role, .. } | Self::Dead { role, .. } => Some(role),
            _ => None,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
            Self::Ordering(msg) => write!(f, "ordering: {msg}"),
            Self::MissingDependency(names) => {
                write!(f, "missing dependency: {}", names.join(", "))
            }
            Self::LaunchFailed { role, cause } => {
                write!(f, "launch failed: {role}: {cause}")
            }
            Self::Dead { role, status } => {
                write!(f, "dead at readiness check: {role}: {status}")
            }
            Self::Interrupted => write!(f, "interrupted"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
