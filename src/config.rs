//! Session configuration parsing and validation.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::models::service::ServiceSpec;
use crate::{AppError, Result};

/// Built-in session for the fog anomaly-detection lab.
///
/// Used when no `--config` is given: the Ryu controller, two simulated fog
/// agents, and the Mininet topology as the foreground driver.
pub const DEFAULT_CONFIG_TOML: &str = r#"
log_dir = "logs"
stop_timeout_seconds = 5
require_executables = ["mn"]

[[service]]
role = "controller"
program = "ryu-manager"
args = ["ryu_controller/controller.py", "--ofp-tcp-listen-port", "6633"]
grace_period_ms = 3000

[[service]]
role = "fog1"
program = "python3"
args = ["fog_node/fog_agent.py", "--node-id", "fog1", "--simulated"]
required_before = ["controller"]
grace_period_ms = 2000

[[service]]
role = "fog2"
program = "python3"
args = ["fog_node/fog_agent.py", "--node-id", "fog2", "--simulated"]
required_before = ["controller"]
grace_period_ms = 2000

[[service]]
role = "topology"
program = "sudo"
args = ["python3", "mininet/topology.py"]
required_before = ["fog1", "fog2"]
foreground = true
"#;

/// Upper bound for `stop_timeout_seconds` (one hour).
pub const MAX_STOP_TIMEOUT_SECONDS: u64 = 3_600;

/// Upper bound for a service's `grace_period_ms` (one hour).
pub const MAX_GRACE_PERIOD_MS: u64 = 3_600_000;

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_stop_timeout_seconds() -> u64 {
    5
}

fn default_grace_period_ms() -> u64 {
    3000
}

/// One `[[service]]` entry.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct ServiceConfig {
    /// Unique role name; also names the default log file.
    pub role: String,
    /// Executable name (resolved on `PATH`) or path.
    pub program: String,
    /// Program arguments.
    #[serde(default)]
    pub args: Vec<String>,
    /// Explicit log file; defaults to `<log_dir>/<role>.log`.
    #[serde(default)]
    pub log: Option<PathBuf>,
    /// Marks the session's foreground driver.
    #[serde(default)]
    pub foreground: bool,
    /// Roles that must be running before this one starts.
    #[serde(default)]
    pub required_before: Vec<String>,
    /// Liveness grace period after launch.
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,
    /// Extra environment variables.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Working directory for the child.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

/// Session configuration parsed from TOML.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct SessionConfig {
    /// Directory holding per-role log files.
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// Total time teardown waits for terminated processes to exit.
    #[serde(default = "default_stop_timeout_seconds")]
    pub stop_timeout_seconds: u64,
    /// Executables checked before launch in addition to every service's program.
    #[serde(default)]
    pub require_executables: Vec<String>,
    /// Services in startup order.
    #[serde(default)]
    pub service: Vec<ServiceConfig>,
}

impl SessionConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse and validate configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// The built-in fog lab session.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` only if the embedded default is malformed.
    pub fn fog_default() -> Result<Self> {
        Self::from_toml_str(DEFAULT_CONFIG_TOML)
    }

    /// Teardown settle window.
    #[must_use]
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_seconds)
    }

    /// Resolved service specs in startup order.
    #[must_use]
    pub fn service_specs(&self) -> Vec<ServiceSpec> {
        self.service
            .iter()
            .map(|svc| ServiceSpec {
                role: svc.role.clone(),
                program: svc.program.clone(),
                args: svc.args.clone(),
                log_path: svc
                    .log
                    .clone()
                    .unwrap_or_else(|| self.log_dir.join(format!("{}.log", svc.role))),
                foreground: svc.foreground,
                required_before: svc.required_before.clone(),
                grace_period: Duration::from_millis(svc.grace_period_ms),
                env: svc.env.clone(),
                working_dir: svc.working_dir.clone(),
            })
            .collect()
    }

    /// Every executable the session needs, first occurrence order, deduplicated.
    #[must_use]
    pub fn required_executables(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.service
            .iter()
            .map(|svc| svc.program.clone())
            .chain(self.require_executables.iter().cloned())
            .filter(|name| seen.insert(name.clone()))
            .collect()
    }

    fn validate(&self) -> Result<()> {
        if self.service.is_empty() {
            return Err(AppError::Config(
                "at least one [[service]] is required".into(),
            ));
        }

        if self.stop_timeout_seconds > MAX_STOP_TIMEOUT_SECONDS {
            return Err(AppError::Config(format!(
                "stop_timeout_seconds must be at most {MAX_STOP_TIMEOUT_SECONDS}, got {}",
                self.stop_timeout_seconds
            )));
        }

        let mut declared: HashSet<&str> = HashSet::new();
        for (index, svc) in self.service.iter().enumerate() {
            if svc.role.is_empty()
                || !svc
                    .role
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            {
                return Err(AppError::Config(format!(
                    "service role {:?} must be non-empty and use only [A-Za-z0-9_-]",
                    svc.role
                )));
            }

            if svc.program.trim().is_empty() {
                return Err(AppError::Config(format!(
                    "service {} has an empty program",
                    svc.role
                )));
            }

            if svc.grace_period_ms > MAX_GRACE_PERIOD_MS {
                return Err(AppError::Config(format!(
                    "service {} grace_period_ms must be at most {MAX_GRACE_PERIOD_MS}",
                    svc.role
                )));
            }

            for dep in &svc.required_before {
                if !declared.contains(dep.as_str()) {
                    return Err(AppError::Config(format!(
                        "service {} requires {dep}, which is not declared before it",
                        svc.role
                    )));
                }
            }

            if svc.foreground && index + 1 != self.service.len() {
                return Err(AppError::Config(format!(
                    "foreground service {} must be declared last",
                    svc.role
                )));
            }

            if !declared.insert(svc.role.as_str()) {
                return Err(AppError::Config(format!(
                    "duplicate service role {}",
                    svc.role
                )));
            }
        }

        if !self.service.iter().any(|svc| svc.foreground) {
            return Err(AppError::Config(
                "exactly one service must be marked foreground".into(),
            ));
        }

        Ok(())
    }
}
