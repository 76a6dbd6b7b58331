//! Static description of a launchable service.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// A launchable unit in a supervised session.
///
/// Built from a validated [`SessionConfig`](crate::config::SessionConfig);
/// role names are unique within a session and exactly one spec is
/// `foreground`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
    /// Role name, unique within the session.
    pub role: String,
    /// Executable name or path.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<String>,
    /// Append-only sink for the service's stdout and stderr.
    ///
    /// Ignored for the foreground service, which inherits the terminal.
    pub log_path: PathBuf,
    /// Whether this is the session's foreground driver.
    pub foreground: bool,
    /// Roles that must be `Running` before this service is launched.
    pub required_before: Vec<String>,
    /// How long the service must stay alive after launch to count as ready.
    pub grace_period: Duration,
    /// Extra environment variables set for the child.
    pub env: BTreeMap<String, String>,
    /// Working directory for the child; inherits the supervisor's when unset.
    pub working_dir: Option<PathBuf>,
}

impl ServiceSpec {
    /// Render the command line for diagnostics.
    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
