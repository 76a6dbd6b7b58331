//! Pre-flight executable resolution.
//!
//! Every program a session depends on is resolved against the search path
//! before anything is launched. All missing names are reported together so
//! the operator can fix them in one pass.

use std::collections::HashSet;
use std::env;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::{error, info, info_span};

use crate::{AppError, Result};

/// Resolve every name in `names` against `search_path` (a `PATH`-style list).
///
/// Names containing a path separator are checked as paths directly.
/// Duplicates are checked once. On success returns the resolved paths in
/// input order (duplicates dropped).
///
/// # Errors
///
/// Returns `AppError::MissingDependency` naming every unresolved executable.
pub fn check_prerequisites<S: AsRef<str>>(
    names: &[S],
    search_path: Option<&OsStr>,
) -> Result<Vec<PathBuf>> {
    let _span = info_span!("prerequisite_check", count = names.len()).entered();

    let mut seen = HashSet::new();
    let mut resolved = Vec::new();
    let mut missing = Vec::new();

    for name in names.iter().map(AsRef::as_ref) {
        if !seen.insert(name) {
            continue;
        }
        match resolve_executable(name, search_path) {
            Some(path) => resolved.push(path),
            None => missing.push(name.to_owned()),
        }
    }

    if missing.is_empty() {
        info!(count = resolved.len(), "all required executables resolved");
        Ok(resolved)
    } else {
        for name in &missing {
            error!(executable = name, "required executable not found");
        }
        Err(AppError::MissingDependency(missing))
    }
}

/// [`check_prerequisites`] against the process's own `PATH`.
///
/// # Errors
///
/// Returns `AppError::MissingDependency` naming every unresolved executable.
pub fn check_prerequisites_in_env<S: AsRef<str>>(names: &[S]) -> Result<Vec<PathBuf>> {
    let path = env::var_os("PATH");
    check_prerequisites(names, path.as_deref())
}

/// Resolve a single executable name.
#[must_use]
pub fn resolve_executable(name: &str, search_path: Option<&OsStr>) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }

    let candidate = Path::new(name);
    if candidate.components().count() > 1 {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }

    env::split_paths(search_path?)
        .filter(|dir| !dir.as_os_str().is_empty())
        .flat_map(|dir| candidates(&dir, name))
        .find(|path| is_executable(path))
}

#[cfg(unix)]
fn candidates(dir: &Path, name: &str) -> Vec<PathBuf> {
    vec![dir.join(name)]
}

#[cfg(not(unix))]
fn candidates(dir: &Path, name: &str) -> Vec<PathBuf> {
    let exts = env::var("PATHEXT").unwrap_or_else(|_| ".EXE;.CMD;.BAT;.COM".into());
    std::iter::once(dir.join(name))
        .chain(
            exts.split(';')
                .filter(|ext| !ext.is_empty())
                .map(|ext| dir.join(format!("{name}{ext}"))),
        )
        .collect()
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .is_ok_and(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
