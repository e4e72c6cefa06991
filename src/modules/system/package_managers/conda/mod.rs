//! Conda package manager
//!
//! Conda is driven entirely through its `--json` command line interface. Each
//! invocation re-derives the package state from a dry-run install, then
//! installs or removes as needed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::modules::error::CondaError;

pub mod command;
pub mod output;
pub mod reconciler;
pub mod runner;

pub use output::{parse_conda_stdout, ParsedResult};
pub use reconciler::{Reconciliation, Reconciler};
pub use runner::{CommandOutput, CondaRunner};

/// Name of the executable searched on `PATH` when none is configured
pub const CONDA_EXECUTABLE: &str = "conda";

/// Token conda uses to refer to a package: `name` or `name=version`.
pub fn install_target(name: &str, version: Option<&str>) -> String {
    match version {
        Some(version) => format!("{name}={version}"),
        None => name.to_string(),
    }
}

/// A package identified by name and optional version
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageSpec {
    name: String,
    version: Option<String>,
}

impl PackageSpec {
    pub fn new(name: impl Into<String>, version: Option<String>) -> Result<Self, CondaError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(CondaError::invalid_request("`name` must not be empty"));
        }
        Ok(Self { name, version })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn install_target(&self) -> String {
        install_target(&self.name, self.version())
    }
}

impl fmt::Display for PackageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.install_target())
    }
}

/// State in which to leave the package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DesiredState {
    #[default]
    Present,
    Absent,
    Latest,
}

impl DesiredState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DesiredState::Present => "present",
            DesiredState::Absent => "absent",
            DesiredState::Latest => "latest",
        }
    }
}

impl fmt::Display for DesiredState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated request: a package plus the state it should end up in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRequest {
    package: PackageSpec,
    state: DesiredState,
}

impl PackageRequest {
    /// Fails with `InvalidRequest` when `latest` is combined with a pinned version.
    pub fn new(package: PackageSpec, state: DesiredState) -> Result<Self, CondaError> {
        if state == DesiredState::Latest && package.version().is_some() {
            return Err(CondaError::invalid_request(
                "`version` must not be set if `state == \"latest\"` \
                 (`latest` upgrades to newest version)",
            ));
        }
        Ok(Self { package, state })
    }

    pub fn package(&self) -> &PackageSpec {
        &self.package
    }

    pub fn state(&self) -> DesiredState {
        self.state
    }
}

/// Per-invocation conda settings threaded through the runner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CondaConfig {
    pub executable: PathBuf,
    pub channels: Vec<String>,
    pub extra_args: Vec<String>,
}

impl CondaConfig {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            channels: Vec::new(),
            extra_args: Vec::new(),
        }
    }

    pub fn with_channels(mut self, channels: Vec<String>) -> Self {
        self.channels = channels;
        self
    }

    pub fn with_extra_args(mut self, extra_args: Vec<String>) -> Self {
        self.extra_args = extra_args;
        self
    }

    pub fn executable(&self) -> String {
        self.executable.to_string_lossy().to_string()
    }
}

/// Resolve the conda executable.
///
/// An explicit path must point at an existing file; it is never substituted
/// with a `PATH` lookup. Without one, `conda` is searched on `PATH`.
pub fn locate_conda(explicit: Option<&Path>) -> Result<PathBuf, CondaError> {
    match explicit.filter(|p| !p.as_os_str().is_empty()) {
        Some(path) if path.is_file() => Ok(path.to_path_buf()),
        Some(path) => Err(CondaError::ExecutableNotFound {
            path: Some(path.display().to_string()),
        }),
        None => {
            let found = which::which(CONDA_EXECUTABLE)
                .map_err(|_| CondaError::ExecutableNotFound { path: None })?;
            debug!("Found conda at {}", found.display());
            Ok(found)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_target_with_and_without_version() {
        assert_eq!(install_target("numpy", None), "numpy");
        assert_eq!(install_target("scipy", Some("0.14")), "scipy=0.14");
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(matches!(
            PackageSpec::new("  ", None),
            Err(CondaError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn test_latest_with_version_rejected() {
        let package = PackageSpec::new("numpy", Some("1.0".to_string())).unwrap();
        let err = PackageRequest::new(package, DesiredState::Latest).unwrap_err();
        assert!(matches!(err, CondaError::InvalidRequest { .. }));
    }

    #[test]
    fn test_latest_without_version_accepted() {
        let package = PackageSpec::new("numpy", None).unwrap();
        let request = PackageRequest::new(package, DesiredState::Latest).unwrap();
        assert_eq!(request.state(), DesiredState::Latest);
        assert_eq!(request.package().to_string(), "numpy");
    }

    #[test]
    fn test_desired_state_deserializes_lowercase() {
        let state: DesiredState = serde_json::from_str("\"absent\"").unwrap();
        assert_eq!(state, DesiredState::Absent);
        assert!(serde_json::from_str::<DesiredState>("\"installed\"").is_err());
    }

    #[test]
    fn test_locate_explicit_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert_eq!(locate_conda(Some(file.path())).unwrap(), file.path());
    }

    #[test]
    fn test_locate_explicit_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("conda");
        let err = locate_conda(Some(&missing)).unwrap_err();
        assert!(matches!(err, CondaError::ExecutableNotFound { path: Some(_) }));
    }

    #[test]
    fn test_locate_rejects_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(locate_conda(Some(dir.path())).is_err());
    }
}
