//! Bringing a conda package into its desired state

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::modules::error::CondaError;

use super::command::{install_command, query_command, remove_command};
use super::runner::{CommandOutput, CondaRunner};
use super::{DesiredState, PackageRequest, PackageSpec};

/// Message conda prints for a dry-run install that has nothing to do
pub const ALREADY_INSTALLED_MESSAGE: &str = "All requested packages already installed.";

/// What a reconciliation did
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciliation {
    /// The package was already in the requested state; nothing ran after the query.
    Unchanged,
    /// Conda reported the package as missing during removal.
    AlreadyAbsent,
    Installed {
        package: PackageSpec,
        output: CommandOutput,
    },
    Removed {
        package: PackageSpec,
        output: CommandOutput,
    },
}

impl Reconciliation {
    pub fn changed(&self) -> bool {
        matches!(
            self,
            Reconciliation::Installed { .. } | Reconciliation::Removed { .. }
        )
    }
}

/// Decides between doing nothing, installing and removing
pub struct Reconciler<'a> {
    runner: CondaRunner<'a>,
    check_mode: bool,
}

impl<'a> Reconciler<'a> {
    /// In check mode every mutating command carries `--dry-run`.
    pub fn new(runner: CondaRunner<'a>, check_mode: bool) -> Self {
        Self { runner, check_mode }
    }

    pub async fn reconcile(&self, request: &PackageRequest) -> Result<Reconciliation, CondaError> {
        let package = request.package();
        let satisfied = self.is_installed(package).await?;
        debug!(
            package = %package,
            state = %request.state(),
            satisfied,
            "Queried conda package state"
        );

        match request.state() {
            DesiredState::Absent => self.remove(package).await,
            DesiredState::Present | DesiredState::Latest if !satisfied => {
                self.install(package).await
            }
            DesiredState::Present | DesiredState::Latest => {
                info!("Conda package {} already installed", package);
                Ok(Reconciliation::Unchanged)
            }
        }
    }

    /// Dry-run install: conda either says there is nothing to do or lists
    /// the actions it would take.
    pub async fn is_installed(&self, package: &PackageSpec) -> Result<bool, CondaError> {
        let executable = self.runner.config().executable();
        let CommandOutput { output, stderr } = self
            .runner
            .run_package(package, query_command(&executable, &package.install_target()))
            .await?;

        if output.get("message").and_then(Value::as_str) == Some(ALREADY_INSTALLED_MESSAGE) {
            return Ok(true);
        }

        let has_actions = match output.get("actions") {
            Some(Value::Array(actions)) => !actions.is_empty(),
            Some(Value::Object(actions)) => !actions.is_empty(),
            _ => false,
        };
        if has_actions {
            Ok(false)
        } else {
            Err(CondaError::UnexpectedOutput {
                output: Some(output),
                stderr,
            })
        }
    }

    async fn install(&self, package: &PackageSpec) -> Result<Reconciliation, CondaError> {
        let executable = self.runner.config().executable();
        let command = install_command(&executable, &package.install_target(), self.check_mode);
        let output = self.runner.run_package(package, command).await?;
        info!(check_mode = self.check_mode, "Installed conda package {}", package);
        Ok(Reconciliation::Installed {
            package: package.clone(),
            output,
        })
    }

    async fn remove(&self, package: &PackageSpec) -> Result<Reconciliation, CondaError> {
        let executable = self.runner.config().executable();
        let command = remove_command(&executable, package.name(), self.check_mode);
        // Removal targets the bare name, so the version does not take part in not-found reporting.
        let unversioned = PackageSpec::new(package.name(), None)?;

        match self.runner.run_package(&unversioned, command).await {
            Ok(output) => {
                info!(check_mode = self.check_mode, "Removed conda package {}", package.name());
                Ok(Reconciliation::Removed {
                    package: package.clone(),
                    output,
                })
            }
            Err(CondaError::PackageNotFound { name, .. }) => {
                warn!("Conda package {} not found, nothing to remove", name);
                Ok(Reconciliation::AlreadyAbsent)
            }
            Err(e) => Err(e),
        }
    }
}
