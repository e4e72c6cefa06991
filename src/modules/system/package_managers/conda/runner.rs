//! Running conda commands and classifying their outcome

use serde_json::Value;
use tracing::debug;

use crate::modules::error::CondaError;
use crate::modules::system::package_managers::{CommandExecutor, ProcessOptions};

use super::command::apply_injections;
use super::output::{parse_conda_stdout, ParsedResult};
use super::{CondaConfig, PackageSpec};

/// `exception_name` conda reports when a package cannot be found in any channel
pub const PACKAGE_NOT_FOUND_EXCEPTION: &str = "PackageNotFoundError";

/// Successful conda invocation: the parsed result and whatever went to stderr
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutput {
    pub output: ParsedResult,
    pub stderr: String,
}

/// Executes conda commands with the configured channels and extra arguments
pub struct CondaRunner<'a> {
    executor: &'a dyn CommandExecutor,
    config: &'a CondaConfig,
    options: &'a ProcessOptions,
}

impl<'a> CondaRunner<'a> {
    pub fn new(
        executor: &'a dyn CommandExecutor,
        config: &'a CondaConfig,
        options: &'a ProcessOptions,
    ) -> Self {
        Self {
            executor,
            config,
            options,
        }
    }

    pub fn config(&self) -> &CondaConfig {
        self.config
    }

    /// Run `command` and return its parsed result.
    ///
    /// A non-zero exit status or stdout without an isolatable JSON object is
    /// a `ToolExecution` error carrying the raw streams.
    pub async fn run(&self, command: Vec<String>) -> Result<CommandOutput, CondaError> {
        let command = apply_injections(command, &self.config.channels, &self.config.extra_args);
        debug!("Running conda command: {}", command.join(" "));

        let process = self
            .executor
            .run(&command, self.options)
            .await
            .map_err(|e| CondaError::Spawn {
                command: command.clone(),
                error: e.to_string(),
            })?;

        let parsed = parse_conda_stdout(&process.stdout);
        match parsed {
            Some(output) if process.success() => Ok(CommandOutput {
                output,
                stderr: process.stderr,
            }),
            parsed => {
                debug!(
                    exit_code = process.exit_code,
                    parsed = parsed.is_some(),
                    "Conda command failed"
                );
                let message = parsed
                    .as_ref()
                    .and_then(|o| o.get("message"))
                    .map(|m| match m {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    });
                Err(CondaError::ToolExecution {
                    command,
                    message,
                    output: parsed,
                    stdout: process.stdout,
                    stderr: process.stderr,
                })
            }
        }
    }

    /// Like [`run`](Self::run), but a failure conda attributes to a missing
    /// package becomes `PackageNotFound` for `package`.
    pub async fn run_package(
        &self,
        package: &PackageSpec,
        command: Vec<String>,
    ) -> Result<CommandOutput, CondaError> {
        self.run(command).await.map_err(|err| {
            if is_package_not_found(&err) {
                CondaError::PackageNotFound {
                    name: package.name().to_string(),
                    version: package.version().map(str::to_string),
                }
            } else {
                err
            }
        })
    }
}

fn is_package_not_found(err: &CondaError) -> bool {
    matches!(err, CondaError::ToolExecution { .. })
        && err
            .output()
            .and_then(|o| o.get("exception_name"))
            .and_then(Value::as_str)
            == Some(PACKAGE_NOT_FOUND_EXCEPTION)
}
